/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::{fmt::Display, iter};

use super::{
    Classified, ContentPart, Error, HeaderMap, DEFAULT_LINE_LENGTH, FROM, SUBJECT, TO,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultipartType {
    /// Independent parts, such as a body followed by attachments.
    Mixed,
    /// Equivalent representations, the reader picks the best one.
    Alternative,
    /// Parts that reference each other, such as HTML and its images.
    Related,
}

/// MIME tree of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeNode<'a, 'x> {
    Part(&'a ContentPart<'x>),
    Multipart {
        subtype: MultipartType,
        children: Vec<MimeNode<'a, 'x>>,
    },
}

impl MultipartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultipartType::Mixed => "mixed",
            MultipartType::Alternative => "alternative",
            MultipartType::Related => "related",
        }
    }
}

impl Display for MultipartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a random boundary token for a multipart container.
pub fn make_boundary(subtype: MultipartType) -> String {
    format!(
        "----=_Part_{}_{:032x}",
        subtype.as_str(),
        rand::random::<u128>()
    )
}

impl<'a, 'x> MimeNode<'a, 'x> {
    /// Arranges a flat list of parts into a MIME tree.
    ///
    /// The tree is built inside out: the HTML body and its inline parts are
    /// grouped in `multipart/related`, the text and HTML bodies in
    /// `multipart/alternative` and the resulting body plus any attachments
    /// in `multipart/mixed`. Containers are only created when they hold more
    /// than one part. Returns `None` when `parts` is empty.
    pub fn new(parts: &'a [ContentPart<'x>]) -> Option<Self> {
        let first = parts.first()?;
        let classified = Classified::new(parts);

        let (body, attachments) = if let Some(html) = classified.html {
            let html = if !classified.inline.is_empty() {
                MimeNode::Multipart {
                    subtype: MultipartType::Related,
                    children: iter::once(MimeNode::Part(html))
                        .chain(classified.inline.iter().copied().map(MimeNode::Part))
                        .collect(),
                }
            } else {
                MimeNode::Part(html)
            };

            let body = if let Some(text) = classified.text {
                MimeNode::Multipart {
                    subtype: MultipartType::Alternative,
                    children: vec![MimeNode::Part(text), html],
                }
            } else {
                html
            };

            (body, classified.attachments)
        } else {
            // Inline parts are only rendered next to an HTML body.
            let body = classified.text.unwrap_or(first);
            let attachments = classified
                .attachments
                .into_iter()
                .filter(|part| !std::ptr::eq(*part, body))
                .collect::<Vec<_>>();

            (MimeNode::Part(body), attachments)
        };

        Some(if !attachments.is_empty() {
            MimeNode::Multipart {
                subtype: MultipartType::Mixed,
                children: iter::once(body)
                    .chain(attachments.into_iter().map(MimeNode::Part))
                    .collect(),
            }
        } else {
            body
        })
    }

    pub fn subtype(&self) -> Option<MultipartType> {
        match self {
            MimeNode::Part(_) => None,
            MimeNode::Multipart { subtype, .. } => Some(*subtype),
        }
    }

    pub fn children(&self) -> &[MimeNode<'a, 'x>] {
        match self {
            MimeNode::Part(_) => &[],
            MimeNode::Multipart { children, .. } => children,
        }
    }

    /// Number of leaf parts in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            MimeNode::Part(_) => 1,
            MimeNode::Multipart { children, .. } => children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Serializes the tree, requesting a new boundary for every container.
    pub fn write_to<B>(&self, out: &mut String, boundary: &mut B, max_len: usize)
    where
        B: FnMut(MultipartType) -> String,
    {
        match self {
            MimeNode::Part(part) => {
                part.headers.write_to(out);
                out.push_str("\r\n");
                out.push_str(&part.folded_content(max_len));
            }
            MimeNode::Multipart { subtype, children } => {
                let token = boundary(*subtype);
                log::trace!("multipart/{} boundary {:?}", subtype, token);

                out.push_str("Content-Type: multipart/");
                out.push_str(subtype.as_str());
                out.push_str("; boundary=\"");
                out.push_str(&token);
                out.push_str("\"\r\n\r\n");

                for child in children {
                    out.push_str("--");
                    out.push_str(&token);
                    out.push_str("\r\n");
                    child.write_to(out, boundary, max_len);
                    out.push_str("\r\n");
                }

                out.push_str("--");
                out.push_str(&token);
                out.push_str("--");
            }
        }
    }
}

/// Builds a raw RFC 5322 message from its headers and content parts.
///
/// `From`, `To` and `Subject` must be present and non-empty and at least one
/// part is required. The part list is nested into the appropriate multipart
/// containers, each one with a fresh random boundary, and every part is
/// folded according to its `Content-Transfer-Encoding`. Lines are
/// terminated by CRLF.
pub fn build_message(headers: &HeaderMap<'_>, parts: &[ContentPart<'_>]) -> Result<String, Error> {
    build_message_with(headers, parts, make_boundary)
}

/// Same as [`build_message`] using the provided boundary generator.
pub fn build_message_with<B>(
    headers: &HeaderMap<'_>,
    parts: &[ContentPart<'_>],
    mut boundary: B,
) -> Result<String, Error>
where
    B: FnMut(MultipartType) -> String,
{
    validate(headers, parts)?;
    let root = MimeNode::new(parts).ok_or(Error::NoContentParts)?;

    log::trace!(
        "Composing message with {} parts ({:?} root)",
        root.leaf_count(),
        root.subtype()
    );

    let mut out = headers.render_message_headers();
    root.write_to(&mut out, &mut boundary, DEFAULT_LINE_LENGTH);
    Ok(out)
}

fn validate(headers: &HeaderMap<'_>, parts: &[ContentPart<'_>]) -> Result<(), Error> {
    for name in [FROM, TO, SUBJECT] {
        if headers.get(name).map_or(true, |value| value.trim().is_empty()) {
            return Err(Error::MissingHeader(name));
        }
    }

    if parts.is_empty() {
        return Err(Error::NoContentParts);
    }

    if let Some(pos) = parts
        .iter()
        .position(|part| part.content_type().trim().is_empty())
    {
        return Err(Error::MissingContentType(pos));
    }

    Ok(())
}
