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

use super::{ContentPart, CONTENT_DISPOSITION, CONTENT_ID, CONTENT_TYPE};

/// Parts of a message grouped by the role they play in the MIME tree.
#[derive(Debug, Default)]
pub struct Classified<'a, 'x> {
    pub text: Option<&'a ContentPart<'x>>,
    pub html: Option<&'a ContentPart<'x>>,
    pub inline: Vec<&'a ContentPart<'x>>,
    pub attachments: Vec<&'a ContentPart<'x>>,
}

impl<'x> ContentPart<'x> {
    pub fn content_type(&self) -> &str {
        self.headers.get(CONTENT_TYPE).unwrap_or_default()
    }

    pub fn disposition(&self) -> Option<&str> {
        self.headers.get(CONTENT_DISPOSITION)
    }

    pub fn content_id(&self) -> Option<&str> {
        self.headers.get(CONTENT_ID)
    }

    pub fn is_text(&self) -> bool {
        self.content_type().contains("text/plain")
    }

    pub fn is_html(&self) -> bool {
        self.content_type().contains("text/html")
    }

    /// Inline resource referenced from the HTML body, such as an embedded image.
    pub fn is_inline(&self) -> bool {
        self.disposition() == Some("inline")
            && self.content_id().is_some()
            && !self.is_text()
            && !self.is_html()
    }

    pub fn is_attachment(&self) -> bool {
        match self.disposition() {
            Some(disposition) => disposition.starts_with("attachment"),
            None => !self.is_text() && !self.is_html(),
        }
    }
}

impl<'a, 'x> Classified<'a, 'x> {
    /// Groups `parts` by role, keeping their original order.
    ///
    /// The text and HTML bodies are the first `text/plain` and `text/html`
    /// parts that are not attachments. A `text/plain` or `text/html` part
    /// with an `attachment` disposition is always sent as an attachment and
    /// never picked as a body, even when it comes first.
    pub fn new(parts: &'a [ContentPart<'x>]) -> Self {
        let mut classified = Classified::default();

        for part in parts {
            if part.is_attachment() {
                classified.attachments.push(part);
            } else if part.is_text() {
                if classified.text.is_none() {
                    classified.text = Some(part);
                }
            } else if part.is_html() {
                if classified.html.is_none() {
                    classified.html = Some(part);
                }
            } else if part.is_inline() {
                classified.inline.push(part);
            } else {
                classified.attachments.push(part);
            }
        }

        classified
    }

    pub fn has_body(&self) -> bool {
        self.text.is_some() || self.html.is_some()
    }
}

#[cfg(test)]
mod test {
    use crate::mime::{Classified, ContentPart, HeaderMap, TransferEncoding};

    fn part(headers: &[(&'static str, &'static str)]) -> ContentPart<'static> {
        ContentPart::new(headers.iter().copied().collect::<HeaderMap>(), "")
    }

    #[test]
    fn part_roles() {
        for (headers, is_text, is_html, is_inline, is_attachment) in [
            (vec![("Content-Type", "text/plain; charset=UTF-8")], true, false, false, false),
            (vec![("Content-Type", "text/html")], false, true, false, false),
            (
                vec![
                    ("Content-Type", "image/png"),
                    ("Content-Disposition", "inline"),
                    ("Content-ID", "<logo>"),
                ],
                false,
                false,
                true,
                false,
            ),
            (
                vec![("Content-Type", "image/png"), ("Content-Disposition", "inline")],
                false,
                false,
                false,
                false,
            ),
            (vec![("Content-Type", "application/pdf")], false, false, false, true),
            (
                vec![
                    ("Content-Type", "text/plain"),
                    ("Content-Disposition", "attachment; filename=\"notes.txt\""),
                ],
                true,
                false,
                false,
                true,
            ),
            (
                vec![
                    ("Content-Type", "text/html"),
                    ("Content-Disposition", "inline"),
                    ("Content-ID", "<page>"),
                ],
                false,
                true,
                false,
                false,
            ),
        ] {
            let part = part(&headers);
            assert_eq!(part.is_text(), is_text, "{:?}", headers);
            assert_eq!(part.is_html(), is_html, "{:?}", headers);
            assert_eq!(part.is_inline(), is_inline, "{:?}", headers);
            assert_eq!(part.is_attachment(), is_attachment, "{:?}", headers);
        }
    }

    #[test]
    fn classify_parts() {
        let parts = vec![
            ContentPart::with_type("application/pdf", Some(TransferEncoding::Base64), "JVBERi0="),
            ContentPart::with_type("text/html", None, "<p>first</p>"),
            ContentPart::with_type("text/plain", None, "first"),
            ContentPart::with_type("text/plain", None, "second"),
            ContentPart::with_type("image/gif", Some(TransferEncoding::Base64), "R0lGOD==")
                .header("Content-Disposition", "inline")
                .header("Content-ID", "<spacer>"),
            ContentPart::with_type("text/html", None, "<p>second</p>"),
            ContentPart::with_type("image/png", Some(TransferEncoding::Base64), "iVBORw==")
                .header("Content-Disposition", "inline"),
            ContentPart::with_type("text/plain", None, "notes")
                .header("Content-Disposition", "attachment; filename=\"notes.txt\""),
        ];
        let classified = Classified::new(&parts);

        assert_eq!(classified.text.map(|p| p.content.as_ref()), Some("first"));
        assert_eq!(
            classified.html.map(|p| p.content.as_ref()),
            Some("<p>first</p>")
        );
        assert_eq!(
            classified
                .inline
                .iter()
                .map(|p| p.content.as_ref())
                .collect::<Vec<_>>(),
            vec!["R0lGOD=="]
        );
        assert_eq!(
            classified
                .attachments
                .iter()
                .map(|p| p.content.as_ref())
                .collect::<Vec<_>>(),
            vec!["JVBERi0=", "iVBORw==", "notes"]
        );
        assert!(classified.has_body());
    }

    #[test]
    fn attached_text_is_not_a_body() {
        let parts = vec![
            ContentPart::with_type("text/plain", None, "notes")
                .header("Content-Disposition", "attachment; filename=\"notes.txt\""),
            ContentPart::with_type("text/html", None, "<p>page</p>")
                .header("Content-Disposition", "attachment; filename=\"page.html\""),
            ContentPart::with_type("text/plain", None, "body"),
        ];
        let classified = Classified::new(&parts);

        assert_eq!(classified.text.map(|p| p.content.as_ref()), Some("body"));
        assert!(classified.html.is_none());
        assert_eq!(classified.attachments.len(), 2);

        let classified = Classified::new(&parts[..2]);
        assert!(!classified.has_body());
        assert_eq!(classified.attachments.len(), 2);
    }
}
