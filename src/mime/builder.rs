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

use std::{borrow::Cow, fmt::Display};

use base64::{engine::general_purpose::STANDARD, Engine};

use super::{
    build_message, ContentPart, Error, HeaderMap, TransferEncoding, CONTENT_DISPOSITION,
    CONTENT_ID, DATE, FROM, SUBJECT, TO,
};

/// E-mail address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address<'x> {
    pub name: Option<Cow<'x, str>>,
    pub email: Cow<'x, str>,
}

/// Collects headers and parts and composes them with [`build_message`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder<'x> {
    headers: HeaderMap<'x>,
    to: Vec<Address<'x>>,
    parts: Vec<ContentPart<'x>>,
}

impl<'x> Address<'x> {
    pub fn new(name: Option<impl Into<Cow<'x, str>>>, email: impl Into<Cow<'x, str>>) -> Self {
        Address {
            name: name.map(Into::into),
            email: email.into(),
        }
    }
}

impl<'x> From<&'x str> for Address<'x> {
    fn from(email: &'x str) -> Self {
        Address {
            name: None,
            email: email.into(),
        }
    }
}

impl<'x> From<String> for Address<'x> {
    fn from(email: String) -> Self {
        Address {
            name: None,
            email: email.into(),
        }
    }
}

impl<'x> From<(&'x str, &'x str)> for Address<'x> {
    fn from((name, email): (&'x str, &'x str)) -> Self {
        Address {
            name: Some(name.into()),
            email: email.into(),
        }
    }
}

impl<'x> From<(String, String)> for Address<'x> {
    fn from((name, email): (String, String)) -> Self {
        Address {
            name: Some(name.into()),
            email: email.into(),
        }
    }
}

impl<'x> Display for Address<'x> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) if !name.is_empty() => {
                write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.email)
            }
            _ => f.write_str(&self.email),
        }
    }
}

impl<'x> MessageBuilder<'x> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the message sender.
    pub fn from(mut self, address: impl Into<Address<'x>>) -> Self {
        self.headers.set(FROM, address.into().to_string());
        self
    }

    /// Adds a message recipient.
    pub fn to(mut self, address: impl Into<Address<'x>>) -> Self {
        self.to.push(address.into());
        let to = self
            .to
            .iter()
            .map(|addr| addr.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.headers.set(TO, to);
        self
    }

    /// Sets the message subject.
    pub fn subject(mut self, subject: impl Into<Cow<'x, str>>) -> Self {
        self.headers.set(SUBJECT, subject);
        self
    }

    /// Adds a header, replacing any existing header with the same name.
    pub fn header(
        mut self,
        name: impl Into<Cow<'x, str>>,
        value: impl Into<Cow<'x, str>>,
    ) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Adds a plain text body, sent as quoted-printable.
    pub fn text_body(self, text: impl Into<Cow<'x, str>>) -> Self {
        self.text_body_with(text, TransferEncoding::QuotedPrintable)
    }

    /// Adds a plain text body, encoding `text` with `encoding`.
    pub fn text_body_with(
        mut self,
        text: impl Into<Cow<'x, str>>,
        encoding: TransferEncoding,
    ) -> Self {
        self.parts.push(ContentPart::with_type(
            "text/plain; charset=UTF-8",
            Some(encoding),
            encode_body(text.into(), encoding),
        ));
        self
    }

    /// Adds an HTML body, sent as quoted-printable.
    pub fn html_body(self, html: impl Into<Cow<'x, str>>) -> Self {
        self.html_body_with(html, TransferEncoding::QuotedPrintable)
    }

    /// Adds an HTML body, encoding `html` with `encoding`.
    pub fn html_body_with(
        mut self,
        html: impl Into<Cow<'x, str>>,
        encoding: TransferEncoding,
    ) -> Self {
        self.parts.push(ContentPart::with_type(
            "text/html; charset=UTF-8",
            Some(encoding),
            encode_body(html.into(), encoding),
        ));
        self
    }

    /// Adds an attachment. `content` is expected to be base64 encoded already.
    pub fn attachment(
        mut self,
        filename: impl AsRef<str>,
        content: impl Into<Cow<'x, str>>,
        mime_type: impl Into<Cow<'x, str>>,
    ) -> Self {
        self.parts.push(
            ContentPart::with_type(mime_type, Some(TransferEncoding::Base64), content).header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.as_ref()),
            ),
        );
        self
    }

    /// Adds an attachment from raw bytes.
    pub fn binary_attachment(
        self,
        filename: impl AsRef<str>,
        content: impl AsRef<[u8]>,
        mime_type: impl Into<Cow<'x, str>>,
    ) -> Self {
        let content = STANDARD.encode(content);
        self.attachment(filename, content, mime_type)
    }

    /// Adds an inline part, referenced from the HTML body as `cid:<cid>`.
    /// `content` is expected to be base64 encoded already.
    pub fn inline(
        mut self,
        cid: impl AsRef<str>,
        content: impl Into<Cow<'x, str>>,
        mime_type: impl Into<Cow<'x, str>>,
    ) -> Self {
        self.parts.push(
            ContentPart::with_type(mime_type, Some(TransferEncoding::Base64), content)
                .header(CONTENT_ID, format!("<{}>", cid.as_ref()))
                .header(CONTENT_DISPOSITION, "inline"),
        );
        self
    }

    /// Adds a preassembled content part.
    pub fn part(mut self, part: ContentPart<'x>) -> Self {
        self.parts.push(part);
        self
    }

    pub fn headers(&self) -> &HeaderMap<'x> {
        &self.headers
    }

    pub fn recipients(&self) -> &[Address<'x>] {
        &self.to
    }

    pub fn parts(&self) -> &[ContentPart<'x>] {
        &self.parts
    }

    /// Composes the raw message. A `Date` header is added unless one was set.
    pub fn write(&self) -> Result<String, Error> {
        if self.headers.contains(DATE) {
            build_message(&self.headers, &self.parts)
        } else {
            let mut headers = self.headers.clone();
            headers.set(DATE, chrono::Utc::now().to_rfc2822());
            build_message(&headers, &self.parts)
        }
    }

    /// Composes the raw message and encodes it as base64.
    pub fn write_base64(&self) -> Result<String, Error> {
        self.write().map(|raw| STANDARD.encode(raw))
    }
}

fn encode_body(body: Cow<'_, str>, encoding: TransferEncoding) -> Cow<'_, str> {
    match encoding {
        TransferEncoding::QuotedPrintable => quoted_printable::encode_to_str(body.as_bytes()).into(),
        TransferEncoding::Base64 => STANDARD.encode(body.as_bytes()).into(),
        TransferEncoding::SevenBit | TransferEncoding::EightBit => body,
    }
}
