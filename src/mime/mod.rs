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

//! MIME message composition.
//!
//! Messages are composed from a [`HeaderMap`] holding the top-level headers
//! and a flat list of [`ContentPart`]s. The role of each part (plain text
//! body, HTML body, inline resource or attachment) is derived from its
//! `Content-Type`, `Content-Disposition` and `Content-ID` headers, and the
//! parts are nested into `multipart/mixed`, `multipart/alternative` and
//! `multipart/related` containers as needed.

use std::{borrow::Cow, fmt::Display};

pub mod builder;
pub mod encoding;
pub mod headers;
pub mod multipart;
pub mod part;

pub use builder::{Address, MessageBuilder};
pub use encoding::{fold, TransferEncoding, DEFAULT_LINE_LENGTH};
pub use multipart::{build_message, build_message_with, MimeNode, MultipartType};
pub use part::Classified;

pub const FROM: &str = "From";
pub const TO: &str = "To";
pub const SUBJECT: &str = "Subject";
pub const DATE: &str = "Date";
pub const MIME_VERSION: &str = "MIME-Version";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const CONTENT_ID: &str = "Content-ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required message header is missing or empty.
    MissingHeader(&'static str),

    /// No content parts were provided.
    NoContentParts,

    /// The content part at the given position has no `Content-Type` header.
    MissingContentType(usize),
}

/// Ordered header collection.
///
/// Names are matched case-sensitively. Setting a name that is already
/// present replaces its value in place, so the original position is kept.
/// Headers without a value are skipped when rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap<'x> {
    headers: Vec<(Cow<'x, str>, Option<Cow<'x, str>>)>,
}

/// A single MIME body part: its own headers plus the already encoded content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPart<'x> {
    pub headers: HeaderMap<'x>,
    pub content: Cow<'x, str>,
}

impl<'x> HeaderMap<'x> {
    pub fn new() -> Self {
        HeaderMap {
            headers: Vec::new(),
        }
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn set(&mut self, name: impl Into<Cow<'x, str>>, value: impl Into<Cow<'x, str>>) {
        self.set_opt(name, Some(value.into()));
    }

    /// Sets a header that may be unset. Unset headers are not rendered.
    pub fn set_opt(&mut self, name: impl Into<Cow<'x, str>>, value: Option<Cow<'x, str>>) {
        let name = name.into();
        if let Some((_, current)) = self.headers.iter_mut().find(|(n, _)| *n == name) {
            *current = value;
        } else {
            self.headers.push((name, value));
        }
    }

    /// Builder variant of [`HeaderMap::set`].
    pub fn with(mut self, name: impl Into<Cow<'x, str>>, value: impl Into<Cow<'x, str>>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of a header, if present and set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over the headers that have a value, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter_map(|(n, v)| v.as_deref().map(|v| (n.as_ref(), v)))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<'x, K, V> FromIterator<(K, V)> for HeaderMap<'x>
where
    K: Into<Cow<'x, str>>,
    V: Into<Cow<'x, str>>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

impl<'x> ContentPart<'x> {
    pub fn new(headers: HeaderMap<'x>, content: impl Into<Cow<'x, str>>) -> Self {
        ContentPart {
            headers,
            content: content.into(),
        }
    }

    /// Creates a part with only a `Content-Type` and `Content-Transfer-Encoding`.
    pub fn with_type(
        content_type: impl Into<Cow<'x, str>>,
        encoding: Option<TransferEncoding>,
        content: impl Into<Cow<'x, str>>,
    ) -> Self {
        let mut headers = HeaderMap::new().with(CONTENT_TYPE, content_type);
        if let Some(encoding) = encoding {
            headers.set(CONTENT_TRANSFER_ENCODING, encoding.as_str());
        }
        ContentPart::new(headers, content)
    }

    /// Adds or replaces a header on this part.
    pub fn header(mut self, name: impl Into<Cow<'x, str>>, value: impl Into<Cow<'x, str>>) -> Self {
        self.headers.set(name, value);
        self
    }
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        crate::Error::Validation(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingHeader(name) => write!(f, "{} header is required", name),
            Error::NoContentParts => write!(f, "At least one content part is required"),
            Error::MissingContentType(pos) => {
                write!(f, "Content part {} has no Content-Type header", pos)
            }
        }
    }
}

impl std::error::Error for Error {}
