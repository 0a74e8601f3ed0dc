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

use super::{ContentPart, CONTENT_TRANSFER_ENCODING};

/// Maximum line length used when folding part content.
pub const DEFAULT_LINE_LENGTH: usize = 76;

/// Content-Transfer-Encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    SevenBit,
    EightBit,
}

impl TransferEncoding {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("base64") {
            Some(TransferEncoding::Base64)
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            Some(TransferEncoding::QuotedPrintable)
        } else if value.eq_ignore_ascii_case("7bit") {
            Some(TransferEncoding::SevenBit)
        } else if value.eq_ignore_ascii_case("8bit") {
            Some(TransferEncoding::EightBit)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEncoding::Base64 => "base64",
            TransferEncoding::QuotedPrintable => "quoted-printable",
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
        }
    }
}

impl Display for TransferEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'x> ContentPart<'x> {
    pub fn transfer_encoding(&self) -> Option<TransferEncoding> {
        self.headers
            .get(CONTENT_TRANSFER_ENCODING)
            .and_then(TransferEncoding::parse)
    }

    /// Content of the part wrapped according to its transfer encoding.
    pub fn folded_content(&self, max_len: usize) -> Cow<'_, str> {
        fold(&self.content, self.transfer_encoding(), max_len)
    }
}

/// Wraps `content` into lines of at most `max_len` bytes, joined by CRLF.
///
/// Base64 content is cut on 4-character boundaries. Quoted-printable and
/// 7bit/8bit content is only broken after whitespace, so words longer than
/// `max_len` are kept whole. Line breaks already present in the content are
/// kept. Content without a known encoding is returned unchanged.
pub fn fold(content: &str, encoding: Option<TransferEncoding>, max_len: usize) -> Cow<'_, str> {
    if content.is_empty() {
        return Cow::Borrowed(content);
    }

    match encoding {
        Some(TransferEncoding::Base64) => fold_base64(content, max_len).into(),
        Some(TransferEncoding::QuotedPrintable) => fold_words(content, max_len, true).into(),
        Some(TransferEncoding::SevenBit | TransferEncoding::EightBit) => {
            fold_words(content, max_len, false).into()
        }
        None => Cow::Borrowed(content),
    }
}

fn fold_base64(content: &str, max_len: usize) -> String {
    let width = std::cmp::max(max_len / 4, 1) * 4;
    let mut out = String::with_capacity(content.len() + (content.len() / width) * 2);

    for (pos, ch) in content.chars().enumerate() {
        if pos > 0 && pos % width == 0 {
            out.push_str("\r\n");
        }
        out.push(ch);
    }

    out
}

fn fold_words(content: &str, max_len: usize, soft_breaks: bool) -> String {
    let mut lines = Vec::with_capacity(content.len() / max_len.max(1) + 1);

    for segment in content.split("\r\n") {
        fold_line(segment, max_len, soft_breaks, &mut lines);
    }

    lines.join("\r\n")
}

fn fold_line(segment: &str, max_len: usize, soft_breaks: bool, lines: &mut Vec<String>) {
    if segment.len() <= max_len {
        lines.push(segment.to_string());
        return;
    }

    let mut line = String::with_capacity(max_len);
    for word in segment.split_inclusive(char::is_whitespace) {
        if !line.is_empty() && line.len() + word.len() > max_len {
            if soft_breaks && line.ends_with('=') {
                // Keep a pending escape intact across the fold
                line.push('=');
            }
            lines.push(std::mem::replace(&mut line, String::with_capacity(max_len)));
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
}
