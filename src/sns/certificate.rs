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

//! Minimal DER walker that locates the SubjectPublicKeyInfo of an X.509
//! certificate.
//!
//! Only the conventional layout is understood: an optional `[0]` version
//! tag followed by serialNumber, signature, issuer, validity and subject.
//! Anything else is rejected.

use std::fmt::Display;

use base64::{engine::general_purpose::STANDARD, Engine};

pub const SEQUENCE: u8 = 0x30;
pub const CONTEXT_VERSION: u8 = 0xa0;

/// Number of tbsCertificate fields preceding the SubjectPublicKeyInfo.
const SKIPPED_FIELDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Element at `offset` has an unexpected tag.
    UnexpectedTag { offset: usize, expected: u8, found: u8 },

    /// Input ends before the element at `offset` is complete.
    Truncated { offset: usize },

    /// Indefinite or oversized length at `offset`.
    InvalidLength { offset: usize },
}

/// Reads a DER length starting at `offset`.
///
/// Returns the decoded length and the number of bytes used to encode it.
pub fn read_length(data: &[u8], offset: usize) -> Result<(usize, usize), Error> {
    let first = *data.get(offset).ok_or(Error::Truncated { offset })?;
    if first < 0x80 {
        return Ok((first as usize, 1));
    }

    let count = (first & 0x7f) as usize;
    if count == 0 || count > std::mem::size_of::<usize>() {
        return Err(Error::InvalidLength { offset });
    }
    let bytes = data
        .get(offset + 1..offset + 1 + count)
        .ok_or(Error::Truncated { offset })?;

    Ok((
        bytes
            .iter()
            .fold(0usize, |len, byte| (len << 8) | *byte as usize),
        count + 1,
    ))
}

/// Returns the offsets of the content and the end of the element at `offset`.
fn element_bounds(data: &[u8], offset: usize) -> Result<(usize, usize), Error> {
    if offset >= data.len() {
        return Err(Error::Truncated { offset });
    }
    let (len, len_size) = read_length(data, offset + 1)?;
    let start = offset + 1 + len_size;
    let end = start
        .checked_add(len)
        .ok_or(Error::InvalidLength { offset: offset + 1 })?;
    if end > data.len() {
        return Err(Error::Truncated { offset });
    }
    Ok((start, end))
}

/// Skips the element at `offset`, returning the offset of the next one.
pub fn skip_element(data: &[u8], offset: usize) -> Result<usize, Error> {
    element_bounds(data, offset).map(|(_, end)| end)
}

fn expect_tag(data: &[u8], offset: usize, expected: u8) -> Result<(), Error> {
    match data.get(offset) {
        Some(&found) if found == expected => Ok(()),
        Some(&found) => Err(Error::UnexpectedTag {
            offset,
            expected,
            found,
        }),
        None => Err(Error::Truncated { offset }),
    }
}

/// Returns the DER encoded SubjectPublicKeyInfo, tag and length included.
pub fn extract_spki(der: &[u8]) -> Result<&[u8], Error> {
    // Certificate
    expect_tag(der, 0, SEQUENCE)?;
    let (mut pos, _) = element_bounds(der, 0)?;

    // TBSCertificate
    expect_tag(der, pos, SEQUENCE)?;
    pos = element_bounds(der, pos)?.0;

    if der.get(pos) == Some(&CONTEXT_VERSION) {
        pos = skip_element(der, pos)?;
    }
    for _ in 0..SKIPPED_FIELDS {
        pos = skip_element(der, pos)?;
    }

    expect_tag(der, pos, SEQUENCE)?;
    let end = skip_element(der, pos)?;
    Ok(&der[pos..end])
}

/// Strips the PEM armour and decodes the base64 body.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = pem
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .flat_map(|line| line.chars().filter(|ch| !ch.is_ascii_whitespace()))
        .collect::<String>();
    STANDARD.decode(body)
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedTag {
                offset,
                expected,
                found,
            } => write!(
                f,
                "Expected tag 0x{:02x} at offset {}, found 0x{:02x}",
                expected, offset, found
            ),
            Error::Truncated { offset } => {
                write!(f, "Truncated element at offset {}", offset)
            }
            Error::InvalidLength { offset } => write!(f, "Invalid length at offset {}", offset),
        }
    }
}

impl std::error::Error for Error {}
