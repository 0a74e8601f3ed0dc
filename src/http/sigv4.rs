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

//! AWS Signature Version 4 request signing.

use std::{borrow::Cow, fmt::Write};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Clone)]
pub struct Signer<'x> {
    access_key_id: Cow<'x, str>,
    secret_access_key: Cow<'x, str>,
    session_token: Option<Cow<'x, str>>,
    region: Cow<'x, str>,
    service: Cow<'x, str>,
}

/// Headers to add to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub content_sha256: String,
    pub security_token: Option<String>,
    pub authorization: String,
}

impl<'x> Signer<'x> {
    pub fn new(
        access_key_id: impl Into<Cow<'x, str>>,
        secret_access_key: impl Into<Cow<'x, str>>,
        region: impl Into<Cow<'x, str>>,
        service: impl Into<Cow<'x, str>>,
    ) -> Self {
        Signer {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sets the session token of temporary credentials.
    pub fn session_token(mut self, session_token: impl Into<Cow<'x, str>>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Signs a request without query string.
    ///
    /// `path` must already be URI encoded. The `content-type`, `host`,
    /// `x-amz-content-sha256` and `x-amz-date` headers are signed, plus
    /// `x-amz-security-token` when a session token is set.
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        content_type: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> crate::Result<SignedHeaders> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &amz_date[..8];
        let content_sha256 = hex::encode(Sha256::digest(payload));

        let mut headers = vec![
            ("content-type", content_type),
            ("host", host),
            ("x-amz-content-sha256", content_sha256.as_str()),
            ("x-amz-date", amz_date.as_str()),
        ];
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token", token.as_ref()));
        }

        let mut canonical_request = String::with_capacity(256 + payload.len() / 16);
        let _ = write!(canonical_request, "{}\n{}\n\n", method, path);
        for (name, value) in &headers {
            let _ = writeln!(canonical_request, "{}:{}", name, value.trim());
        }
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");
        let _ = write!(
            canonical_request,
            "\n{}\n{}",
            signed_headers, content_sha256
        );

        let scope = format!(
            "{}/{}/{}/aws4_request",
            date, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signature = hex::encode(hmac_sha256(
            &self.signing_key(date)?,
            string_to_sign.as_bytes(),
        )?);

        Ok(SignedHeaders {
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key_id, scope, signed_headers, signature
            ),
            security_token: self.session_token.as_ref().map(|token| token.to_string()),
            amz_date,
            content_sha256,
        })
    }

    fn signing_key(&self, date: &str) -> crate::Result<Vec<u8>> {
        let key = format!("AWS4{}", self.secret_access_key);
        let key = hmac_sha256(key.as_bytes(), date.as_bytes())?;
        let key = hmac_sha256(&key, self.region.as_bytes())?;
        let key = hmac_sha256(&key, self.service.as_bytes())?;
        hmac_sha256(&key, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> crate::Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|err| crate::Error::Signing(err.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
