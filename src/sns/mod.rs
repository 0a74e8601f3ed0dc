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

//! Authenticity checks for Amazon SNS HTTP(S) callbacks.
//!
//! A callback is trusted only after [`Verifier::verify`] succeeds: the
//! signing certificate URL must point to the trusted domain over HTTPS,
//! the certificate is downloaded and its RSA key must validate the
//! signature over the canonical string of the message.

use std::{borrow::Cow, fmt::Display, ops::Deref};

pub mod certificate;
pub mod fetch;
pub mod message;
pub mod signature;

pub use fetch::CertificateFetcher;
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use message::{CallbackMessage, MessageKind};
pub use signature::{verify_pem, SignatureVersion};

pub const DEFAULT_TRUSTED_DOMAIN: &str = "amazonaws.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// URL is not HTTPS or its host is outside the trusted domain.
    UntrustedSource(String),

    /// Unknown message `Type`.
    UnsupportedType(String),

    /// Unknown `SignatureVersion`.
    UnsupportedSignatureVersion(String),

    /// The certificate or confirmation URL could not be retrieved.
    Fetch(String),

    /// Request timeout.
    Timeout,

    /// Base64 decode error in the certificate or signature.
    Base64(base64::DecodeError),

    /// Malformed certificate.
    Certificate(certificate::Error),

    /// The certificate does not carry a usable RSA public key.
    InvalidKey(String),

    /// The signature could not be decoded.
    InvalidSignature(String),

    /// The signature does not match the message.
    SignatureMismatch,

    /// The message is not a subscription confirmation.
    NotASubscription,
}

/// Verifies SNS callbacks against certificates obtained through `F`.
#[derive(Debug, Clone)]
pub struct Verifier<F> {
    fetcher: F,
    trusted_domain: Cow<'static, str>,
}

/// A callback whose signature has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified<'x> {
    message: &'x CallbackMessage,
    kind: MessageKind,
}

impl<F: CertificateFetcher> Verifier<F> {
    pub fn new(fetcher: F) -> Self {
        Verifier {
            fetcher,
            trusted_domain: DEFAULT_TRUSTED_DOMAIN.into(),
        }
    }

    /// Sets the domain certificates must be served from.
    /// Defaults to `amazonaws.com`.
    pub fn trusted_domain(mut self, domain: impl Into<Cow<'static, str>>) -> Self {
        self.trusted_domain = domain.into();
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns `true` if `url` is HTTPS and its host is the trusted domain
    /// or one of its subdomains.
    pub fn is_trusted_url(&self, url: &str) -> bool {
        let host = match https_host(url) {
            Some(host) => host,
            None => return false,
        };
        let (host, domain) = (host.as_bytes(), self.trusted_domain.as_bytes());

        host.eq_ignore_ascii_case(domain)
            || (host.len() > domain.len()
                && host[host.len() - domain.len() - 1] == b'.'
                && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain))
    }

    /// Verifies the signature of a callback message.
    ///
    /// No request is made unless the message type and signature version are
    /// supported and the certificate URL is trusted.
    pub async fn verify<'x>(&self, message: &'x CallbackMessage) -> Result<Verified<'x>, Error> {
        let kind = message.kind()?;
        let version = SignatureVersion::parse(&message.signature_version)?;
        let data = message.canonical_string()?;

        if !self.is_trusted_url(&message.signing_cert_url) {
            log::debug!(
                "Rejecting {} {}: untrusted certificate URL {:?}",
                kind,
                message.message_id,
                message.signing_cert_url
            );
            return Err(Error::UntrustedSource(message.signing_cert_url.clone()));
        }

        log::debug!(
            "Fetching signing certificate {:?} for {} {}",
            message.signing_cert_url,
            kind,
            message.message_id
        );
        let pem = self.fetcher.fetch(&message.signing_cert_url).await?;

        if verify_pem(&pem, version, &message.signature, &data)? {
            log::debug!("Verified {} {}", kind, message.message_id);
            Ok(Verified { message, kind })
        } else {
            log::debug!("Signature mismatch for {} {}", kind, message.message_id);
            Err(Error::SignatureMismatch)
        }
    }

    /// Confirms a verified subscription by visiting its `SubscribeURL`.
    ///
    /// Returns the body of the confirmation response.
    pub async fn confirm_subscription(&self, verified: &Verified<'_>) -> Result<String, Error> {
        let url = match (verified.kind, verified.subscribe_url.as_deref()) {
            (MessageKind::SubscriptionConfirmation, Some(url)) => url,
            _ => return Err(Error::NotASubscription),
        };

        if !self.is_trusted_url(url) {
            return Err(Error::UntrustedSource(url.to_string()));
        }

        log::debug!("Confirming subscription to {}", verified.topic_arn);
        self.fetcher.fetch(url).await
    }
}

/// Returns the host of an `https://` URL, without port.
fn https_host(url: &str) -> Option<&str> {
    let rest = url
        .get(..8)
        .filter(|scheme| scheme.eq_ignore_ascii_case("https://"))
        .map(|_| &url[8..])?;
    let authority = rest
        .split(|ch| matches!(ch, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();

    if authority.contains('@') {
        return None;
    }

    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|ch| ch.is_ascii_digit()) => host,
        Some(_) => return None,
        None => authority,
    };

    if host.is_empty() || host.starts_with('.') || host.ends_with('.') {
        None
    } else {
        Some(host)
    }
}

impl<'x> Verified<'x> {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn message(&self) -> &'x CallbackMessage {
        self.message
    }
}

impl<'x> Deref for Verified<'x> {
    type Target = CallbackMessage;

    fn deref(&self) -> &Self::Target {
        self.message
    }
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        crate::Error::Authenticity(err)
    }
}

impl From<certificate::Error> for Error {
    fn from(err: certificate::Error) -> Self {
        Error::Certificate(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UntrustedSource(url) => write!(f, "Untrusted source: {}", url),
            Error::UnsupportedType(value) => write!(f, "Unsupported message type: {}", value),
            Error::UnsupportedSignatureVersion(value) => {
                write!(f, "Unsupported signature version: {}", value)
            }
            Error::Fetch(err) => write!(f, "Failed to fetch resource: {}", err),
            Error::Timeout => write!(f, "Request timeout"),
            Error::Base64(err) => write!(f, "Base64 decode error: {}", err),
            Error::Certificate(err) => write!(f, "Malformed certificate: {}", err),
            Error::InvalidKey(err) => write!(f, "Invalid public key: {}", err),
            Error::InvalidSignature(err) => write!(f, "Invalid signature: {}", err),
            Error::SignatureMismatch => write!(f, "Signature mismatch"),
            Error::NotASubscription => write!(f, "Message is not a subscription confirmation"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        future::Future,
        sync::{Arc, Mutex},
    };

    use crate::sns::{
        certificate::test::{CERT_V1, CERT_V3},
        message::test::{notification, subscription_confirmation, CERT_URL},
        signature::test::{CONFIRMATION_SHA256, NOTIFICATION_SHA1, NOTIFICATION_SHA256},
        CallbackMessage, CertificateFetcher, Error, MessageKind, Verifier,
    };

    #[derive(Clone, Default)]
    struct StaticFetcher {
        responses: HashMap<String, String>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StaticFetcher {
        fn new(responses: &[(&str, &str)]) -> Self {
            StaticFetcher {
                responses: responses
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Default::default(),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl CertificateFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<String, Error>> + Send {
            self.requests.lock().unwrap().push(url.to_string());
            let response = self
                .responses
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Fetch("404 Not Found".into()));
            async move { response }
        }
    }

    #[test]
    fn trusted_urls() {
        let verifier = Verifier::new(StaticFetcher::default());

        for (url, expected) in [
            (CERT_URL, true),
            ("https://amazonaws.com/cert.pem", true),
            ("HTTPS://SNS.US-EAST-1.AMAZONAWS.COM:443/cert.pem", true),
            ("https://sns.us-east-1.amazonaws.com?x=1", true),
            ("http://sns.us-east-1.amazonaws.com/cert.pem", false),
            ("https://sns.us-east-1.amazonaws.com.evil.com/cert.pem", false),
            ("https://evilamazonaws.com/cert.pem", false),
            ("https://sns.amazonaws.com@evil.com/cert.pem", false),
            ("https://evil.com/?host=sns.amazonaws.com", false),
            ("https://evil.com/sns.amazonaws.com", false),
            ("https://sns.amazonaws.com:evil/cert.pem", false),
            ("https://sns.amazonaws.com./cert.pem", false),
            ("https://.amazonaws.com/cert.pem", false),
            ("https://", false),
            ("", false),
        ] {
            assert_eq!(verifier.is_trusted_url(url), expected, "{}", url);
        }

        let verifier = verifier.trusted_domain("example.org");
        assert!(verifier.is_trusted_url("https://sns.example.org/cert.pem"));
        assert!(!verifier.is_trusted_url(CERT_URL));
    }

    #[tokio::test]
    async fn verify_callbacks() {
        for pem in [CERT_V3, CERT_V1] {
            let fetcher = StaticFetcher::new(&[(CERT_URL, pem)]);
            let verifier = Verifier::new(fetcher.clone());

            for message in [
                notification("1", NOTIFICATION_SHA1),
                notification("2", NOTIFICATION_SHA256),
                subscription_confirmation(CONFIRMATION_SHA256),
            ] {
                let verified = verifier.verify(&message).await.unwrap();
                assert_eq!(verified.message_id, message.message_id);
                assert_eq!(verified.kind(), message.kind().unwrap());
            }
            assert_eq!(fetcher.requests(), vec![CERT_URL; 3]);
        }
    }

    #[tokio::test]
    async fn reject_callbacks() {
        let fetcher = StaticFetcher::new(&[(CERT_URL, CERT_V3)]);
        let verifier = Verifier::new(fetcher.clone());

        let tampered = CallbackMessage {
            message: "Hello from somebody else".into(),
            ..notification("1", NOTIFICATION_SHA1)
        };
        let swapped = notification("2", NOTIFICATION_SHA1);
        assert_eq!(
            verifier.verify(&tampered).await,
            Err(Error::SignatureMismatch)
        );
        assert_eq!(
            verifier.verify(&swapped).await,
            Err(Error::SignatureMismatch)
        );
        assert_eq!(fetcher.requests().len(), 2);

        // Nothing is fetched for these
        for (message, expected) in [
            (
                CallbackMessage {
                    signing_cert_url: "https://attacker.example.com/cert.pem".into(),
                    ..notification("1", NOTIFICATION_SHA1)
                },
                Error::UntrustedSource("https://attacker.example.com/cert.pem".into()),
            ),
            (
                CallbackMessage {
                    signing_cert_url: "http://sns.us-east-1.amazonaws.com/cert.pem".into(),
                    ..notification("1", NOTIFICATION_SHA1)
                },
                Error::UntrustedSource("http://sns.us-east-1.amazonaws.com/cert.pem".into()),
            ),
            (
                notification("3", NOTIFICATION_SHA1),
                Error::UnsupportedSignatureVersion("3".into()),
            ),
            (
                CallbackMessage {
                    message_type: "Heartbeat".into(),
                    ..notification("1", NOTIFICATION_SHA1)
                },
                Error::UnsupportedType("Heartbeat".into()),
            ),
        ] {
            assert_eq!(verifier.verify(&message).await, Err(expected));
        }
        assert_eq!(fetcher.requests().len(), 2);

        // Fetch failures are rejections
        let verifier = Verifier::new(StaticFetcher::default());
        assert_eq!(
            verifier.verify(&notification("1", NOTIFICATION_SHA1)).await,
            Err(Error::Fetch("404 Not Found".into()))
        );
    }

    #[tokio::test]
    async fn confirm_subscriptions() {
        let confirmation = subscription_confirmation(CONFIRMATION_SHA256);
        let subscribe_url = confirmation.subscribe_url.clone().unwrap();
        let fetcher = StaticFetcher::new(&[
            (CERT_URL, CERT_V3),
            (
                subscribe_url.as_str(),
                "<ConfirmSubscriptionResponse><ConfirmSubscriptionResult><SubscriptionArn>arn:aws:sns:us-west-2:123456789012:MyTopic:2bcfbf39</SubscriptionArn></ConfirmSubscriptionResult></ConfirmSubscriptionResponse>",
            ),
        ]);
        let verifier = Verifier::new(fetcher.clone());

        let verified = verifier.verify(&confirmation).await.unwrap();
        assert_eq!(verified.kind(), MessageKind::SubscriptionConfirmation);
        assert!(verifier
            .confirm_subscription(&verified)
            .await
            .unwrap()
            .contains("<SubscriptionArn>arn:aws:sns:us-west-2:123456789012:MyTopic:2bcfbf39"));
        assert_eq!(fetcher.requests(), vec![CERT_URL.to_string(), subscribe_url]);

        let message = notification("2", NOTIFICATION_SHA256);
        let verified = verifier.verify(&message).await.unwrap();
        assert_eq!(
            verifier.confirm_subscription(&verified).await,
            Err(Error::NotASubscription)
        );

        // Signed, but pointing elsewhere
        let verifier = Verifier::new(fetcher.clone()).trusted_domain("us-east-1.amazonaws.com");
        let verified = verifier.verify(&confirmation).await.unwrap();
        assert_eq!(
            verifier.confirm_subscription(&verified).await,
            Err(Error::UntrustedSource(
                confirmation.subscribe_url.clone().unwrap()
            ))
        );
    }
}
