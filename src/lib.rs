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

//! # ses-mail
//!
//! [![crates.io](https://img.shields.io/crates/v/ses-mail)](https://crates.io/crates/ses-mail)
//! [![docs.rs](https://img.shields.io/docsrs/ses-mail)](https://docs.rs/ses-mail)
//! [![crates.io](https://img.shields.io/crates/l/ses-mail)](http://www.apache.org/licenses/LICENSE-2.0)
//!
//! _ses-mail_ is a Rust library to compose e-mail messages for Amazon SES and to authenticate
//! the delivery notifications Amazon SNS posts back. It includes the following features:
//!
//! - Generates **MIME** messages (_RFC 2045 - 2049_) from a flat list of content parts, nesting
//!   them into `multipart/mixed`, `multipart/alternative` and `multipart/related` as needed.
//! - Line folding for **base64**, **quoted-printable**, **7bit** and **8bit** content.
//! - Verification of **SNS** HTTP(S) callbacks (signature versions 1 and 2) with a strict
//!   HTTPS and trusted domain check on the signing certificate URL.
//! - Typed **SES** sending events (bounces, complaints, deliveries, opens, clicks, ...).
//! - **SES v2** raw message delivery signed with AWS Signature Version 4.
//! - Full async (requires Tokio).
//!
//! ## Usage Example
//!
//! Build a multipart message and send it through Amazon SES:
//!
//! ```rust
//!     // Build a message with an inline image and an attachment
//!     let message = MessageBuilder::new()
//!         .from(("John Doe", "john@example.com"))
//!         .to(("Jane Doe", "jane@example.com"))
//!         .to("james@test.com")
//!         .subject("Hi!")
//!         .text_body("Hello world!")
//!         .html_body("<h1>Hello, world!</h1><img src=\"cid:logo\">")
//!         .inline("logo", "iVBORw0KGgo=", "image/png")
//!         .binary_attachment("pretzels.txt", b"These pretzels are making me thirsty.", "text/plain");
//!
//!     // Credentials are read from AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_REGION
//!     let message_id = SesClient::from_env()
//!         .unwrap()
//!         .send(&message)
//!         .await
//!         .unwrap();
//! ```
//!
//! Compose a message from headers and content parts directly:
//!
//! ```rust
//!     let headers = HeaderMap::new()
//!         .with("From", "john@example.com")
//!         .with("To", "jane@example.com")
//!         .with("Subject", "Howdy!");
//!     let parts = [
//!         ContentPart::with_type("text/plain; charset=UTF-8", Some(TransferEncoding::SevenBit), "Hello!"),
//!         ContentPart::with_type("text/html; charset=UTF-8", Some(TransferEncoding::SevenBit), "<p>Hello!</p>"),
//!     ];
//!     let raw = build_message(&headers, &parts).unwrap();
//! ```
//!
//! Authenticate an SNS callback and decode the SES event it carries:
//!
//! ```rust
//!     let message = CallbackMessage::parse(&request_body).unwrap();
//!     let verifier = Verifier::new(HttpFetcher::new());
//!
//!     let verified = verifier.verify(&message).await.unwrap();
//!     match verified.kind() {
//!         MessageKind::SubscriptionConfirmation => {
//!             verifier.confirm_subscription(&verified).await.unwrap();
//!         }
//!         MessageKind::Notification => match Event::from_callback(&verified).unwrap() {
//!             Event::Bounce { mail, bounce } => {
//!                 println!("{} bounced: {:?}", mail.message_id, bounce.bounce_type);
//!             }
//!             event => println!("{} event", event.event_type()),
//!         },
//!         MessageKind::UnsubscribeConfirmation => (),
//!     }
//! ```
//!
//! ## Testing
//!
//! To run the testsuite:
//!
//! ```bash
//!  $ cargo test --all-features
//! ```
//!
//! ## License
//!
//! Licensed under either of
//!
//!  * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//!  * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.
//!
//! ## Copyright
//!
//! Copyright (C) 2020-2026, Stalwart Labs Ltd.
//!
//! See [COPYING] for the license.
//!
//! [COPYING]: https://github.com/stalwartlabs/ses-mail/blob/main/COPYING
//!

#[cfg(feature = "http")]
pub mod http;
#[forbid(unsafe_code)]
pub mod mime;
pub mod ses;
#[forbid(unsafe_code)]
pub mod sns;

use std::fmt::Display;

#[cfg(feature = "http")]
pub use http::SesClient;
pub use mime::{build_message, ContentPart, HeaderMap, MessageBuilder, TransferEncoding};
pub use ses::Event;
#[cfg(feature = "http")]
pub use sns::HttpFetcher;
pub use sns::{CallbackMessage, CertificateFetcher, MessageKind, Verified, Verifier};

#[derive(Debug)]
pub enum Error {
    /// Message composition error
    Validation(mime::Error),

    /// SNS callback authenticity error
    Authenticity(sns::Error),

    /// SES event decoding error
    Event(ses::Error),

    /// JSON error
    Json(serde_json::Error),

    /// Base64 decode error
    Base64(base64::DecodeError),

    /// HTTP transport error
    Transport(String),

    /// Request signing error
    Signing(String),

    /// Missing AWS credentials.
    MissingCredentials,

    /// Request timeout.
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "Invalid message: {}", e),
            Error::Authenticity(e) => write!(f, "Untrusted SNS message: {}", e),
            Error::Event(e) => write!(f, "SES event error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Base64(e) => write!(f, "Base64 decode error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Signing(e) => write!(f, "Request signing error: {}", e),
            Error::MissingCredentials => write!(f, "Missing AWS credentials"),
            Error::Timeout => write!(f, "Request timeout"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(e) => Some(e),
            Error::Authenticity(e) => Some(e),
            Error::Event(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Base64(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err)
    }
}
