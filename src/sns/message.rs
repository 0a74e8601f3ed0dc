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

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::Error;

/// SNS HTTP(S) endpoint message, as posted to the subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackMessage {
    #[serde(rename = "Type")]
    pub message_type: String,
    pub message_id: String,
    pub topic_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub timestamp: String,
    pub signature_version: String,
    pub signature: String,
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "SubscribeURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscribe_url: Option<String>,
    #[serde(
        rename = "UnsubscribeURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unsubscribe_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    SubscriptionConfirmation,
    UnsubscribeConfirmation,
    Notification,
}

/// Fields covered by the signature, in signing order.
const SIGNED_FIELDS: [(MessageKind, &[&str]); 3] = [
    (
        MessageKind::SubscriptionConfirmation,
        &[
            "Message",
            "MessageId",
            "SubscribeURL",
            "Timestamp",
            "Token",
            "TopicArn",
            "Type",
        ],
    ),
    (
        MessageKind::UnsubscribeConfirmation,
        &[
            "Message",
            "MessageId",
            "SubscribeURL",
            "Timestamp",
            "Token",
            "TopicArn",
            "Type",
        ],
    ),
    (
        MessageKind::Notification,
        &[
            "Message",
            "MessageId",
            "Subject",
            "Timestamp",
            "TopicArn",
            "Type",
        ],
    ),
];

impl MessageKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SubscriptionConfirmation" => Some(MessageKind::SubscriptionConfirmation),
            "UnsubscribeConfirmation" => Some(MessageKind::UnsubscribeConfirmation),
            "Notification" => Some(MessageKind::Notification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::SubscriptionConfirmation => "SubscriptionConfirmation",
            MessageKind::UnsubscribeConfirmation => "UnsubscribeConfirmation",
            MessageKind::Notification => "Notification",
        }
    }

    pub fn signed_fields(&self) -> &'static [&'static str] {
        SIGNED_FIELDS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, fields)| *fields)
            .unwrap_or_default()
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CallbackMessage {
    /// Parses the JSON body of an SNS callback request.
    pub fn parse(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    pub fn kind(&self) -> Result<MessageKind, Error> {
        MessageKind::parse(&self.message_type)
            .ok_or_else(|| Error::UnsupportedType(self.message_type.clone()))
    }

    /// Returns a field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "Type" => Some(&self.message_type),
            "MessageId" => Some(&self.message_id),
            "TopicArn" => Some(&self.topic_arn),
            "Subject" => self.subject.as_deref(),
            "Message" => Some(&self.message),
            "Timestamp" => Some(&self.timestamp),
            "SignatureVersion" => Some(&self.signature_version),
            "Signature" => Some(&self.signature),
            "SigningCertURL" => Some(&self.signing_cert_url),
            "Token" => self.token.as_deref(),
            "SubscribeURL" => self.subscribe_url.as_deref(),
            "UnsubscribeURL" => self.unsubscribe_url.as_deref(),
            _ => None,
        }
    }

    /// Builds the string the signature was computed over.
    ///
    /// Each signed field contributes `Name\nValue\n`. Fields missing from
    /// the message contribute an empty value.
    pub fn canonical_string(&self) -> Result<String, Error> {
        let fields = self.kind()?.signed_fields();
        let mut out = String::with_capacity(self.message.len() + 256);

        for name in fields {
            out.push_str(name);
            out.push('\n');
            out.push_str(self.field(name).unwrap_or_default());
            out.push('\n');
        }

        Ok(out)
    }
}
