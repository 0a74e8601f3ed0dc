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

//! Amazon SES sending events delivered through SNS notifications.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sns::{CallbackMessage, MessageKind};

pub mod events;

pub use events::*;

const EVENT_TYPES: [&str; 10] = [
    "Bounce",
    "Complaint",
    "Delivery",
    "Send",
    "Reject",
    "Open",
    "Click",
    "Rendering Failure",
    "DeliveryDelay",
    "Subscription",
];

#[derive(Debug)]
pub enum Error {
    /// The `eventType` is not one of the known SES event types.
    UnsupportedEventType(String),

    /// The notification carries no `eventType`.
    MissingEventType,

    /// The SNS message is not a `Notification`.
    NotANotification(String),

    /// The event payload could not be decoded.
    Json(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum Event {
    Bounce {
        mail: Mail,
        bounce: Bounce,
    },
    Complaint {
        mail: Mail,
        complaint: Complaint,
    },
    Delivery {
        mail: Mail,
        delivery: Delivery,
    },
    Send {
        mail: Mail,
    },
    Reject {
        mail: Mail,
        reject: Reject,
    },
    Open {
        mail: Mail,
        open: Open,
    },
    Click {
        mail: Mail,
        click: Click,
    },
    #[serde(rename = "Rendering Failure")]
    RenderingFailure {
        mail: Mail,
        failure: RenderingFailure,
    },
    DeliveryDelay {
        mail: Mail,
        #[serde(rename = "deliveryDelay", alias = "delay")]
        delivery_delay: DeliveryDelay,
    },
    Subscription {
        mail: Mail,
        subscription: Subscription,
    },
}

impl Event {
    /// Decodes the event carried by an SNS `Notification`.
    pub fn from_callback(message: &CallbackMessage) -> Result<Self, Error> {
        match message.kind() {
            Ok(MessageKind::Notification) => Event::parse(&message.message),
            _ => Err(Error::NotANotification(message.message_type.clone())),
        }
    }

    /// Decodes an SES event from its JSON representation.
    ///
    /// Identity notifications, which name the type `notificationType`, are
    /// accepted as well.
    pub fn parse(json: &str) -> Result<Self, Error> {
        let mut value = serde_json::from_str::<Value>(json)?;

        if let Some(object) = value.as_object_mut() {
            if !object.contains_key("eventType") {
                if let Some(event_type) = object.get("notificationType").cloned() {
                    object.insert("eventType".to_string(), event_type);
                }
            }
        }

        let event_type = value
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or(Error::MissingEventType)?;
        if !EVENT_TYPES.contains(&event_type) {
            return Err(Error::UnsupportedEventType(event_type.to_string()));
        }

        log::trace!("Decoding SES {} event", event_type);
        serde_json::from_value(value).map_err(Into::into)
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Bounce { .. } => "Bounce",
            Event::Complaint { .. } => "Complaint",
            Event::Delivery { .. } => "Delivery",
            Event::Send { .. } => "Send",
            Event::Reject { .. } => "Reject",
            Event::Open { .. } => "Open",
            Event::Click { .. } => "Click",
            Event::RenderingFailure { .. } => "Rendering Failure",
            Event::DeliveryDelay { .. } => "DeliveryDelay",
            Event::Subscription { .. } => "Subscription",
        }
    }

    /// The message that produced the event.
    pub fn mail(&self) -> &Mail {
        match self {
            Event::Bounce { mail, .. }
            | Event::Complaint { mail, .. }
            | Event::Delivery { mail, .. }
            | Event::Send { mail }
            | Event::Reject { mail, .. }
            | Event::Open { mail, .. }
            | Event::Click { mail, .. }
            | Event::RenderingFailure { mail, .. }
            | Event::DeliveryDelay { mail, .. }
            | Event::Subscription { mail, .. } => mail,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        crate::Error::Event(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedEventType(event_type) => {
                write!(f, "Unsupported event type: {}", event_type)
            }
            Error::MissingEventType => write!(f, "Missing event type"),
            Error::NotANotification(message_type) => {
                write!(f, "Expected a Notification, found {}", message_type)
            }
            Error::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for Error {}
