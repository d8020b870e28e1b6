//! Outbound message schema.
//!
//! Every frame a client receives is an [`Envelope`]:
//! `{ "id", "type", "payload", "timestamp", "error"? }`.
//! The payload schema is fixed per message type; [`CustomPayload`] carries
//! free-form fields for types this crate does not define.

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::normalizer::{EventType, NormalizedEvent};
use crate::risk::RiskScore;
use crate::time::now_millis;

pub const EVENT: &str = "event";
pub const RISK_ALERT: &str = "risk_alert";
pub const CONNECTED: &str = "connected";
pub const SUBSCRIBED: &str = "subscribed";
pub const PONG: &str = "pong";
pub const ERROR: &str = "error";

/// Alert for an event whose risk score crossed the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAlert {
    pub event_id: String,
    pub signature: String,
    pub event_type: EventType,
    pub risk: RiskScore,
}

/// Greeting sent right after a client registers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub client_id: String,
    pub tags: Vec<String>,
}

/// A client's tag set after a subscribe or unsubscribe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscribed {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pong {
    pub timestamp: u64,
}

/// Payload for application-defined message types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomPayload {
    #[serde(skip)]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Body of an outbound message; the variant determines the message type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Event(Box<NormalizedEvent>),
    RiskAlert(RiskAlert),
    Connected(Connected),
    Subscribed(Subscribed),
    Pong(Pong),
    Custom(CustomPayload),
}

impl Payload {
    pub fn event(event: NormalizedEvent) -> Self {
        Payload::Event(Box::new(event))
    }

    pub fn custom(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Payload::Custom(CustomPayload {
            kind: kind.into(),
            fields,
        })
    }

    /// The envelope `type` for this payload.
    pub fn message_type(&self) -> &str {
        match self {
            Payload::Event(_) => EVENT,
            Payload::RiskAlert(_) => RISK_ALERT,
            Payload::Connected(_) => CONNECTED,
            Payload::Subscribed(_) => SUBSCRIBED,
            Payload::Pong(_) => PONG,
            Payload::Custom(c) => &c.kind,
        }
    }
}

/// Wire envelope around a payload.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    /// Broadcast id for queued deliveries, a fresh id for direct sends.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<&'a Payload>,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> Envelope<'a> {
    pub fn new(id: Uuid, payload: &'a Payload) -> Self {
        Self {
            id,
            message_type: payload.message_type(),
            payload: Some(payload),
            timestamp: now_millis(),
            error: None,
        }
    }

    pub fn error(message: &'a str) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type: ERROR,
            payload: None,
            timestamp: now_millis(),
            error: Some(message),
        }
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
