//! Addressed envelopes and the payload codec.
//!
//! The application sees an [`Envelope`] whose payload is a structured JSON
//! value. On the wire the same message is a [`WireEnvelope`] whose payload is,
//! by default, that value serialized to a JSON string. Encoding happens once
//! on send and decoding once on receive, so callers never observe the string
//! form.
//!
//! # Invariants
//!
//! - `from` and `to` pass through both directions untouched.
//! - `decode(encode(v)) == v` for every JSON value `v` under either
//!   [`PayloadEncoding`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Body of the `identify` frame a participant sends after its socket
/// connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identify {
    /// Participant announcing itself
    pub from: String,
}

impl Identify {
    /// Identify frame body for `from`.
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

/// How the payload is carried inside a [`WireEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// Payload is a JSON-encoded string nested in the envelope.
    ///
    /// This is the legacy format every existing participant speaks. The
    /// envelope is therefore JSON-encoded twice on its way to the socket.
    #[default]
    Stringified,

    /// Payload is carried as a nested JSON value, encoded once with the
    /// outer frame.
    ///
    /// Not understood by legacy participants. Every participant on a bus
    /// must agree on this setting.
    Nested,
}

/// Application view of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender participant
    pub from: String,
    /// Recipient participant
    pub to: String,
    /// Structured payload, opaque to the bus
    pub payload: Value,
}

impl Envelope {
    /// Create an envelope.
    pub fn new(from: impl Into<String>, to: impl Into<String>, payload: Value) -> Self {
        Self { from: from.into(), to: to.into(), payload }
    }

    /// Convert to the wire representation.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Serialization` if the payload cannot be serialized
    pub fn encode(self, encoding: PayloadEncoding) -> Result<WireEnvelope> {
        let payload = match encoding {
            PayloadEncoding::Stringified => Value::String(
                serde_json::to_string(&self.payload)
                    .map_err(|e| ProtocolError::Serialization(e.to_string()))?,
            ),
            PayloadEncoding::Nested => self.payload,
        };

        Ok(WireEnvelope { from: self.from, to: self.to, payload })
    }
}

/// Wire view of a message, as carried in the `data` of a `message` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Sender participant
    pub from: String,
    /// Recipient participant
    pub to: String,
    /// Encoded payload (a JSON string under [`PayloadEncoding::Stringified`])
    pub payload: Value,
}

impl WireEnvelope {
    /// Convert back to the application representation.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadNotString` if the stringified encoding is
    ///   expected but the payload is some other JSON kind
    /// - `ProtocolError::MalformedPayload` if the payload string is not JSON
    pub fn decode(self, encoding: PayloadEncoding) -> Result<Envelope> {
        let payload = match encoding {
            PayloadEncoding::Nested => self.payload,
            PayloadEncoding::Stringified => match self.payload {
                Value::String(text) => serde_json::from_str(&text).map_err(|e| {
                    ProtocolError::MalformedPayload {
                        from: self.from.clone(),
                        to: self.to.clone(),
                        reason: e.to_string(),
                    }
                })?,
                other => {
                    return Err(ProtocolError::PayloadNotString {
                        from: self.from,
                        found: json_kind(&other),
                    });
                },
            },
        };

        Ok(Envelope { from: self.from, to: self.to, payload })
    }
}

/// Human-readable JSON kind, for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
