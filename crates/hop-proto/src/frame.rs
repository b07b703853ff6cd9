//! Transport frames.
//!
//! A frame is one named transport event with attached data, serialized as
//! `{"type": <event>, "data": <value>}`. [`RawFrame`] is the untyped form the
//! codec produces. [`InboundFrame`] and [`OutboundFrame`] are the typed views
//! a participant receives and emits.
//!
//! The participant emits `identify` and `message`; the rendezvous point emits
//! `ready` and `message`. Frames with any other event name are preserved as
//! [`InboundFrame::Other`] so a broker can add events without breaking older
//! participants.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use serde_json::Value;

use crate::{
    envelope::{Identify, WireEnvelope},
    errors::{ProtocolError, Result},
};

/// Transport event names with protocol meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Participant announces its identity
    Identify,
    /// Addressed application message
    Message,
    /// Rendezvous point accepted the identify
    Ready,
}

impl EventName {
    /// Name as it appears in the `type` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Message => "message",
            Self::Ready => "ready",
        }
    }

    /// Parse a `type` field. `None` for names without protocol meaning.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "identify" => Some(Self::Identify),
            "message" => Some(Self::Message),
            "ready" => Some(Self::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped transport frame as decoded from the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Event name (`type` on the wire)
    #[serde(rename = "type")]
    pub event: String,

    /// Event data, `null` when the sender omitted it
    #[serde(default)]
    pub data: Value,
}

impl RawFrame {
    /// Create a raw frame.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Protocol meaning of the event name, if any.
    pub fn event_name(&self) -> Option<EventName> {
        EventName::parse(&self.event)
    }
}

/// Frames a participant emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Identity announcement, once per socket connection
    Identify(Identify),
    /// Addressed application message
    Message(WireEnvelope),
}

impl OutboundFrame {
    /// Event name this frame is emitted under.
    pub fn event(&self) -> EventName {
        match self {
            Self::Identify(_) => EventName::Identify,
            Self::Message(_) => EventName::Message,
        }
    }

    /// Untyped form, as a peer would decode it.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Serialization` if the data cannot be represented as
    ///   a JSON value
    pub fn to_raw(&self) -> Result<RawFrame> {
        let data = match self {
            Self::Identify(identify) => serde_json::to_value(identify),
            Self::Message(envelope) => serde_json::to_value(envelope),
        }
        .map_err(|e| ProtocolError::Serialization(e.to_string()))?;

        Ok(RawFrame::new(self.event().as_str(), data))
    }
}

impl Serialize for OutboundFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut frame = serializer.serialize_struct("Frame", 2)?;
        frame.serialize_field("type", self.event().as_str())?;
        match self {
            Self::Identify(identify) => frame.serialize_field("data", identify)?,
            Self::Message(envelope) => frame.serialize_field("data", envelope)?,
        }
        frame.end()
    }
}

/// Frames a participant receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Handshake completed, sending is now allowed
    Ready,
    /// Addressed application message, payload still encoded
    Message(WireEnvelope),
    /// Event without protocol meaning for a participant
    Other {
        /// Event name as received
        event: String,
    },
}

impl TryFrom<RawFrame> for InboundFrame {
    type Error = ProtocolError;

    /// Interpret a raw frame.
    ///
    /// `message` data is accepted either as an envelope object or as a JSON
    /// string holding that object; brokers differ in which they forward.
    fn try_from(raw: RawFrame) -> Result<Self> {
        match raw.event_name() {
            Some(EventName::Ready) => Ok(Self::Ready),
            Some(EventName::Message) => parse_envelope(raw.data).map(Self::Message),
            Some(EventName::Identify) | None => Ok(Self::Other { event: raw.event }),
        }
    }
}

fn parse_envelope(data: Value) -> Result<WireEnvelope> {
    let data = match data {
        Value::String(text) => serde_json::from_str::<Value>(&text)
            .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?,
        other => other,
    };

    serde_json::from_value(data).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
}
