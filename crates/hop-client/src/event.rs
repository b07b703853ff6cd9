//! Client events and actions.

use std::time::Duration;

use hop_proto::{Envelope, OutboundFrame, RawFrame};
use serde_json::Value;

use crate::config::TransportConfig;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Forwarding application intents (connect, send)
/// - Forwarding everything the transport reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Application wants to join the bus.
    Connect,

    /// Application wants to send a message.
    Send {
        /// Recipient participant.
        to: String,
        /// Structured payload.
        payload: Value,
    },

    /// Something happened on the transport.
    Transport(TransportEvent),
}

/// Events reported by a transport connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Socket connected to the rendezvous point.
    Connected {
        /// Connection counter, incremented on every successful connect.
        /// Frames are only written to the connection they were produced
        /// for.
        epoch: u64,
    },

    /// Socket closed or failed.
    Disconnected,

    /// A retry is scheduled after a failed attempt or a lost connection.
    Reconnecting {
        /// Retry number since the last successful connection, from 1.
        attempt: u32,
        /// Delay before the retry.
        delay: Duration,
    },

    /// Retry budget exhausted. The transport has stopped.
    RetriesExhausted {
        /// Retries made before giving up.
        attempts: u32,
    },

    /// Frame received from the rendezvous point.
    Frame(RawFrame),
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a transport to the rendezvous point.
    OpenTransport(TransportConfig),

    /// Emit a frame on the live connection.
    Send(OutboundFrame),

    /// Deliver a notification to subscribers.
    Notify(Notification),
}

/// Notifications published to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Handshake completed; sends now take effect.
    Connected,

    /// Connection lost; sends are dropped until the next `Connected`.
    Disconnected,

    /// Message received, payload decoded.
    Message(Envelope),
}
