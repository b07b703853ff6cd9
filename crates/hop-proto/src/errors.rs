//! Protocol error types.
//!
//! Errors carry owned strings rather than the underlying `serde_json::Error`
//! so they stay `Clone + Eq` and can be compared in tests.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing, decoding or encoding protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame exceeds the configured size limit
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Observed size in bytes
        size: usize,
        /// Configured maximum in bytes
        max: usize,
    },

    /// Delimited segment is not a `{"type", "data"}` JSON object
    #[error("invalid frame JSON: {0}")]
    InvalidJson(String),

    /// `message` frame data is not an addressed envelope
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope payload string is not valid JSON
    #[error("malformed payload from '{from}' to '{to}': {reason}")]
    MalformedPayload {
        /// Sender as stated in the envelope
        from: String,
        /// Recipient as stated in the envelope
        to: String,
        /// Parser error
        reason: String,
    },

    /// Stringified encoding expected a JSON string payload
    #[error("payload from '{from}' is {found}, expected a JSON-encoded string")]
    PayloadNotString {
        /// Sender as stated in the envelope
        from: String,
        /// JSON kind actually received
        found: &'static str,
    },

    /// Serializing a frame or payload failed
    #[error("serialization failed: {0}")]
    Serialization(String),
}
