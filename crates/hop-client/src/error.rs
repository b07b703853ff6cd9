//! Client error types.

use hop_proto::ProtocolError;
use thiserror::Error;

/// Errors returned by [`Client`](crate::Client).
///
/// Connection failures are not errors at this layer: they surface as a
/// `Disconnected` notification or the absence of a `Connected` one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Participant name cannot be used as an identity
    #[error("invalid participant identity: {reason}")]
    InvalidIdentity {
        /// Why the name was rejected
        reason: &'static str,
    },

    /// Inbound frame or outbound payload could not be coded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Returns true if the error concerns a single frame and later frames
    /// can still be processed.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
