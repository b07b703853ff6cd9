//! Wire protocol for the hop participant bus.
//!
//! Participants talk to a shared rendezvous socket. Every transport event
//! crosses the socket as a JSON object `{"type": <event>, "data": <value>}`
//! terminated by a form-feed byte. Application messages ride inside `message`
//! events as addressed envelopes whose payload is itself JSON-encoded.
//!
//! ```text
//! {"type":"message","data":{"from":"alice","to":"bob","payload":"{\"x\":1}"}}\x0c
//! ```
//!
//! # Components
//!
//! - [`FrameCodec`]: delimiter framing over a byte stream
//! - [`RawFrame`], [`InboundFrame`], [`OutboundFrame`]: transport events
//! - [`Envelope`], [`WireEnvelope`]: application and wire views of a message
//!
//! This crate performs no I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod envelope;
pub mod errors;
pub mod frame;

pub use codec::{DEFAULT_MAX_FRAME_SIZE, DELIMITER, FrameCodec};
pub use envelope::{Envelope, Identify, PayloadEncoding, WireEnvelope};
pub use errors::{ProtocolError, Result};
pub use frame::{EventName, InboundFrame, OutboundFrame, RawFrame};
