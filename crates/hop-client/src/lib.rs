//! Client
//!
//! Participant side of the hop local message bus. A participant connects to a
//! shared rendezvous socket, announces its name, and then exchanges addressed
//! JSON messages with other participants through that socket.
//!
//! # Architecture
//!
//! The core is a Sans-IO state machine. [`Client`] receives [`ClientEvent`]s
//! (caller intents and transport events), updates its lifecycle state, and
//! returns [`ClientAction`]s (open the transport, emit a frame, notify
//! subscribers) for the caller to execute. It never touches a socket or a
//! clock.
//!
//! # Components
//!
//! - [`Client`]: lifecycle state machine and envelope codec
//! - [`ClientConfig`]: namespace, rendezvous endpoint, retry policy
//! - [`ClientEvent`] / [`TransportEvent`]: inputs
//! - [`ClientAction`] / [`Notification`]: outputs
//!
//! # Transport (default feature)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::UnixConnector`]: Unix socket adapter with fixed-interval
//!   retries
//! - [`Participant`]: async handle that drives a [`Client`] over a transport

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod event;

#[cfg(feature = "transport")]
mod participant;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ConnectionState};
pub use config::{
    ClientConfig, DEFAULT_MAX_RETRIES, DEFAULT_NAMESPACE, DEFAULT_RENDEZVOUS,
    DEFAULT_RETRY_INTERVAL, DEFAULT_SOCKET_ROOT, RetryPolicy, TransportConfig,
};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, Notification, TransportEvent};
pub use hop_proto::{Envelope, PayloadEncoding};
#[cfg(feature = "transport")]
pub use participant::Participant;
