//! Participant lifecycle state machine.
//!
//! Governs when a participant may send, runs the identify handshake, and
//! translates between wire frames and application envelopes. Uses the action
//! pattern: [`Client::handle`] takes an event and returns actions for the
//! driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//!                  connect()             transport connected
//! ┌──────────────┐ ──────────> ┌────────────┐ ─────────────────> ┌─────────────┐
//! │ Disconnected │             │ Connecting │   (send identify)  │ Identifying │
//! └──────────────┘ <────────── └────────────┘                    └─────────────┘
//!        ↑  │     retries exhausted    ↑                                │
//!        │  │                          │ reconnecting                   │ ready
//!        │  └──────────────────────────┘                                ↓
//!        │              transport disconnected                    ┌─────────┐
//!        └─────────────────────────────────────────────────────── │  Ready  │
//!                                                                 └─────────┘
//! ```
//!
//! Inbound messages are decoded in every state and never change it.

use hop_proto::{Envelope, Identify, InboundFrame, OutboundFrame, RawFrame};
use serde_json::Value;

use crate::{
    config::ClientConfig,
    error::ClientError,
    event::{ClientAction, ClientEvent, Notification, TransportEvent},
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket. Initial state, and the state after a connection is lost
    Disconnected,
    /// Waiting for the transport to connect
    Connecting,
    /// Identify sent, waiting for `ready`
    Identifying,
    /// Handshake complete, sends take effect
    Ready,
}

impl ConnectionState {
    /// Whether outbound sends take effect in this state.
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Participant state machine
///
/// Owns one participant identity and one logical connection. The identity
/// is fixed at construction and doubles as the transport connection id.
#[derive(Debug, Clone)]
pub struct Client {
    /// Participant name
    name: String,
    /// Configuration
    config: ClientConfig,
    /// Current state
    state: ConnectionState,
    /// A connection attempt sequence is live (between `Connect` and
    /// `RetriesExhausted`)
    attempting: bool,
    /// Epoch of the live socket connection
    epoch: Option<u64>,
}

impl Client {
    /// Create a client in [`ConnectionState::Disconnected`].
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidIdentity` if `name` is empty or contains
    ///   control characters
    pub fn new(name: impl Into<String>, config: ClientConfig) -> Result<Self, ClientError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ClientError::InvalidIdentity { reason: "name is empty" });
        }
        if name.chars().any(char::is_control) {
            return Err(ClientError::InvalidIdentity {
                reason: "name contains control characters",
            });
        }

        Ok(Self { name, config, state: ConnectionState::Disconnected, attempting: false, epoch: None })
    }

    /// Participant name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Readiness flag: true between `ready` and the next disconnect.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Epoch of the live socket connection. `None` while disconnected.
    #[must_use]
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// - `ClientError::Protocol` if an inbound frame or its payload cannot be
    ///   decoded. The state is unchanged and later events are unaffected.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => Ok(self.handle_connect()),
            ClientEvent::Send { to, payload } => self.handle_send(to, payload),
            ClientEvent::Transport(event) => self.handle_transport(event),
        }
    }

    /// Shorthand for `handle(ClientEvent::Connect)`.
    pub fn connect(&mut self) -> Vec<ClientAction> {
        self.handle_connect()
    }

    /// Shorthand for `handle(ClientEvent::Send { .. })`.
    ///
    /// Returns no actions unless the client is ready.
    pub fn send(
        &mut self,
        to: impl Into<String>,
        payload: Value,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.handle_send(to.into(), payload)
    }

    fn handle_connect(&mut self) -> Vec<ClientAction> {
        if self.attempting {
            tracing::debug!(participant = %self.name, state = ?self.state, "connect already in progress");
            return vec![];
        }

        self.attempting = true;
        self.state = ConnectionState::Connecting;

        let transport = self.config.transport_config(&self.name);
        tracing::info!(participant = %self.name, path = %transport.path.display(), "connecting");

        vec![ClientAction::OpenTransport(transport)]
    }

    fn handle_send(&mut self, to: String, payload: Value) -> Result<Vec<ClientAction>, ClientError> {
        if !self.is_ready() {
            tracing::debug!(participant = %self.name, to = %to, state = ?self.state, "not ready, dropping message");
            return Ok(vec![]);
        }

        let wire = Envelope::new(self.name.clone(), to, payload).encode(self.config.payload_encoding)?;

        Ok(vec![ClientAction::Send(OutboundFrame::Message(wire))])
    }

    fn handle_transport(&mut self, event: TransportEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            TransportEvent::Connected { epoch } => Ok(self.on_connected(epoch)),
            TransportEvent::Disconnected => Ok(self.on_disconnected()),
            TransportEvent::Reconnecting { attempt, delay } => {
                tracing::debug!(participant = %self.name, attempt, ?delay, "reconnecting");
                if self.attempting && self.state == ConnectionState::Disconnected {
                    self.state = ConnectionState::Connecting;
                }
                Ok(vec![])
            },
            TransportEvent::RetriesExhausted { attempts } => Ok(self.on_retries_exhausted(attempts)),
            TransportEvent::Frame(raw) => self.on_frame(raw),
        }
    }

    fn on_connected(&mut self, epoch: u64) -> Vec<ClientAction> {
        if !self.attempting {
            tracing::warn!(participant = %self.name, epoch, "transport connected without a connect request");
            return vec![];
        }

        let mut actions = Vec::with_capacity(2);

        match self.state {
            ConnectionState::Connecting | ConnectionState::Disconnected => {},
            ConnectionState::Identifying => {
                tracing::warn!(participant = %self.name, epoch, "new connection during handshake, re-identifying");
            },
            ConnectionState::Ready => {
                tracing::warn!(participant = %self.name, epoch, "new connection without disconnect, re-identifying");
                actions.push(ClientAction::Notify(Notification::Disconnected));
            },
        }

        self.state = ConnectionState::Identifying;
        self.epoch = Some(epoch);

        tracing::debug!(participant = %self.name, epoch, "socket connected, identifying");
        actions.push(ClientAction::Send(OutboundFrame::Identify(Identify::new(self.name.clone()))));

        actions
    }

    fn on_disconnected(&mut self) -> Vec<ClientAction> {
        match self.state {
            ConnectionState::Identifying | ConnectionState::Ready => {
                tracing::info!(participant = %self.name, state = ?self.state, "disconnected");
                self.state = ConnectionState::Disconnected;
                self.epoch = None;
                vec![ClientAction::Notify(Notification::Disconnected)]
            },
            ConnectionState::Connecting | ConnectionState::Disconnected => {
                tracing::debug!(participant = %self.name, state = ?self.state, "disconnect while not connected");
                vec![]
            },
        }
    }

    fn on_retries_exhausted(&mut self, attempts: u32) -> Vec<ClientAction> {
        tracing::warn!(participant = %self.name, attempts, "giving up on rendezvous");

        let actions = match self.state {
            ConnectionState::Identifying | ConnectionState::Ready => {
                vec![ClientAction::Notify(Notification::Disconnected)]
            },
            ConnectionState::Connecting | ConnectionState::Disconnected => vec![],
        };

        self.attempting = false;
        self.state = ConnectionState::Disconnected;
        self.epoch = None;

        actions
    }

    fn on_frame(&mut self, raw: RawFrame) -> Result<Vec<ClientAction>, ClientError> {
        match InboundFrame::try_from(raw)? {
            InboundFrame::Ready => Ok(self.on_ready()),
            InboundFrame::Message(wire) => {
                let envelope = wire.decode(self.config.payload_encoding)?;
                Ok(vec![ClientAction::Notify(Notification::Message(envelope))])
            },
            InboundFrame::Other { event } => {
                tracing::debug!(participant = %self.name, event = %event, "ignoring frame");
                Ok(vec![])
            },
        }
    }

    fn on_ready(&mut self) -> Vec<ClientAction> {
        if self.state != ConnectionState::Identifying {
            tracing::warn!(participant = %self.name, state = ?self.state, "unexpected ready, ignoring");
            return vec![];
        }

        // Readiness flips before subscribers hear about it, so a send issued
        // from a connect handler is not dropped.
        self.state = ConnectionState::Ready;
        tracing::info!(participant = %self.name, "ready");

        vec![ClientAction::Notify(Notification::Connected)]
    }
}
