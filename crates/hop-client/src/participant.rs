//! Async participant handle.
//!
//! A [`Participant`] owns nothing but channels. One spawned worker task holds
//! the [`Client`] and the transport link; every caller intent and every
//! transport event funnels through that task, so state transitions never
//! race and notifications leave in the order they were produced.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::{
    client::{Client, ConnectionState},
    config::ClientConfig,
    error::ClientError,
    event::{ClientAction, ClientEvent, Notification, TransportEvent},
    transport::{Connector, Outbound, TransportLink},
};

/// Requests from handles to the worker.
#[derive(Debug)]
enum Command {
    Connect,
    Send { to: String, payload: Value },
    Subscribe(mpsc::UnboundedSender<Notification>),
}

/// Handle to a bus participant.
///
/// Cheap to clone; all clones drive the same participant. When the last
/// handle is dropped the worker stops and the transport is torn down.
///
/// ```no_run
/// # async fn demo() -> Result<(), hop_client::ClientError> {
/// use hop_client::{ClientConfig, Notification, Participant};
///
/// let alice = Participant::new("alice", ClientConfig::default())?;
/// let mut notifications = alice.subscribe();
/// alice.connect();
///
/// while let Some(notification) = notifications.recv().await {
///     if notification == Notification::Connected {
///         alice.send("bob", serde_json::json!({"hello": "world!"}));
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Participant {
    name: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl Participant {
    /// Participant connecting over the Unix rendezvous socket.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidIdentity` if `name` is not a usable identity
    #[cfg(unix)]
    pub fn new(name: impl Into<String>, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_connector(name, config, crate::transport::UnixConnector::default())
    }

    /// Participant using `connector` to open its transport.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidIdentity` if `name` is not a usable identity
    pub fn with_connector<C: Connector>(
        name: impl Into<String>,
        config: ClientConfig,
        connector: C,
    ) -> Result<Self, ClientError> {
        let client = Client::new(name, config)?;
        let name: Arc<str> = Arc::from(client.name());

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(client.state());

        let worker = Worker {
            client,
            connector,
            link: None,
            commands: commands_rx,
            state: state_tx,
            subscribers: Vec::new(),
        };
        tokio::spawn(worker.run());

        Ok(Self { name, commands: commands_tx, state: state_rx })
    }

    /// Participant name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the connection lifecycle. Repeated calls while connecting or
    /// connected have no effect.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Send `payload` to `to`.
    ///
    /// Fire-and-forget: dropped without error unless the participant is
    /// ready when the worker processes it.
    pub fn send(&self, to: impl Into<String>, payload: Value) {
        self.command(Command::Send { to: to.into(), payload });
    }

    /// Receive every notification produced from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.command(Command::Subscribe(tx));
        rx
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether sends currently take effect.
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Watch connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!(participant = %self.name, "participant worker has stopped");
        }
    }
}

/// Event-processing task. Exclusively owns the client and its link.
struct Worker<C> {
    client: Client,
    connector: C,
    link: Option<TransportLink>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    subscribers: Vec<mpsc::UnboundedSender<Notification>>,
}

impl<C: Connector> Worker<C> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },

                event = next_transport_event(&mut self.link) => match event {
                    Some(event) => self.process(ClientEvent::Transport(event)),
                    None => {
                        tracing::debug!(participant = %self.client.name(), "transport ended");
                        self.link = None;
                    },
                },
            }
        }

        if let Some(link) = self.link.take() {
            link.stop();
        }
        tracing::debug!(participant = %self.client.name(), "participant stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.process(ClientEvent::Connect),
            Command::Send { to, payload } => self.process(ClientEvent::Send { to, payload }),
            Command::Subscribe(tx) => self.subscribers.push(tx),
        }
    }

    fn process(&mut self, event: ClientEvent) {
        let actions = match self.client.handle(event) {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!(participant = %self.client.name(), error = %e, "discarding inbound frame");
                return;
            },
        };

        // Publish state before notifying, so handlers observe the new state.
        let state = self.client.state();
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });

        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: ClientAction) {
        match action {
            ClientAction::OpenTransport(config) => {
                if let Some(old) = self.link.take() {
                    old.stop();
                }
                self.link = Some(self.connector.open(config));
            },
            ClientAction::Send(frame) => {
                let (Some(link), Some(epoch)) = (&self.link, self.client.epoch()) else {
                    tracing::debug!(participant = %self.client.name(), event = %frame.event(), "no live connection, dropping frame");
                    return;
                };
                if link.outbound.send(Outbound { epoch, frame }).is_err() {
                    tracing::debug!(participant = %self.client.name(), "transport closed, dropping frame");
                }
            },
            ClientAction::Notify(notification) => {
                self.subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
            },
        }
    }
}

/// Next event from the link, or pending forever when there is none.
async fn next_transport_event(link: &mut Option<TransportLink>) -> Option<TransportEvent> {
    match link {
        Some(link) => link.events.recv().await,
        None => std::future::pending().await,
    }
}
