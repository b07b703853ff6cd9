//! Transport adapters for the client.
//!
//! A [`Connector`] turns a [`TransportConfig`] into a [`TransportLink`]: a
//! pair of channels plus the task behind them. The task owns the socket,
//! reconnects on its own, and reports everything as [`TransportEvent`]s.
//! Protocol logic stays in the Sans-IO [`Client`](crate::Client).
//!
//! [`UnixConnector`] is the production adapter. Tests plug in their own
//! connector to drive a [`Participant`](crate::Participant) without sockets.

use hop_proto::OutboundFrame;
use thiserror::Error;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::{config::TransportConfig, event::TransportEvent};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Frame queued for the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Connection the frame was produced for. The transport drops frames
    /// whose epoch is not the live connection's.
    pub epoch: u64,
    /// Frame to write.
    pub frame: OutboundFrame,
}

/// Handle to a running transport.
///
/// Frames go out through `outbound`; connection changes and inbound frames
/// come back through `events`. Dropping the link's `outbound` sender ends the
/// transport task.
#[derive(Debug)]
pub struct TransportLink {
    /// Send frames to the rendezvous point.
    pub outbound: mpsc::UnboundedSender<Outbound>,
    /// Receive transport events.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
    /// Abort handle to stop the transport task.
    abort_handle: Option<AbortHandle>,
}

impl TransportLink {
    /// Link backed by plain channels, with no task behind it.
    pub fn new(
        outbound: mpsc::UnboundedSender<Outbound>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self { outbound, events, abort_handle: None }
    }

    /// Link whose task is stopped by [`TransportLink::stop`].
    pub fn with_task(
        outbound: mpsc::UnboundedSender<Outbound>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        abort_handle: AbortHandle,
    ) -> Self {
        Self { outbound, events, abort_handle: Some(abort_handle) }
    }

    /// Stop the transport.
    pub fn stop(&self) {
        if let Some(handle) = &self.abort_handle {
            handle.abort();
        }
    }
}

/// Opens transports.
pub trait Connector: Send + 'static {
    /// Start a transport for `config`.
    ///
    /// Must be called within a Tokio runtime if the connector spawns tasks.
    fn open(&mut self, config: TransportConfig) -> TransportLink;
}

#[cfg(unix)]
pub use unix::UnixConnector;

#[cfg(unix)]
mod unix {
    use bytes::BytesMut;
    use hop_proto::FrameCodec;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::UnixStream,
        sync::mpsc,
    };

    use super::{Connector, Outbound, TransportError, TransportLink};
    use crate::{config::TransportConfig, event::TransportEvent};

    /// Initial read buffer capacity.
    const READ_BUFFER_CAPACITY: usize = 8 * 1024;

    /// Connects to the rendezvous point over a Unix domain socket.
    ///
    /// Each opened transport retries at a fixed interval. The retry budget is
    /// restored by every successful connection, and the transport stops after
    /// reporting [`TransportEvent::RetriesExhausted`].
    #[derive(Debug, Clone, Default)]
    pub struct UnixConnector {
        codec: FrameCodec,
    }

    impl UnixConnector {
        /// Connector using `codec` for framing.
        pub fn new(codec: FrameCodec) -> Self {
            Self { codec }
        }
    }

    impl Connector for UnixConnector {
        fn open(&mut self, config: TransportConfig) -> TransportLink {
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (events_tx, events_rx) = mpsc::unbounded_channel();

            let handle = tokio::spawn(run_transport(config, self.codec, outbound_rx, events_tx));

            TransportLink::with_task(outbound_tx, events_rx, handle.abort_handle())
        }
    }

    /// Why a connection ended.
    enum Closed {
        /// Socket closed or failed.
        ByPeer,
        /// The participant dropped the link.
        ByParticipant,
    }

    /// Connect, serve, and reconnect until the retry budget runs out.
    async fn run_transport(
        config: TransportConfig,
        codec: FrameCodec,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let mut epoch = 0u64;
        let mut retries = 0u32;

        loop {
            match connect(&config).await {
                Ok(stream) => {
                    epoch += 1;
                    retries = 0;

                    tracing::debug!(id = %config.connection_id, epoch, "socket connected");
                    if events.send(TransportEvent::Connected { epoch }).is_err() {
                        return;
                    }

                    match run_connection(stream, epoch, &codec, &config, &mut outbound, &events).await
                    {
                        Closed::ByParticipant => return,
                        Closed::ByPeer => {},
                    }

                    tracing::debug!(id = %config.connection_id, epoch, "socket closed");
                    if events.send(TransportEvent::Disconnected).is_err() {
                        return;
                    }
                },
                Err(e) => {
                    tracing::debug!(id = %config.connection_id, error = %e, "connect attempt failed");
                },
            }

            if retries >= config.retry.max_retries {
                let _ = events.send(TransportEvent::RetriesExhausted { attempts: retries });
                return;
            }

            retries += 1;
            let delay = config.retry.interval;
            if events.send(TransportEvent::Reconnecting { attempt: retries, delay }).is_err() {
                return;
            }

            tokio::time::sleep(delay).await;
        }
    }

    async fn connect(config: &TransportConfig) -> Result<UnixStream, TransportError> {
        UnixStream::connect(&config.path).await.map_err(|e| {
            TransportError::Connection(format!("{}: {e}", config.path.display()))
        })
    }

    /// Bridge one socket connection and the link channels.
    async fn run_connection(
        stream: UnixStream,
        epoch: u64,
        codec: &FrameCodec,
        config: &TransportConfig,
        outbound: &mut mpsc::UnboundedReceiver<Outbound>,
        events: &mpsc::UnboundedSender<TransportEvent>,
    ) -> Closed {
        let (mut reader, mut writer) = stream.into_split();
        let mut buf = BytesMut::with_capacity(READ_BUFFER_CAPACITY);

        loop {
            tokio::select! {
                read = reader.read_buf(&mut buf) => {
                    match read {
                        Ok(0) => return Closed::ByPeer,
                        Ok(_) => {},
                        Err(e) => {
                            let e = TransportError::Stream(format!("read failed: {e}"));
                            tracing::debug!(id = %config.connection_id, error = %e, "socket error");
                            return Closed::ByPeer;
                        },
                    }

                    loop {
                        match codec.decode(&mut buf) {
                            Ok(Some(raw)) => {
                                if config.debug {
                                    tracing::debug!(id = %config.connection_id, event = %raw.event, "frame received");
                                }
                                if events.send(TransportEvent::Frame(raw)).is_err() {
                                    return Closed::ByParticipant;
                                }
                            },
                            Ok(None) => break,
                            Err(e) => {
                                let e = TransportError::Protocol(e.to_string());
                                tracing::warn!(id = %config.connection_id, error = %e, "dropping inbound frame");
                            },
                        }
                    }
                },

                next = outbound.recv() => {
                    let Some(Outbound { epoch: frame_epoch, frame }) = next else {
                        return Closed::ByParticipant;
                    };

                    if frame_epoch != epoch {
                        tracing::debug!(id = %config.connection_id, frame_epoch, epoch, "dropping stale frame");
                        continue;
                    }

                    let mut out = BytesMut::new();
                    if let Err(e) = codec.encode(&frame, &mut out) {
                        tracing::warn!(id = %config.connection_id, error = %e, "dropping outbound frame");
                        continue;
                    }

                    if config.debug {
                        tracing::debug!(id = %config.connection_id, event = %frame.event(), bytes = out.len(), "frame sent");
                    }

                    if let Err(e) = writer.write_all(&out).await {
                        let e = TransportError::Stream(format!("write failed: {e}"));
                        tracing::debug!(id = %config.connection_id, error = %e, "socket error");
                        return Closed::ByPeer;
                    }
                },
            }
        }
    }
}
