//! Demo participant for the hop bus.
//!
//! Joins the bus, greets a peer once the handshake completes, and logs every
//! message it receives. With `--reply` it echoes payloads back to their
//! sender.
//!
//! # Usage
//!
//! ```bash
//! # Greet yourself through the default rendezvous at /tmp/hop.ipc
//! hop-echo --name alice
//!
//! # Greet bob, and echo anything bob sends
//! hop-echo --name alice --to bob --reply
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use hop_client::{
    ClientConfig, DEFAULT_MAX_RETRIES, DEFAULT_NAMESPACE, DEFAULT_SOCKET_ROOT, Envelope,
    Notification, Participant, PayloadEncoding, RetryPolicy,
};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// hop bus demo participant
#[derive(Parser, Debug)]
#[command(name = "hop-echo")]
#[command(about = "Join the hop bus, greet a peer, and log or echo messages")]
#[command(version)]
struct Args {
    /// Participant name, unique on the bus
    #[arg(short, long)]
    name: String,

    /// Participant to greet (defaults to own name)
    #[arg(short, long)]
    to: Option<String>,

    /// Echo received payloads back to their sender
    #[arg(long)]
    reply: bool,

    /// Log per-frame transport activity
    #[arg(long)]
    debug: bool,

    /// Namespace prefix of the rendezvous socket
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Directory holding the rendezvous socket
    #[arg(long, default_value = DEFAULT_SOCKET_ROOT)]
    socket_root: PathBuf,

    /// Delay between connection attempts, in milliseconds
    #[arg(long, default_value = "2500")]
    retry_interval_ms: u64,

    /// Connection attempts after a failure before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Carry payloads as nested JSON instead of JSON strings
    #[arg(long)]
    nested_payload: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let encoding =
            if self.nested_payload { PayloadEncoding::Nested } else { PayloadEncoding::Stringified };

        ClientConfig::default()
            .with_namespace(self.namespace.clone())
            .with_socket_root(self.socket_root.clone())
            .with_retry(RetryPolicy {
                interval: Duration::from_millis(self.retry_interval_ms),
                max_retries: self.max_retries,
            })
            .with_debug(self.debug)
            .with_payload_encoding(encoding)
    }

    fn greeting_target(&self) -> &str {
        self.to.as_deref().unwrap_or(&self.name)
    }
}

/// Message to send in response to `notification`, if any.
fn respond(notification: &Notification, args: &Args) -> Option<(String, Value)> {
    match notification {
        Notification::Connected => {
            Some((args.greeting_target().to_string(), json!({ "hello": "world!" })))
        },
        Notification::Message(Envelope { from, payload, .. }) if args.reply && *from != args.name => {
            Some((from.clone(), payload.clone()))
        },
        Notification::Message(_) | Notification::Disconnected => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.client_config();
    tracing::info!(participant = %args.name, endpoint = %config.endpoint_path().display(), "hop-echo starting");

    let participant = Participant::new(args.name.clone(), config)?;
    let mut notifications = participant.subscribe();
    participant.connect();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("interrupted, shutting down");
                break;
            },

            notification = notifications.recv() => {
                let Some(notification) = notification else {
                    break;
                };

                match &notification {
                    Notification::Connected => tracing::info!("connected"),
                    Notification::Disconnected => tracing::info!("disconnected"),
                    Notification::Message(envelope) => {
                        tracing::info!(from = %envelope.from, to = %envelope.to, payload = %envelope.payload, "message");
                    },
                }

                if let Some((to, payload)) = respond(&notification, &args) {
                    participant.send(to, payload);
                }
            },
        }
    }

    Ok(())
}
