//! Participant configuration.
//!
//! Configuration is an explicit value owned by each client and handed to the
//! transport as a [`TransportConfig`]. Nothing here is global, so several
//! participants in one process can use different namespaces or retry
//! settings.

use std::{path::PathBuf, time::Duration};

use hop_proto::PayloadEncoding;

/// Namespace prefix shared by every participant of the bus.
pub const DEFAULT_NAMESPACE: &str = "hop.";

/// Name of the rendezvous endpoint inside the namespace.
pub const DEFAULT_RENDEZVOUS: &str = "ipc";

/// Directory holding the rendezvous socket.
pub const DEFAULT_SOCKET_ROOT: &str = "/tmp/";

/// Fixed delay between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2500);

/// Connection attempts allowed after a failure before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fixed-interval, bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each retry
    pub interval: Duration,
    /// Retries allowed after a failed attempt or a lost connection. The
    /// budget is restored whenever a connection succeeds.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { interval: DEFAULT_RETRY_INTERVAL, max_retries: DEFAULT_MAX_RETRIES }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Namespace prefix, prepended to the rendezvous name
    pub namespace: String,
    /// Rendezvous endpoint name
    pub rendezvous: String,
    /// Directory containing the rendezvous socket
    pub socket_root: PathBuf,
    /// Reconnection policy
    pub retry: RetryPolicy,
    /// Log per-frame transport activity
    pub debug: bool,
    /// Payload format on the wire
    pub payload_encoding: PayloadEncoding,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            rendezvous: DEFAULT_RENDEZVOUS.to_string(),
            socket_root: PathBuf::from(DEFAULT_SOCKET_ROOT),
            retry: RetryPolicy::default(),
            debug: false,
            payload_encoding: PayloadEncoding::default(),
        }
    }
}

impl ClientConfig {
    /// Set the namespace prefix.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the rendezvous endpoint name.
    #[must_use]
    pub fn with_rendezvous(mut self, rendezvous: impl Into<String>) -> Self {
        self.rendezvous = rendezvous.into();
        self
    }

    /// Set the socket directory.
    #[must_use]
    pub fn with_socket_root(mut self, socket_root: impl Into<PathBuf>) -> Self {
        self.socket_root = socket_root.into();
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable per-frame transport logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the payload wire format.
    #[must_use]
    pub fn with_payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Path of the rendezvous socket: socket root + namespace + rendezvous.
    pub fn endpoint_path(&self) -> PathBuf {
        self.socket_root.join(format!("{}{}", self.namespace, self.rendezvous))
    }

    /// Transport settings for a connection identified as `connection_id`.
    pub fn transport_config(&self, connection_id: &str) -> TransportConfig {
        TransportConfig {
            path: self.endpoint_path(),
            connection_id: connection_id.to_string(),
            retry: self.retry,
            debug: self.debug,
        }
    }
}

/// Settings a transport connector receives when asked to open a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Rendezvous socket path
    pub path: PathBuf,
    /// Connection identifier, the participant name
    pub connection_id: String,
    /// Reconnection policy
    pub retry: RetryPolicy,
    /// Log per-frame activity
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_path() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint_path(), PathBuf::from("/tmp/hop.ipc"));
    }

    #[test]
    fn endpoint_path_follows_overrides() {
        let config = ClientConfig::default()
            .with_namespace("test.")
            .with_rendezvous("bus")
            .with_socket_root("/run/user/1000");

        assert_eq!(config.endpoint_path(), PathBuf::from("/run/user/1000/test.bus"));
    }

    #[test]
    fn transport_config_carries_identity_and_policy() {
        let retry = RetryPolicy { interval: Duration::from_millis(10), max_retries: 2 };
        let config = ClientConfig::default().with_retry(retry).with_debug(true);

        let transport = config.transport_config("alice");
        assert_eq!(transport.connection_id, "alice");
        assert_eq!(transport.retry, retry);
        assert!(transport.debug);
        assert_eq!(transport.path, config.endpoint_path());
    }

    #[test]
    fn default_retry_policy() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.interval, Duration::from_millis(2500));
        assert_eq!(retry.max_retries, 5);
    }
}
