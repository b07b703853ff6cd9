//! Integration tests for the Unix socket transport.
//!
//! These tests run participants against an in-test rendezvous point
//! listening on a real socket in a temporary directory. The rendezvous point
//! answers `identify` with `ready` and routes `message` frames by recipient.

#![cfg(unix)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::BytesMut;
use hop_client::{
    ClientConfig, Envelope, Notification, Participant, RetryPolicy, TransportConfig,
    TransportEvent,
    transport::{Connector, UnixConnector},
};
use hop_proto::{DELIMITER, FrameCodec, RawFrame};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::{broadcast, mpsc},
    time::timeout,
};

type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<RawFrame>>>>;

/// Start a rendezvous point at `path`. Sending on the returned channel drops
/// every open connection.
fn start_rendezvous(path: &Path) -> broadcast::Sender<()> {
    let listener = UnixListener::bind(path).unwrap();
    let routes: Routes = Arc::default();
    let (kick, _) = broadcast::channel(4);

    let kick_tx = kick.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, routes.clone(), kick_tx.subscribe()));
        }
    });

    kick
}

async fn serve(stream: UnixStream, routes: Routes, mut kick: broadcast::Receiver<()>) {
    let codec = FrameCodec::default();
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RawFrame>();
    let mut buf = BytesMut::new();

    loop {
        tokio::select! {
            _ = kick.recv() => return,

            Some(frame) = rx.recv() => {
                let mut out = BytesMut::new();
                codec.encode(&frame, &mut out).unwrap();
                if writer.write_all(&out).await.is_err() {
                    return;
                }
            },

            read = reader.read_buf(&mut buf) => {
                if !matches!(read, Ok(n) if n > 0) {
                    return;
                }

                while let Ok(Some(frame)) = codec.decode(&mut buf) {
                    match frame.event.as_str() {
                        "identify" => {
                            let name = frame.data["from"].as_str().unwrap().to_string();
                            routes.lock().unwrap().insert(name, tx.clone());
                            let _ = tx.send(RawFrame::new("ready", Value::Null));
                        },
                        "message" => {
                            let to = frame.data["to"].as_str().unwrap().to_string();
                            let peer = routes.lock().unwrap().get(&to).cloned();
                            if let Some(peer) = peer {
                                let _ = peer.send(frame);
                            }
                        },
                        _ => {},
                    }
                }
            },
        }
    }
}

fn config(root: &Path) -> ClientConfig {
    ClientConfig::default()
        .with_socket_root(root)
        .with_retry(RetryPolicy { interval: Duration::from_millis(20), max_retries: 50 })
        .with_debug(true)
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("notification stream closed")
}

#[tokio::test]
async fn participants_exchange_messages() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let _kick = start_rendezvous(&config.endpoint_path());

    let alice = Participant::new("alice", config.clone()).unwrap();
    let bob = Participant::new("bob", config).unwrap();
    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();

    alice.connect();
    bob.connect();
    assert_eq!(next(&mut alice_events).await, Notification::Connected);
    assert_eq!(next(&mut bob_events).await, Notification::Connected);

    alice.send("bob", json!({"hello": "world!", "n": [1, 2.5, null]}));
    assert_eq!(
        next(&mut bob_events).await,
        Notification::Message(Envelope::new(
            "alice",
            "bob",
            json!({"hello": "world!", "n": [1, 2.5, null]})
        ))
    );

    bob.send("alice", json!("pong"));
    assert_eq!(
        next(&mut alice_events).await,
        Notification::Message(Envelope::new("bob", "alice", json!("pong")))
    );
}

#[tokio::test]
async fn reconnects_and_identifies_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let kick = start_rendezvous(&config.endpoint_path());

    let alice = Participant::new("alice", config).unwrap();
    let mut events = alice.subscribe();

    alice.connect();
    assert_eq!(next(&mut events).await, Notification::Connected);

    kick.send(()).unwrap();
    assert_eq!(next(&mut events).await, Notification::Disconnected);
    assert!(!alice.is_ready());

    assert_eq!(next(&mut events).await, Notification::Connected);
    assert!(alice.is_ready());
}

#[tokio::test]
async fn identify_is_first_frame_on_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let listener = UnixListener::bind(config.endpoint_path()).unwrap();

    let alice = Participant::new("alice", config).unwrap();
    alice.connect();

    let (mut stream, _) = timeout(Duration::from_secs(5), listener.accept()).await.unwrap().unwrap();
    let mut received = Vec::new();
    while !received.contains(&DELIMITER) {
        let mut chunk = [0u8; 256];
        let n = timeout(Duration::from_secs(5), stream.read(&mut chunk)).await.unwrap().unwrap();
        assert!(n > 0, "socket closed before identify");
        received.extend_from_slice(&chunk[..n]);
    }

    assert_eq!(received, b"{\"type\":\"identify\",\"data\":{\"from\":\"alice\"}}\x0c");
}

#[tokio::test]
async fn missing_endpoint_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let retry = RetryPolicy { interval: Duration::from_millis(10), max_retries: 2 };
    let mut connector = UnixConnector::default();

    let mut link = connector.open(TransportConfig {
        path: dir.path().join("hop.missing"),
        connection_id: "alice".to_string(),
        retry,
        debug: false,
    });

    let delay = retry.interval;
    assert_eq!(next(&mut link.events).await, TransportEvent::Reconnecting { attempt: 1, delay });
    assert_eq!(next(&mut link.events).await, TransportEvent::Reconnecting { attempt: 2, delay });
    assert_eq!(next(&mut link.events).await, TransportEvent::RetriesExhausted { attempts: 2 });

    let end = timeout(Duration::from_secs(5), link.events.recv()).await.unwrap();
    assert_eq!(end, None);
}
