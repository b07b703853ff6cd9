//! Property-based tests for the participant lifecycle.
//!
//! Drives a [`Client`] with arbitrary interleavings of caller intents and
//! transport events, and checks the gating and ordering guarantees on the
//! resulting action stream.

use std::time::Duration;

use hop_client::{
    Client, ClientAction, ClientConfig, ClientEvent, Notification, TransportEvent,
};
use hop_proto::{OutboundFrame, RawFrame};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Operations a test sequence is made of.
#[derive(Debug, Clone)]
enum Op {
    Connect,
    Send(i64),
    Connected,
    Disconnected,
    Reconnecting,
    RetriesExhausted,
    Ready,
    Message(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Connect),
        4 => any::<i64>().prop_map(Op::Send),
        2 => Just(Op::Connected),
        2 => Just(Op::Disconnected),
        1 => Just(Op::Reconnecting),
        1 => Just(Op::RetriesExhausted),
        2 => Just(Op::Ready),
        1 => any::<i64>().prop_map(Op::Message),
    ]
}

fn to_event(op: &Op, epoch: &mut u64) -> ClientEvent {
    match op {
        Op::Connect => ClientEvent::Connect,
        Op::Send(x) => ClientEvent::Send { to: "bob".to_string(), payload: json!({ "x": x }) },
        Op::Connected => {
            *epoch += 1;
            ClientEvent::Transport(TransportEvent::Connected { epoch: *epoch })
        },
        Op::Disconnected => ClientEvent::Transport(TransportEvent::Disconnected),
        Op::Reconnecting => ClientEvent::Transport(TransportEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(2500),
        }),
        Op::RetriesExhausted => {
            ClientEvent::Transport(TransportEvent::RetriesExhausted { attempts: 5 })
        },
        Op::Ready => ClientEvent::Transport(TransportEvent::Frame(RawFrame::new("ready", Value::Null))),
        Op::Message(x) => ClientEvent::Transport(TransportEvent::Frame(RawFrame::new(
            "message",
            json!({ "from": "bob", "to": "alice", "payload": format!("{{\"x\":{x}}}") }),
        ))),
    }
}

proptest! {
    /// No message frame leaves the client unless a connect notification has
    /// fired since the last disconnect notification.
    #[test]
    fn sends_gated_on_connect_notification(ops in prop::collection::vec(op(), 0..64)) {
        let mut client = Client::new("alice", ClientConfig::default()).unwrap();
        let mut epoch = 0;
        let mut notified_ready = false;

        for op in &ops {
            let actions = client.handle(to_event(op, &mut epoch)).unwrap();

            for action in &actions {
                match action {
                    ClientAction::Notify(Notification::Connected) => notified_ready = true,
                    ClientAction::Notify(Notification::Disconnected) => notified_ready = false,
                    ClientAction::Send(OutboundFrame::Message(_)) => prop_assert!(notified_ready),
                    _ => {},
                }
            }

            prop_assert_eq!(client.is_ready(), notified_ready);
        }
    }

    /// Identify is emitted exactly when the transport reports a connection
    /// during an attempt sequence, and precedes every message frame.
    #[test]
    fn identify_follows_transport_connect(ops in prop::collection::vec(op(), 0..64)) {
        let mut client = Client::new("alice", ClientConfig::default()).unwrap();
        let mut epoch = 0;
        let mut attempting = false;
        let mut identified = false;

        for op in &ops {
            let actions = client.handle(to_event(op, &mut epoch)).unwrap();

            let identifies = actions
                .iter()
                .filter(|a| matches!(a, ClientAction::Send(OutboundFrame::Identify(_))))
                .count();

            match op {
                Op::Connect => attempting = true,
                Op::RetriesExhausted => attempting = false,
                Op::Connected => {
                    prop_assert_eq!(identifies, usize::from(attempting));
                },
                _ => prop_assert_eq!(identifies, 0),
            }
            if identifies > 0 {
                identified = true;
            }

            if actions.iter().any(|a| matches!(a, ClientAction::Send(OutboundFrame::Message(_)))) {
                prop_assert!(identified);
            }
        }
    }

    /// The connect notification fires once per handshake: never twice
    /// without a disconnect notification in between.
    #[test]
    fn connect_notification_once_per_handshake(ops in prop::collection::vec(op(), 0..64)) {
        let mut client = Client::new("alice", ClientConfig::default()).unwrap();
        let mut epoch = 0;
        let mut connected = false;

        for op in &ops {
            for action in client.handle(to_event(op, &mut epoch)).unwrap() {
                match action {
                    ClientAction::Notify(Notification::Connected) => {
                        prop_assert!(!connected);
                        connected = true;
                    },
                    ClientAction::Notify(Notification::Disconnected) => connected = false,
                    _ => {},
                }
            }
        }
    }

    /// A second consecutive disconnect raises nothing and readiness stays
    /// false.
    #[test]
    fn repeated_disconnect_is_silent(ops in prop::collection::vec(op(), 0..32)) {
        let mut client = Client::new("alice", ClientConfig::default()).unwrap();
        let mut epoch = 0;

        for op in &ops {
            client.handle(to_event(op, &mut epoch)).unwrap();
        }

        client.handle(ClientEvent::Transport(TransportEvent::Disconnected)).unwrap();
        prop_assert!(!client.is_ready());

        let actions = client.handle(ClientEvent::Transport(TransportEvent::Disconnected)).unwrap();
        prop_assert!(actions.is_empty());
        prop_assert!(!client.is_ready());
    }
}
