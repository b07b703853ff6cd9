//! Fuzz target for the participant lifecycle state machine
//!
//! Drives a Client with arbitrary sequences of caller intents, transport
//! events, and raw inbound frames.
//!
//! # Invariants
//!
//! - Handling never panics; bad frames return an error without a state
//!   change
//! - Message frames are only emitted while ready
//! - Readiness tracks the connect/disconnect notifications exactly

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use hop_client::{
    Client, ClientAction, ClientConfig, ClientEvent, Notification, TransportEvent,
};
use hop_proto::{OutboundFrame, RawFrame};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

#[derive(Debug, Arbitrary)]
enum Op {
    Connect,
    Send { to: String, text: String },
    Connected { epoch: u64 },
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u16 },
    RetriesExhausted { attempts: u32 },
    Frame { event: FrameEvent, data: String },
}

#[derive(Debug, Arbitrary)]
enum FrameEvent {
    Ready,
    Message,
    Identify,
    Other(String),
}

fn to_event(op: Op) -> ClientEvent {
    match op {
        Op::Connect => ClientEvent::Connect,
        Op::Send { to, text } => ClientEvent::Send { to, payload: Value::String(text) },
        Op::Connected { epoch } => ClientEvent::Transport(TransportEvent::Connected { epoch }),
        Op::Disconnected => ClientEvent::Transport(TransportEvent::Disconnected),
        Op::Reconnecting { attempt, delay_ms } => {
            ClientEvent::Transport(TransportEvent::Reconnecting {
                attempt,
                delay: Duration::from_millis(u64::from(delay_ms)),
            })
        },
        Op::RetriesExhausted { attempts } => {
            ClientEvent::Transport(TransportEvent::RetriesExhausted { attempts })
        },
        Op::Frame { event, data } => {
            let event = match event {
                FrameEvent::Ready => "ready".to_string(),
                FrameEvent::Message => "message".to_string(),
                FrameEvent::Identify => "identify".to_string(),
                FrameEvent::Other(name) => name,
            };
            let data = serde_json::from_str(&data).unwrap_or(Value::String(data));
            ClientEvent::Transport(TransportEvent::Frame(RawFrame::new(event, data)))
        },
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(mut client) = Client::new("alice", ClientConfig::default()) else {
        return;
    };
    let mut notified_ready = false;

    for op in ops {
        let before = client.state();
        let actions = match client.handle(to_event(op)) {
            Ok(actions) => actions,
            Err(_) => {
                assert_eq!(client.state(), before, "failed event changed state");
                continue;
            },
        };

        for action in &actions {
            match action {
                ClientAction::Notify(Notification::Connected) => notified_ready = true,
                ClientAction::Notify(Notification::Disconnected) => notified_ready = false,
                ClientAction::Send(OutboundFrame::Message(_)) => {
                    assert!(notified_ready, "message sent before ready");
                },
                _ => {},
            }
        }

        assert_eq!(client.is_ready(), notified_ready);
    }
});
