//! Fuzz target for inbound frame and envelope decoding
//!
//! Interprets arbitrary JSON text as a transport frame, then decodes any
//! message envelope under both payload encodings.
//!
//! # Invariants
//!
//! - Decoding never panics; malformed input returns an error
//! - A decoded envelope keeps the sender and recipient of its wire form

#![no_main]

use hop_proto::{InboundFrame, PayloadEncoding, RawFrame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<RawFrame>(data) else {
        return;
    };

    let Ok(InboundFrame::Message(wire)) = InboundFrame::try_from(raw) else {
        return;
    };

    for encoding in [PayloadEncoding::Stringified, PayloadEncoding::Nested] {
        if let Ok(envelope) = wire.clone().decode(encoding) {
            assert_eq!(envelope.from, wire.from);
            assert_eq!(envelope.to, wire.to);
        }
    }
});
