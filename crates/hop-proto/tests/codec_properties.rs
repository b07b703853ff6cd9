//! Property-based tests for delimiter framing.
//!
//! The socket may split or coalesce writes arbitrarily. These tests feed
//! encoded frames to the decoder in random chunk sizes and check that the
//! same frames come out, in order.

use bytes::BytesMut;
use hop_proto::{FrameCodec, Identify, OutboundFrame, RawFrame, WireEnvelope};
use proptest::prelude::*;
use serde_json::Value;

fn outbound_frame() -> impl Strategy<Value = OutboundFrame> {
    let name = "[a-z]{1,8}";
    prop_oneof![
        name.prop_map(|from| OutboundFrame::Identify(Identify::new(from))),
        (name, name, ".{0,64}").prop_map(|(from, to, text)| {
            OutboundFrame::Message(WireEnvelope {
                from,
                to,
                payload: Value::String(serde_json::to_string(&text).unwrap()),
            })
        }),
    ]
}

proptest! {
    #[test]
    fn decode_is_independent_of_chunking(
        frames in prop::collection::vec(outbound_frame(), 1..16),
        chunk_sizes in prop::collection::vec(1usize..32, 1..64),
    ) {
        let codec = FrameCodec::default();

        let mut wire = BytesMut::new();
        for frame in &frames {
            codec.encode(frame, &mut wire).unwrap();
        }
        let wire = wire.freeze();

        let mut buf = BytesMut::new();
        let mut decoded: Vec<RawFrame> = Vec::new();
        let mut offset = 0;
        let mut sizes = chunk_sizes.iter().cycle();

        while offset < wire.len() {
            let size = (*sizes.next().unwrap()).min(wire.len() - offset);
            buf.extend_from_slice(&wire[offset..offset + size]);
            offset += size;

            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame);
            }
        }

        let expected: Vec<RawFrame> = frames.iter().map(|f| f.to_raw().unwrap()).collect();
        prop_assert_eq!(decoded, expected);
        prop_assert!(buf.is_empty());
    }
}
