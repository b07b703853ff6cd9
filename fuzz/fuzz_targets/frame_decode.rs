//! Fuzz target for FrameCodec::decode
//!
//! Feeds arbitrary bytes to the delimiter framer in arbitrary chunk sizes,
//! with a small frame limit so the oversize paths are reached.
//!
//! # Invariants
//!
//! - Decoding never panics
//! - Every call consumes input or reports an incomplete frame, so the loop
//!   always terminates
//! - The buffer never holds more than the limit without a delimiter

#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use hop_proto::{DELIMITER, FrameCodec};
use libfuzzer_sys::fuzz_target;

const MAX_FRAME_SIZE: usize = 256;

#[derive(Debug, Arbitrary)]
struct Input {
    chunks: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let codec = FrameCodec::new(MAX_FRAME_SIZE);
    let mut buf = BytesMut::new();

    for chunk in input.chunks {
        buf.extend_from_slice(&chunk);

        loop {
            let before = buf.len();
            match codec.decode(&mut buf) {
                Ok(Some(_)) | Err(_) => assert!(buf.len() < before, "decode made no progress"),
                Ok(None) => break,
            }
        }

        if !buf.contains(&DELIMITER) {
            assert!(buf.len() <= MAX_FRAME_SIZE);
        }
    }
});
