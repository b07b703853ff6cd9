//! Delimiter framing over a byte stream.
//!
//! Each frame is UTF-8 JSON followed by a single [`DELIMITER`] byte (form
//! feed). JSON serializers escape control characters inside strings, so the
//! delimiter never appears inside a well-formed frame.
//!
//! ```text
//! [JSON bytes][0x0C][JSON bytes][0x0C]...
//! ```
//!
//! The decoder is incremental: feed it whatever the socket returned and it
//! yields complete frames as they become available, regardless of how the
//! stream was chunked.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::{
    errors::{ProtocolError, Result},
    frame::RawFrame,
};

/// Frame terminator.
pub const DELIMITER: u8 = 0x0C;

/// Default upper bound for a single frame (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encoder/decoder for delimited JSON frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    /// Codec rejecting frames larger than `max_frame_size` bytes.
    pub const fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Largest accepted frame body, excluding the delimiter.
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Append one frame to `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Serialization` if `frame` cannot be serialized
    /// - `ProtocolError::FrameTooLarge` if the JSON exceeds the size limit;
    ///   `dst` is left untouched
    pub fn encode<F: Serialize>(&self, frame: &F, dst: &mut BytesMut) -> Result<()> {
        let json =
            serde_json::to_vec(frame).map_err(|e| ProtocolError::Serialization(e.to_string()))?;

        if json.len() > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: json.len(),
                max: self.max_frame_size,
            });
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(DELIMITER);

        Ok(())
    }

    /// Take the next complete frame out of `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete frame yet. Empty or
    /// whitespace-only segments between delimiters are skipped.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidJson` if a segment is not a frame object. The
    ///   segment is consumed, so the next call continues with the following
    ///   frame.
    /// - `ProtocolError::FrameTooLarge` if a segment, or undelimited input,
    ///   exceeds the size limit. Undelimited input is discarded; the tail of
    ///   that frame then surfaces as one `InvalidJson` once its delimiter
    ///   arrives.
    pub fn decode(&self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        loop {
            let Some(end) = src.iter().position(|byte| *byte == DELIMITER) else {
                if src.len() > self.max_frame_size {
                    let size = src.len();
                    src.clear();
                    return Err(ProtocolError::FrameTooLarge { size, max: self.max_frame_size });
                }
                return Ok(None);
            };

            let segment = src.split_to(end + 1);
            let body = &segment[..end];

            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if body.len() > self.max_frame_size {
                return Err(ProtocolError::FrameTooLarge {
                    size: body.len(),
                    max: self.max_frame_size,
                });
            }

            return serde_json::from_slice::<RawFrame>(body)
                .map(Some)
                .map_err(|e| ProtocolError::InvalidJson(e.to_string()));
        }
    }
}
