//! Stream framing for pile connections.
//!
//! Splits a TCP byte stream into [`RawFrame`]s. Bytes before a start marker
//! are discarded, and a marker followed by an implausible length is skipped,
//! so one corrupt frame never tears down the stream. Checksums are left to
//! message decoding.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::ProtoError;
use crate::frame::{checksum_kind_for, RawFrame, LEN_OVERHEAD, START_MARKER};

/// Default upper bound on a whole frame
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Tokio codec for pile frames
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Codec with a custom frame size cap
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Drop everything before the next start marker. Returns false when no
    /// marker is buffered yet.
    fn resync(src: &mut BytesMut) -> bool {
        match src.windows(2).position(|w| w == START_MARKER) {
            Some(0) => true,
            Some(pos) => {
                warn!(
                    skipped = pos,
                    garbage = %hex::encode(&src[..pos]),
                    "Discarding bytes before start marker"
                );
                src.advance(pos);
                true
            }
            None => {
                // a trailing first marker byte may be completed by the next read
                let keep = usize::from(src.last() == Some(&START_MARKER[0]));
                let drop = src.len() - keep;
                if drop > 0 {
                    warn!(skipped = drop, "Discarding bytes with no start marker");
                    src.advance(drop);
                }
                false
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if !Self::resync(src) {
                return Ok(None);
            }

            // marker, length and command
            if src.len() < START_MARKER.len() + LEN_OVERHEAD {
                return Ok(None);
            }

            let len = u16::from_le_bytes([src[2], src[3]]) as usize;
            let total_len = START_MARKER.len() + len + checksum_kind_for(src[4]).len();

            if len < LEN_OVERHEAD || total_len > self.max_frame_len {
                warn!(
                    length = len,
                    max = self.max_frame_len,
                    "Implausible frame length, skipping marker"
                );
                src.advance(1);
                continue;
            }

            if src.len() < total_len {
                src.reserve(total_len - src.len());
                return Ok(None);
            }

            let data = src.split_to(total_len);
            return RawFrame::parse(&data).map(Some);
        }
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = item.to_bytes();
        if encoded.len() > self.max_frame_len {
            return Err(ProtoError::encoding(format!(
                "frame of {} bytes exceeds {}",
                encoded.len(),
                self.max_frame_len
            )));
        }
        dst.reserve(encoded.len());
        dst.put_slice(&encoded);
        Ok(())
    }
}
