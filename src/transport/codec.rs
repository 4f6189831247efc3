//! Stream framing for the transport protocol.

use super::Frame;
use crate::constants::{FRAME_HEADER_SIZE, FRAME_OVERHEAD, FRAME_START};
use crate::error::GatewayError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Tokio codec splitting a byte stream into transport frames.
///
/// A malformed frame yields an error after the offending bytes have been
/// discarded, so the caller may keep decoding from the same buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    verify_checksum: bool,
}

impl FrameCodec {
    /// Create a new codec that verifies checksums.
    pub fn new() -> Self {
        Self {
            verify_checksum: true,
        }
    }

    /// Create a codec with checksum verification switched on or off.
    pub fn with_checksum(verify_checksum: bool) -> Self {
        Self { verify_checksum }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = GatewayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        if src[0] != FRAME_START {
            let found = src[0];
            let skip = src
                .iter()
                .position(|&b| b == FRAME_START)
                .unwrap_or(src.len());
            src.advance(skip);
            return Err(GatewayError::InvalidStartMarker(found));
        }

        let length = usize::from(u16::from_le_bytes([src[1], src[2]]));
        if length < FRAME_OVERHEAD {
            src.advance(1);
            return Err(GatewayError::InvalidFrameLength(length));
        }

        // Wait for complete frame
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let raw = src.split_to(length);
        Frame::parse(&raw, self.verify_checksum).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = GatewayError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst)
    }
}
