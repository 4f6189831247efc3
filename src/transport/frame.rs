//! # Transport Frame
//!
//! Outer envelope exchanged with the concentrator:
//!
//! ```text
//! 0x64 | LEN (2, LE) | RESERVED | SEQ (4) | CODE | PAYLOAD | CRC (2, LE) | 0x20
//! ```
//!
//! `LEN` counts the whole frame, so it is always the payload length plus 12.
//! The CRC covers the start marker through the last payload byte.

use super::MessageCode;
use crate::constants::{
    COMMAND_DEFAULT_RESERVED, FRAME_END, FRAME_MAX_PAYLOAD, FRAME_OVERHEAD, FRAME_START,
};
use crate::error::{GatewayError, Result};
use crate::util::{crc16, crc16_le_bytes};
use bytes::{BufMut, Bytes, BytesMut};
use nom::bytes::complete::{tag, take};
use nom::error::ErrorKind;
use nom::number::complete::{be_u8, le_u16};
use nom::{Err as NomErr, IResult};
use std::fmt;

const START_TAG: &[u8] = &[FRAME_START];

/// Four-byte sequence number pairing a command with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sequence(pub [u8; 4]);

impl Sequence {
    pub fn random() -> Self {
        Sequence(rand::random())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

struct RawFrame<'a> {
    length: usize,
    reserved: u8,
    sequence: Sequence,
    code: u8,
    payload: &'a [u8],
    checksum: u16,
    end: u8,
}

fn raw_frame(raw: &[u8]) -> IResult<&[u8], RawFrame<'_>> {
    let (input, _) = tag(START_TAG)(raw)?;
    let (input, length) = le_u16(input)?;
    let length = usize::from(length);
    if length < FRAME_OVERHEAD || length != raw.len() {
        return Err(NomErr::Failure(nom::error::Error::new(
            input,
            ErrorKind::LengthValue,
        )));
    }
    let (input, reserved) = be_u8(input)?;
    let (input, sequence) = take(4usize)(input)?;
    let (input, code) = be_u8(input)?;
    let (input, payload) = take(length - FRAME_OVERHEAD)(input)?;
    let (input, checksum) = le_u16(input)?;
    let (input, end) = be_u8(input)?;
    Ok((
        input,
        RawFrame {
            length,
            reserved,
            sequence: Sequence([sequence[0], sequence[1], sequence[2], sequence[3]]),
            code,
            payload,
            checksum,
            end,
        },
    ))
}

/// A transport frame. The length and checksum are derived on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub reserved: u8,
    pub sequence: Sequence,
    pub code: MessageCode,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(reserved: u8, sequence: Sequence, code: MessageCode, payload: Bytes) -> Self {
        Frame {
            reserved,
            sequence,
            code,
            payload,
        }
    }

    /// Gateway-issued frame with a fresh random sequence number.
    pub fn command(code: MessageCode, payload: impl Into<Bytes>) -> Self {
        Frame::new(
            COMMAND_DEFAULT_RESERVED,
            Sequence::random(),
            code,
            payload.into(),
        )
    }

    /// Acknowledgement for register and heartbeat uplinks.
    pub fn answer(&self) -> Option<Frame> {
        if !self.code.needs_answer() {
            return None;
        }
        Some(Frame::new(
            self.reserved ^ 0x01,
            self.sequence,
            self.code.reverse(),
            Bytes::new(),
        ))
    }

    /// Total encoded size, as carried in the length field.
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    /// Parses exactly one frame occupying all of `raw`.
    pub fn parse(raw: &[u8], verify_checksum: bool) -> Result<Frame> {
        let (_, fields) = raw_frame(raw)?;

        if fields.end != FRAME_END {
            return Err(GatewayError::InvalidEndMarker(fields.end));
        }
        if verify_checksum {
            let calculated = crc16(&raw[..fields.length - 3]);
            if calculated != fields.checksum {
                return Err(GatewayError::InvalidChecksum {
                    expected: fields.checksum,
                    calculated,
                });
            }
        }

        Ok(Frame {
            reserved: fields.reserved,
            sequence: fields.sequence,
            code: MessageCode(fields.code),
            payload: Bytes::copy_from_slice(fields.payload),
        })
    }

    /// Appends the encoded frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        if self.payload.len() > FRAME_MAX_PAYLOAD {
            return Err(GatewayError::InvalidFrameLength(self.encoded_len()));
        }
        let start = dst.len();
        dst.reserve(self.encoded_len());
        dst.put_u8(FRAME_START);
        dst.put_u16_le(self.encoded_len() as u16);
        dst.put_u8(self.reserved);
        dst.put_slice(&self.sequence.0);
        dst.put_u8(self.code.0);
        dst.put_slice(&self.payload);
        let checksum = crc16_le_bytes(&dst[start..]);
        dst.put_slice(&checksum);
        dst.put_u8(FRAME_END);
        Ok(())
    }

    /// Encoded bytes of this frame.
    pub fn build(&self) -> Result<BytesMut> {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seq={} reserved=0x{:02X} payload={}B",
            self.code,
            self.sequence,
            self.reserved,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_answer_bytes() {
        let uplink = Frame::new(
            0x01,
            Sequence([1, 2, 3, 4]),
            MessageCode::HEARTBEAT_UPLINK,
            Bytes::from_static(&[0x01, 0x00, 0x1F]),
        );
        let answer = uplink.answer().unwrap();
        assert_eq!(answer.reserved, 0x00);
        assert_eq!(answer.sequence, uplink.sequence);
        assert_eq!(answer.code, MessageCode::HEARTBEAT);
        assert!(answer.payload.is_empty());
        assert_eq!(
            answer.build().unwrap().as_ref(),
            &[0x64, 0x0C, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x03, 0x1E, 0xDE, 0x20]
        );
    }

    #[test]
    fn test_no_answer_for_passthrough() {
        let frame = Frame::command(MessageCode::PASSTHROUGH_UPLINK, vec![0x00]);
        assert!(frame.answer().is_none());
    }

    #[test]
    fn test_command_defaults() {
        let frame = Frame::command(MessageCode::SIGNAL, Bytes::new());
        assert_eq!(frame.reserved, COMMAND_DEFAULT_RESERVED);
        assert_eq!(frame.encoded_len(), FRAME_OVERHEAD);
    }

    #[test]
    fn test_parse_built_frame() {
        let frame = Frame::new(
            0x01,
            Sequence([0xAA, 0xBB, 0xCC, 0xDD]),
            MessageCode(0x55),
            Bytes::from_static(b"payload"),
        );
        let raw = frame.build().unwrap();
        assert_eq!(raw.len(), 19);
        assert_eq!(Frame::parse(&raw, true).unwrap(), frame);
    }

    #[test]
    fn test_parse_rejects_bad_crc_unless_disabled() {
        let frame = Frame::command(MessageCode::PASSTHROUGH_UPLINK, vec![1, 2, 3]);
        let mut raw = frame.build().unwrap();
        let crc_at = raw.len() - 3;
        raw[crc_at] ^= 0xFF;
        assert!(matches!(
            Frame::parse(&raw, true),
            Err(GatewayError::InvalidChecksum { .. })
        ));
        assert_eq!(Frame::parse(&raw, false).unwrap(), frame);
    }

    #[test]
    fn test_parse_rejects_bad_end_marker() {
        let mut raw = Frame::command(MessageCode::SIGNAL_UPLINK, vec![0x10])
            .build()
            .unwrap();
        let last = raw.len() - 1;
        raw[last] = 0x21;
        assert!(matches!(
            Frame::parse(&raw, true),
            Err(GatewayError::InvalidEndMarker(0x21))
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let frame = Frame::command(MessageCode::PASSTHROUGH, vec![0u8; FRAME_MAX_PAYLOAD + 1]);
        assert!(frame.build().is_err());
    }
}
