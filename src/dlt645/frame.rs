//! # DL/T 645-2007 Frame
//!
//! ```text
//! FE FE FE FE | 68 | A0..A5 | 68 | C | L | DATA (L bytes) | CS | 16
//! ```
//!
//! The wake-up preamble is optional on input and always emitted on output.
//! `CS` is the byte sum from the first `0x68` through the last data byte.

use super::{Control, Data, Function, Identifier, MeterAddress, MeterError};
use crate::constants::{
    DLT645_ADDRESS_LEN, DLT645_DATA_OFFSET, DLT645_END, DLT645_PREAMBLE_BYTE, DLT645_PREAMBLE_LEN,
    DLT645_START,
};
use nom::bytes::complete::{tag, take, take_while};
use nom::number::complete::be_u8;
use nom::IResult;

const START_TAG: &[u8] = &[DLT645_START];

/// A decoded meter frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dlt645Frame {
    pub address: MeterAddress,
    pub control: Control,
    pub data: Data,
}

/// Fields as they appear on the wire, before any validation.
struct RawFrame<'a> {
    address: &'a [u8],
    control: u8,
    data: &'a [u8],
    checksum: u8,
    end: u8,
    /// First `0x68` through the last data byte.
    covered: &'a [u8],
}

fn raw_frame(input: &[u8]) -> IResult<&[u8], RawFrame<'_>> {
    let (input, _) = take_while(|b| b == DLT645_PREAMBLE_BYTE)(input)?;
    let start = input;
    let (input, _) = tag(START_TAG)(input)?;
    let (input, address) = take(DLT645_ADDRESS_LEN)(input)?;
    let (input, _) = tag(START_TAG)(input)?;
    let (input, control) = be_u8(input)?;
    let (input, len) = be_u8(input)?;
    let (input, data) = take(len)(input)?;
    let covered = &start[..start.len() - input.len()];
    let (input, checksum) = be_u8(input)?;
    let (input, end) = be_u8(input)?;
    Ok((
        input,
        RawFrame {
            address,
            control,
            data,
            checksum,
            end,
            covered,
        },
    ))
}

/// Byte-sum checksum.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

impl Dlt645Frame {
    /// Parses one frame, ignoring any bytes after the end marker.
    pub fn parse(bytes: &[u8]) -> Result<Self, MeterError> {
        let (_, raw) =
            raw_frame(bytes).map_err(|e| MeterError::InvalidFrame(format!("{e:?}")))?;

        if raw.end != DLT645_END {
            return Err(MeterError::InvalidFrame(format!(
                "end marker 0x{:02X}",
                raw.end
            )));
        }
        let calculated = checksum(raw.covered);
        if calculated != raw.checksum {
            return Err(MeterError::InvalidChecksum {
                expected: raw.checksum,
                calculated,
            });
        }

        let control = Control::from(raw.control);
        if control.error {
            let code = raw
                .data
                .first()
                .map(|b| b.wrapping_sub(DLT645_DATA_OFFSET))
                .unwrap_or(0);
            return Err(MeterError::Exception(code));
        }

        Ok(Dlt645Frame {
            address: MeterAddress::from_slice(raw.address)?,
            control,
            data: Data::decode(raw.data)?,
        })
    }

    /// Read request for a single identifier.
    pub fn read(address: MeterAddress, identifier: Identifier) -> Self {
        Dlt645Frame {
            address,
            control: Control::request(Function::Read),
            data: Data::new(identifier, Vec::new()),
        }
    }

    /// Write request. `value` is in plain form; the offset is applied on encode.
    pub fn write(address: MeterAddress, identifier: Identifier, value: Vec<u8>) -> Self {
        Dlt645Frame {
            address,
            control: Control::request(Function::Write),
            data: Data::new(identifier, value),
        }
    }

    /// Serializes with preamble, recomputed length and checksum.
    pub fn encode(&self) -> Result<Vec<u8>, MeterError> {
        let data = self.data.encode();
        let len = u8::try_from(data.len()).map_err(|_| MeterError::DataTooLong(data.len()))?;

        let mut out = Vec::with_capacity(DLT645_PREAMBLE_LEN + 12 + data.len());
        out.extend_from_slice(&[DLT645_PREAMBLE_BYTE; DLT645_PREAMBLE_LEN]);
        out.push(DLT645_START);
        out.extend_from_slice(&self.address.to_bytes());
        out.push(DLT645_START);
        out.push(self.control.byte());
        out.push(len);
        out.extend_from_slice(&data);
        out.push(checksum(&out[DLT645_PREAMBLE_LEN..]));
        out.push(DLT645_END);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt645::Reading;

    fn address() -> MeterAddress {
        "220419093277".parse().unwrap()
    }

    #[test]
    fn test_read_request_bytes() {
        let bytes = Dlt645Frame::read(address(), Identifier::FORWARD_ACTIVE_ENERGY)
            .encode()
            .unwrap();
        assert_eq!(
            bytes,
            vec![
                0xFE, 0xFE, 0xFE, 0xFE, 0x68, 0x77, 0x32, 0x09, 0x19, 0x04, 0x22, 0x68, 0x11,
                0x04, 0x33, 0x33, 0x34, 0x33, 0xA3, 0x16
            ]
        );
    }

    #[test]
    fn test_parse_response() {
        let response = Dlt645Frame {
            address: address(),
            control: Control::from(0x91),
            data: Data::new(Identifier::FORWARD_ACTIVE_ENERGY, vec![0x12, 0x34, 0x56, 0x00]),
        };
        let bytes = response.encode().unwrap();
        let parsed = Dlt645Frame::parse(&bytes).unwrap();
        assert_eq!(parsed, response);
        assert_eq!(
            parsed.data.reading().unwrap(),
            Reading::ForwardActiveEnergy(5634.12)
        );

        // Without preamble
        assert_eq!(Dlt645Frame::parse(&bytes[4..]).unwrap(), response);
    }

    #[test]
    fn test_parse_bad_checksum() {
        let mut bytes = Dlt645Frame::read(address(), Identifier::VOLTAGE)
            .encode()
            .unwrap();
        let cs = bytes.len() - 2;
        bytes[cs] = bytes[cs].wrapping_add(1);
        assert!(matches!(
            Dlt645Frame::parse(&bytes),
            Err(MeterError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_parse_bad_end_marker() {
        let mut bytes = Dlt645Frame::read(address(), Identifier::VOLTAGE)
            .encode()
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x17;
        assert!(matches!(
            Dlt645Frame::parse(&bytes),
            Err(MeterError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_parse_truncated() {
        let bytes = Dlt645Frame::read(address(), Identifier::VOLTAGE)
            .encode()
            .unwrap();
        assert!(matches!(
            Dlt645Frame::parse(&bytes[..10]),
            Err(MeterError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_parse_exception() {
        // 68 A 68 D1 01 (0x02 + 0x33) CS 16
        let mut bytes = vec![0x68, 0x77, 0x32, 0x09, 0x19, 0x04, 0x22, 0x68, 0xD1, 0x01, 0x35];
        bytes.push(checksum(&bytes));
        bytes.push(0x16);
        assert_eq!(Dlt645Frame::parse(&bytes), Err(MeterError::Exception(0x02)));
    }

    #[test]
    fn test_write_request() {
        let frame = Dlt645Frame::write(address(), Identifier(0x0400_0401), vec![0x01, 0x02]);
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes[12], 0x14);
        assert_eq!(bytes[13], 6);
        assert_eq!(&bytes[18..20], &[0x34, 0x35]);
    }

    #[test]
    fn test_encode_rejects_oversized_data() {
        let frame = Dlt645Frame::write(address(), Identifier::VOLTAGE, vec![0; 300]);
        assert_eq!(frame.encode(), Err(MeterError::DataTooLong(304)));
    }
}
