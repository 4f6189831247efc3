//! # Meter Protocol Errors
//!
//! Failures raised by the DL/T 645-2007 layer. They reach the transport layer
//! wrapped in [`crate::error::GatewayError::Meter`].

use super::Identifier;
use thiserror::Error;

/// Errors raised while decoding or encoding DL/T 645-2007 frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    /// The frame structure is broken (markers, truncated fields).
    #[error("Invalid meter frame: {0}")]
    InvalidFrame(String),

    /// The byte-sum checksum does not match the frame body.
    #[error("Invalid meter checksum: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    InvalidChecksum { expected: u8, calculated: u8 },

    /// The data field is too short to hold an identifier.
    #[error("Data field too short: {0} bytes")]
    DataTooShort(usize),

    /// No value decoder exists for the identifier.
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(Identifier),

    /// The value length does not match the identifier layout.
    #[error("Invalid value length for {identifier}: expected {expected}, got {actual}")]
    InvalidValueLength {
        identifier: Identifier,
        expected: usize,
        actual: usize,
    },

    /// A value byte holds a nibble that is not a decimal digit.
    #[error("Invalid BCD value for {0}")]
    InvalidBcd(Identifier),

    /// The meter answered with the error flag set.
    #[error("Meter exception response: 0x{0:02X}")]
    Exception(u8),

    /// The address string is not 12 hex digits.
    #[error("Invalid meter address: {0}")]
    InvalidAddress(String),

    /// The data field does not fit the one-byte length field.
    #[error("Data field too long: {0} bytes")]
    DataTooLong(usize),
}
