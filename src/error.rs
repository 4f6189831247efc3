//! # Gateway Error Handling
//!
//! This module defines the `GatewayError` enum, which represents the different error
//! types that can occur in the ammeter-gateway crate. Errors raised while decoding
//! the embedded DL/T 645 frames live in [`crate::dlt645::MeterError`] and are
//! wrapped here when they cross into the transport layer.

use crate::dlt645::MeterError;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Represents the different error types that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The frame does not start with the transport start marker.
    #[error("Invalid start marker: 0x{0:02X}")]
    InvalidStartMarker(u8),

    /// The frame does not end with the transport end marker.
    #[error("Invalid end marker: 0x{0:02X}")]
    InvalidEndMarker(u8),

    /// The declared frame length cannot hold the fixed frame fields.
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(usize),

    /// Indicates a CRC mismatch on a transport frame.
    #[error("Invalid checksum: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    InvalidChecksum { expected: u16, calculated: u16 },

    /// Indicates a nom parsing error.
    #[error("Nom error: {0}")]
    NomError(String),

    /// The montage does not carry enough fields for the message.
    #[error("Insufficient data length")]
    InvalidDataLength,

    /// The montage content cannot be interpreted.
    #[error("Invalid data")]
    InvalidData,

    /// An embedded DL/T 645 frame could not be decoded.
    #[error("Meter protocol error: {0}")]
    Meter(#[from] MeterError),

    /// The connection writer is gone; the frame was not sent.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The telemetry sink rejected a message.
    #[error("Telemetry sink error: {0}")]
    Sink(String),

    /// Telemetry serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying socket error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Whether the error describes a malformed frame that can be skipped
    /// without tearing down the connection.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidStartMarker(_)
                | GatewayError::InvalidEndMarker(_)
                | GatewayError::InvalidFrameLength(_)
                | GatewayError::InvalidChecksum { .. }
                | GatewayError::NomError(_)
        )
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for GatewayError {
    fn from(err: nom::Err<E>) -> Self {
        GatewayError::NomError(format!("{err:?}"))
    }
}
