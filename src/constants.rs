//! Gateway Protocol Constants
//!
//! This module defines the wire constants of the concentrator transport protocol
//! and of the embedded DL/T 645-2007 meter protocol, plus the default timings of
//! the polling scheduler.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Transport frame
// ----------------------------------------------------------------------------

/// Transport frame start marker
pub const FRAME_START: u8 = 0x64;

/// Transport frame end marker
pub const FRAME_END: u8 = 0x20;

/// Bytes peeked before the total length is known (start marker + length)
pub const FRAME_HEADER_SIZE: usize = 3;

/// Fixed bytes around the payload: start, length(2), reserved, sequence(4), code, crc(2), end
pub const FRAME_OVERHEAD: usize = 12;

/// Largest payload the 16-bit length field can describe
pub const FRAME_MAX_PAYLOAD: usize = u16::MAX as usize - FRAME_OVERHEAD;

/// Reserved byte stamped on commands issued by the gateway
pub const COMMAND_DEFAULT_RESERVED: u8 = 0x01;

/// Bit separating uplink message codes from downlink ones
pub const CODE_DIRECTION_BIT: u8 = 0x80;

/// Size of one montage length prefix
pub const MONTAGE_PREFIX_SIZE: usize = 2;

// ----------------------------------------------------------------------------
// DL/T 645-2007
// ----------------------------------------------------------------------------

/// Wake-up byte repeated before each meter frame
pub const DLT645_PREAMBLE_BYTE: u8 = 0xFE;

/// Number of wake-up bytes emitted before each meter frame
pub const DLT645_PREAMBLE_LEN: usize = 4;

/// Meter frame start character (appears twice)
pub const DLT645_START: u8 = 0x68;

/// Meter frame end character
pub const DLT645_END: u8 = 0x16;

/// Additive offset applied to every data byte on the wire
pub const DLT645_DATA_OFFSET: u8 = 0x33;

/// Length of a meter address in bytes
pub const DLT645_ADDRESS_LEN: usize = 6;

/// Length of a data identifier in bytes
pub const DLT645_IDENTIFIER_LEN: usize = 4;

// Control byte masks
pub const DLT645_CONTROL_DIRECTION: u8 = 0x80;
pub const DLT645_CONTROL_ERROR: u8 = 0x40;
pub const DLT645_CONTROL_CONTINUATION: u8 = 0x20;
pub const DLT645_CONTROL_FUNCTION: u8 = 0x1F;

// ----------------------------------------------------------------------------
// Scheduling defaults
// ----------------------------------------------------------------------------

/// Delay between registration and the first polling cycle
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(5);

/// Period of the polling cycle
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Time a synchronous passthrough command waits for its response
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Default telemetry topic
pub const DEFAULT_TELEMETRY_TOPIC: &str = "ammeter";
