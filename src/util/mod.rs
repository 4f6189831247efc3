//! # Utility Modules
//!
//! Byte-level primitives shared by the transport and meter layers: the
//! transport CRC and the packed BCD conversions.

pub mod bcd;
pub mod crc;

pub use self::crc::{crc16, crc16_le_bytes};
