//! # Transport CRC
//!
//! 16-bit CRC protecting every transport frame: reflected polynomial 0xA001,
//! initial value 0xFFFF, no final xor (CRC-16/MODBUS).

use crc::{Crc, CRC_16_MODBUS};

const TRANSPORT_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Computes the transport CRC over `data`.
///
/// The empty buffer yields the initial value.
///
/// ```rust
/// use ammeter_gateway::util::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x4B37);
/// assert_eq!(crc16(&[]), 0xFFFF);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    TRANSPORT_CRC.checksum(data)
}

/// CRC of `data` laid out the way it travels on the wire (low byte first).
pub fn crc16_le_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}
