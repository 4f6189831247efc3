//! Message codes of the transport protocol.
//!
//! Codes come in pairs: the low variant is sent by the gateway, the same code
//! with bit 7 set is sent by the concentrator.

use crate::constants::CODE_DIRECTION_BIT;
use std::fmt;

/// One-byte message code. Unknown values are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageCode(pub u8);

impl MessageCode {
    pub const REGISTER: MessageCode = MessageCode(0x01);
    pub const REGISTER_UPLINK: MessageCode = MessageCode(0x81);
    pub const HEARTBEAT: MessageCode = MessageCode(0x03);
    pub const HEARTBEAT_UPLINK: MessageCode = MessageCode(0x83);
    pub const SIGNAL: MessageCode = MessageCode(0x07);
    pub const SIGNAL_UPLINK: MessageCode = MessageCode(0x87);
    pub const PASSTHROUGH: MessageCode = MessageCode(0x0A);
    pub const PASSTHROUGH_UPLINK: MessageCode = MessageCode(0x8A);

    /// The paired code in the other direction.
    pub fn reverse(self) -> Self {
        MessageCode(self.0 ^ CODE_DIRECTION_BIT)
    }

    /// Sent by the concentrator.
    pub fn is_uplink(self) -> bool {
        self.0 & CODE_DIRECTION_BIT != 0
    }

    /// Uplinks the gateway must acknowledge.
    pub fn needs_answer(self) -> bool {
        matches!(self, Self::REGISTER_UPLINK | Self::HEARTBEAT_UPLINK)
    }

    pub fn name(self) -> &'static str {
        match self.0 & !CODE_DIRECTION_BIT {
            0x01 => "register",
            0x03 => "heartbeat",
            0x07 => "signal",
            0x0A => "passthrough",
            _ => "unknown",
        }
    }
}

impl From<u8> for MessageCode {
    fn from(raw: u8) -> Self {
        MessageCode(raw)
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.0)
    }
}
