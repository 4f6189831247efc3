//! Control byte (`C`) of a DL/T 645-2007 frame.
//!
//! ```text
//!  D7         D6        D5            D4..D0
//!  direction  response  continuation  function
//! ```

use crate::constants::{
    DLT645_CONTROL_CONTINUATION, DLT645_CONTROL_DIRECTION, DLT645_CONTROL_ERROR,
    DLT645_CONTROL_FUNCTION,
};
use std::fmt;

/// Function code carried in the low five bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Reserved,
    Timing,
    Read,
    ReadContinuation,
    ReadAddress,
    Write,
    WriteAddress,
    Freeze,
    RateChange,
    PasswordChange,
    ClearMaxDemand,
    ClearMeter,
    ClearEvent,
    /// Any code not assigned by the 2007 edition.
    Other(u8),
}

impl Function {
    pub fn code(self) -> u8 {
        match self {
            Function::Reserved => 0x00,
            Function::Timing => 0x08,
            Function::Read => 0x11,
            Function::ReadContinuation => 0x12,
            Function::ReadAddress => 0x13,
            Function::Write => 0x14,
            Function::WriteAddress => 0x15,
            Function::Freeze => 0x16,
            Function::RateChange => 0x17,
            Function::PasswordChange => 0x18,
            Function::ClearMaxDemand => 0x19,
            Function::ClearMeter => 0x1A,
            Function::ClearEvent => 0x1B,
            Function::Other(code) => code & DLT645_CONTROL_FUNCTION,
        }
    }
}

impl From<u8> for Function {
    fn from(raw: u8) -> Self {
        match raw & DLT645_CONTROL_FUNCTION {
            0x00 => Function::Reserved,
            0x08 => Function::Timing,
            0x11 => Function::Read,
            0x12 => Function::ReadContinuation,
            0x13 => Function::ReadAddress,
            0x14 => Function::Write,
            0x15 => Function::WriteAddress,
            0x16 => Function::Freeze,
            0x17 => Function::RateChange,
            0x18 => Function::PasswordChange,
            0x19 => Function::ClearMaxDemand,
            0x1A => Function::ClearMeter,
            0x1B => Function::ClearEvent,
            other => Function::Other(other),
        }
    }
}

/// Transfer direction (D7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Command frame issued by the master station.
    Master,
    /// Response frame issued by the meter.
    Slave,
}

/// Decoded control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Control {
    pub function: Function,
    /// More frames follow (D5).
    pub continuation: bool,
    /// The meter reports an abnormal response (D6).
    pub error: bool,
    pub direction: Direction,
}

impl Control {
    /// Control byte of a master request for `function`.
    pub fn request(function: Function) -> Self {
        Control {
            function,
            continuation: false,
            error: false,
            direction: Direction::Master,
        }
    }

    pub fn byte(self) -> u8 {
        let mut raw = self.function.code();
        if self.continuation {
            raw |= DLT645_CONTROL_CONTINUATION;
        }
        if self.error {
            raw |= DLT645_CONTROL_ERROR;
        }
        if self.direction == Direction::Slave {
            raw |= DLT645_CONTROL_DIRECTION;
        }
        raw
    }

    pub fn is_response(self) -> bool {
        self.direction == Direction::Slave
    }
}

impl From<u8> for Control {
    fn from(raw: u8) -> Self {
        Control {
            function: Function::from(raw),
            continuation: raw & DLT645_CONTROL_CONTINUATION != 0,
            error: raw & DLT645_CONTROL_ERROR != 0,
            direction: if raw & DLT645_CONTROL_DIRECTION != 0 {
                Direction::Slave
            } else {
                Direction::Master
            },
        }
    }
}

impl From<Control> for u8 {
    fn from(control: Control) -> u8 {
        control.byte()
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.byte())
    }
}
