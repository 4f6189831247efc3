//! Data field: a four-byte identifier (DI3..DI0, sent little-endian) followed
//! by the value bytes. Every byte travels with `0x33` added.

use super::MeterError;
use crate::constants::{DLT645_DATA_OFFSET, DLT645_IDENTIFIER_LEN};
use crate::util::bcd;
use std::fmt;

/// Data identifier selecting the meaning and scale of a value.
///
/// DI3 selects the class (`00` energy, `01` max demand, `02` instantaneous
/// variables, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(pub u32);

impl Identifier {
    /// Current combined active energy total, 4 bytes, 0.01 kWh, signed.
    pub const COMBINED_ACTIVE_ENERGY: Identifier = Identifier(0x0000_0000);
    /// Current forward active energy total, 4 bytes, 0.01 kWh.
    pub const FORWARD_ACTIVE_ENERGY: Identifier = Identifier(0x0001_0000);
    /// Current forward active max demand and its timestamp. No decoder yet.
    pub const FORWARD_MAX_DEMAND: Identifier = Identifier(0x0101_0000);
    /// Phase A/B/C voltage block, 3 x 2 bytes, 0.1 V.
    pub const VOLTAGE: Identifier = Identifier(0x0201_FF00);
    /// Phase A/B/C current block, 3 x 3 bytes, 0.001 A.
    pub const CURRENT: Identifier = Identifier(0x0202_FF00);
    /// Instantaneous active power block (total, A, B, C), 4 x 3 bytes, 0.0001 kW.
    pub const ACTIVE_POWER: Identifier = Identifier(0x0203_FF00);

    pub fn to_le_bytes(self) -> [u8; DLT645_IDENTIFIER_LEN] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(raw: [u8; DLT645_IDENTIFIER_LEN]) -> Self {
        Identifier(u32::from_le_bytes(raw))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Physical unit of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    KilowattHour,
    Volt,
    Ampere,
    Kilowatt,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::KilowattHour => "kWh",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Kilowatt => "kW",
        };
        f.write_str(symbol)
    }
}

/// A value decoded according to its identifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    CombinedActiveEnergy(f64),
    ForwardActiveEnergy(f64),
    /// Phases A, B, C.
    Voltage([f64; 3]),
    /// Phases A, B, C.
    Current([f64; 3]),
    /// Total, then phases A, B, C.
    ActivePower([f64; 4]),
}

impl Reading {
    pub fn identifier(&self) -> Identifier {
        match self {
            Reading::CombinedActiveEnergy(_) => Identifier::COMBINED_ACTIVE_ENERGY,
            Reading::ForwardActiveEnergy(_) => Identifier::FORWARD_ACTIVE_ENERGY,
            Reading::Voltage(_) => Identifier::VOLTAGE,
            Reading::Current(_) => Identifier::CURRENT,
            Reading::ActivePower(_) => Identifier::ACTIVE_POWER,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Reading::CombinedActiveEnergy(_) | Reading::ForwardActiveEnergy(_) => {
                Unit::KilowattHour
            }
            Reading::Voltage(_) => Unit::Volt,
            Reading::Current(_) => Unit::Ampere,
            Reading::ActivePower(_) => Unit::Kilowatt,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::CombinedActiveEnergy(v) | Reading::ForwardActiveEnergy(v) => {
                write!(f, "{v}{}", self.unit())
            }
            Reading::Voltage(v) | Reading::Current(v) => write!(f, "{v:?}{}", self.unit()),
            Reading::ActivePower(v) => write!(f, "{v:?}{}", self.unit()),
        }
    }
}

/// Identifier and value with the wire offset removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub identifier: Identifier,
    pub value: Vec<u8>,
}

impl Data {
    pub fn new(identifier: Identifier, value: Vec<u8>) -> Self {
        Data { identifier, value }
    }

    /// Removes the wire offset and splits identifier from value.
    pub fn decode(wire: &[u8]) -> Result<Self, MeterError> {
        if wire.len() < DLT645_IDENTIFIER_LEN {
            return Err(MeterError::DataTooShort(wire.len()));
        }
        let plain: Vec<u8> = wire.iter().map(|b| b.wrapping_sub(DLT645_DATA_OFFSET)).collect();
        let (di, value) = plain.split_at(DLT645_IDENTIFIER_LEN);
        Ok(Data {
            identifier: Identifier::from_le_bytes([di[0], di[1], di[2], di[3]]),
            value: value.to_vec(),
        })
    }

    /// Identifier and value with the wire offset applied.
    pub fn encode(&self) -> Vec<u8> {
        self.identifier
            .to_le_bytes()
            .iter()
            .chain(self.value.iter())
            .map(|b| b.wrapping_add(DLT645_DATA_OFFSET))
            .collect()
    }

    /// Interprets the value according to the identifier.
    pub fn reading(&self) -> Result<Reading, MeterError> {
        let di = self.identifier;
        match di {
            Identifier::COMBINED_ACTIVE_ENERGY => {
                expect_len(di, &self.value, 4)?;
                let mut raw = self.value.clone();
                let negative = raw[3] & 0x80 != 0;
                raw[3] &= 0x7F;
                let magnitude = scaled(di, &raw, 100.0)?;
                Ok(Reading::CombinedActiveEnergy(if negative {
                    -magnitude
                } else {
                    magnitude
                }))
            }
            Identifier::FORWARD_ACTIVE_ENERGY => {
                expect_len(di, &self.value, 4)?;
                Ok(Reading::ForwardActiveEnergy(scaled(di, &self.value, 100.0)?))
            }
            Identifier::VOLTAGE => Ok(Reading::Voltage(block(di, &self.value, 2, 10.0)?)),
            Identifier::CURRENT => Ok(Reading::Current(block(di, &self.value, 3, 1000.0)?)),
            Identifier::ACTIVE_POWER => {
                Ok(Reading::ActivePower(block(di, &self.value, 3, 10000.0)?))
            }
            other => Err(MeterError::UnknownIdentifier(other)),
        }
    }
}

fn expect_len(di: Identifier, value: &[u8], expected: usize) -> Result<(), MeterError> {
    if value.len() != expected {
        return Err(MeterError::InvalidValueLength {
            identifier: di,
            expected,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Little-endian BCD value divided by `factor`.
fn scaled(di: Identifier, wire_order: &[u8], factor: f64) -> Result<f64, MeterError> {
    if !bcd::is_valid(wire_order) {
        return Err(MeterError::InvalidBcd(di));
    }
    let mut reading_order = wire_order.to_vec();
    reading_order.reverse();
    Ok(bcd::to_u64(&reading_order) as f64 / factor)
}

/// `N` fixed-width sub-values, each scaled like a single value.
fn block<const N: usize>(
    di: Identifier,
    value: &[u8],
    width: usize,
    factor: f64,
) -> Result<[f64; N], MeterError> {
    expect_len(di, value, N * width)?;
    let mut out = [0.0; N];
    for (slot, chunk) in out.iter_mut().zip(value.chunks_exact(width)) {
        *slot = scaled(di, chunk, factor)?;
    }
    Ok(out)
}
