//! Meter address field.
//!
//! The six address bytes are sent least significant pair first, so the label
//! `220419093277` travels as `77 32 09 19 04 22`.

use super::MeterError;
use crate::constants::DLT645_ADDRESS_LEN;
use std::fmt;
use std::str::FromStr;

/// Six-byte meter address in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeterAddress(pub [u8; DLT645_ADDRESS_LEN]);

impl MeterAddress {
    /// Wraps wire-order bytes.
    pub fn from_bytes(raw: [u8; DLT645_ADDRESS_LEN]) -> Self {
        MeterAddress(raw)
    }

    /// Wire-order bytes.
    pub fn to_bytes(self) -> [u8; DLT645_ADDRESS_LEN] {
        self.0
    }

    /// Builds an address from a slice holding exactly six bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, MeterError> {
        let bytes: [u8; DLT645_ADDRESS_LEN] = raw.try_into().map_err(|_| {
            MeterError::InvalidAddress(format!("expected 6 bytes, got {}", raw.len()))
        })?;
        Ok(MeterAddress(bytes))
    }
}

impl fmt::Display for MeterAddress {
    /// Lowercase label form, most significant pair first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut label = self.0;
        label.reverse();
        f.write_str(&hex::encode(label))
    }
}

impl FromStr for MeterAddress {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DLT645_ADDRESS_LEN * 2 {
            return Err(MeterError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; DLT645_ADDRESS_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| MeterError::InvalidAddress(s.to_string()))?;
        bytes.reverse();
        Ok(MeterAddress(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_address_label() {
        let address = MeterAddress([0x77, 0x32, 0x09, 0x19, 0x04, 0x22]);
        assert_eq!(address.to_string(), "220419093277");
    }

    #[test]
    fn test_address_parse() {
        let address: MeterAddress = "220419093277".parse().unwrap();
        assert_eq!(address.to_bytes(), [0x77, 0x32, 0x09, 0x19, 0x04, 0x22]);
        let upper: MeterAddress = "AABBCCDDEEFF".parse().unwrap();
        assert_eq!(upper.to_string(), "aabbccddeeff");
    }

    #[test]
    fn test_address_parse_rejects_bad_input() {
        assert!("22041909327".parse::<MeterAddress>().is_err());
        assert!("2204190932777".parse::<MeterAddress>().is_err());
        assert!("22041909327g".parse::<MeterAddress>().is_err());
    }

    #[test]
    fn test_from_slice_length() {
        assert!(MeterAddress::from_slice(&[1, 2, 3, 4, 5]).is_err());
        assert_eq!(
            MeterAddress::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap(),
            MeterAddress([1, 2, 3, 4, 5, 6])
        );
    }

    proptest! {
        #[test]
        fn prop_address_round_trip(raw in any::<[u8; 6]>()) {
            let label = MeterAddress(raw).to_string();
            prop_assert_eq!(label.parse::<MeterAddress>().unwrap().to_bytes(), raw);
        }
    }
}
