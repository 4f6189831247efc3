//! # Application Messages
//!
//! Typed views over the montage of an uplink frame. Each message type knows
//! which fields it expects and how to interpret them.
//!
//! | Uplink code | Fields |
//! |---|---|
//! | register (0x81) | version, IMEI, ICCID, signal (1 B), meter frame |
//! | heartbeat (0x83) | signal (1 B), ... |
//! | signal (0x87) | signal (1 B) |
//! | passthrough (0x8A) | count (1 B), meter frame x count |

use super::{MessageCode, Montage};
use crate::dlt645::{Dlt645Frame, MeterAddress};
use crate::error::{GatewayError, Result};

/// Decoding from a decomposed payload.
pub trait DecodeMessage: Sized {
    fn decode(montage: &Montage) -> Result<Self>;
}

/// Sent once by the concentrator after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMessage {
    pub version: String,
    pub imei: String,
    pub iccid: String,
    /// Signal strength, 0 to 31.
    pub signal: u8,
    /// Address of the meter behind the concentrator.
    pub address: MeterAddress,
}

impl DecodeMessage for RegisterMessage {
    fn decode(montage: &Montage) -> Result<Self> {
        let fields = montage.fields();
        if fields.len() < 5 || fields[3].len() != 1 {
            return Err(GatewayError::InvalidDataLength);
        }
        let frame = Dlt645Frame::parse(&fields[4])?;
        Ok(RegisterMessage {
            version: text(&fields[0]),
            imei: text(&fields[1]),
            iccid: text(&fields[2]),
            signal: fields[3][0],
            address: frame.address,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMessage {
    pub signal: u8,
}

impl DecodeMessage for HeartbeatMessage {
    fn decode(montage: &Montage) -> Result<Self> {
        Ok(HeartbeatMessage {
            signal: single_byte(montage)?,
        })
    }
}

/// Reply to a signal query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalMessage {
    pub intensity: u8,
}

impl DecodeMessage for SignalMessage {
    fn decode(montage: &Montage) -> Result<Self> {
        Ok(SignalMessage {
            intensity: single_byte(montage)?,
        })
    }
}

/// Why a passthrough response stopped being parsed.
#[derive(Debug)]
pub struct PassthroughFailure {
    /// Position of the failing entry among the responses.
    pub index: usize,
    pub error: GatewayError,
}

/// Meter responses relayed by the concentrator.
///
/// Entries are parsed in order; the first failure is recorded and the
/// entries parsed before it are kept.
#[derive(Debug, Default)]
pub struct PassthroughMessage {
    /// Number of entries announced by the concentrator.
    pub count: usize,
    /// Raw entries as received.
    pub responses: Vec<Vec<u8>>,
    pub parsed: Vec<Dlt645Frame>,
    pub failure: Option<PassthroughFailure>,
}

impl PassthroughMessage {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.parsed.len() == self.count
    }
}

impl DecodeMessage for PassthroughMessage {
    fn decode(montage: &Montage) -> Result<Self> {
        let fields = montage.fields();
        let header = fields.first().ok_or(GatewayError::InvalidData)?;
        let count = usize::from(*header.first().ok_or(GatewayError::InvalidDataLength)?);

        let available = fields.len() - 1;
        let mut message = PassthroughMessage {
            count,
            responses: fields[1..].iter().take(count).cloned().collect(),
            ..Default::default()
        };

        for (index, entry) in message.responses.iter().enumerate() {
            match Dlt645Frame::parse(entry) {
                Ok(frame) => message.parsed.push(frame),
                Err(e) => {
                    message.failure = Some(PassthroughFailure {
                        index,
                        error: e.into(),
                    });
                    break;
                }
            }
        }

        if message.failure.is_none() && available < count {
            message.failure = Some(PassthroughFailure {
                index: available,
                error: GatewayError::InvalidDataLength,
            });
        }

        Ok(message)
    }
}

/// Decoded uplink message.
#[derive(Debug)]
pub enum Message {
    Register(RegisterMessage),
    Heartbeat(HeartbeatMessage),
    Signal(SignalMessage),
    Passthrough(PassthroughMessage),
}

impl Message {
    /// Decodes the montage according to `code`.
    ///
    /// Returns `Ok(None)` for codes without a message body, including every
    /// downlink code.
    pub fn decode(code: MessageCode, montage: &Montage) -> Result<Option<Message>> {
        let message = match code {
            MessageCode::REGISTER_UPLINK => Message::Register(RegisterMessage::decode(montage)?),
            MessageCode::HEARTBEAT_UPLINK => {
                Message::Heartbeat(HeartbeatMessage::decode(montage)?)
            }
            MessageCode::SIGNAL_UPLINK => Message::Signal(SignalMessage::decode(montage)?),
            MessageCode::PASSTHROUGH_UPLINK => {
                Message::Passthrough(PassthroughMessage::decode(montage)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(message))
    }
}

fn single_byte(montage: &Montage) -> Result<u8> {
    match montage.field(0) {
        Some([value]) => Ok(*value),
        _ => Err(GatewayError::InvalidDataLength),
    }
}

fn text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt645::{Control, Data, Identifier, MeterError};

    fn meter_response(identifier: Identifier, value: Vec<u8>) -> Vec<u8> {
        Dlt645Frame {
            address: "220419093277".parse().unwrap(),
            control: Control::from(0x91),
            data: Data::new(identifier, value),
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn test_register() {
        let mut montage = Montage::new();
        montage
            .push_field(b"V1.0.0-2024121700".to_vec())
            .push_field(b"861234567890123".to_vec())
            .push_field(b"89860000000000000000".to_vec())
            .push_field(vec![0x1A])
            .push_field(meter_response(Identifier::FORWARD_ACTIVE_ENERGY, vec![0; 4]));

        let register = RegisterMessage::decode(&montage).unwrap();
        assert_eq!(register.version, "V1.0.0-2024121700");
        assert_eq!(register.imei, "861234567890123");
        assert_eq!(register.signal, 26);
        assert_eq!(register.address.to_string(), "220419093277");
    }

    #[test]
    fn test_register_too_few_fields() {
        let mut montage = Montage::new();
        montage.push_fields([vec![0x31], vec![0x32], vec![0x33], vec![0x1A]]);
        assert!(matches!(
            RegisterMessage::decode(&montage),
            Err(GatewayError::InvalidDataLength)
        ));
    }

    #[test]
    fn test_heartbeat_and_signal() {
        let mut montage = Montage::new();
        montage.push_field(vec![0x1F]);
        assert_eq!(HeartbeatMessage::decode(&montage).unwrap().signal, 31);
        assert_eq!(SignalMessage::decode(&montage).unwrap().intensity, 31);

        let mut wide = Montage::new();
        wide.push_field(vec![0x1F, 0x00]);
        assert!(matches!(
            SignalMessage::decode(&wide),
            Err(GatewayError::InvalidDataLength)
        ));
        assert!(HeartbeatMessage::decode(&Montage::new()).is_err());
    }

    #[test]
    fn test_passthrough_all_parsed() {
        let mut montage = Montage::new();
        montage
            .push_field(vec![2])
            .push_field(meter_response(Identifier::FORWARD_ACTIVE_ENERGY, vec![0; 4]))
            .push_field(meter_response(Identifier::VOLTAGE, vec![0; 6]));
        let message = PassthroughMessage::decode(&montage).unwrap();
        assert_eq!(message.count, 2);
        assert_eq!(message.responses.len(), 2);
        assert_eq!(message.parsed.len(), 2);
        assert!(message.is_complete());
    }

    #[test]
    fn test_passthrough_partial() {
        let mut broken = meter_response(Identifier::VOLTAGE, vec![0; 6]);
        let cs = broken.len() - 2;
        broken[cs] ^= 0x01;

        let mut montage = Montage::new();
        montage
            .push_field(vec![3])
            .push_field(meter_response(Identifier::FORWARD_ACTIVE_ENERGY, vec![0; 4]))
            .push_field(broken)
            .push_field(meter_response(Identifier::CURRENT, vec![0; 9]));
        let message = PassthroughMessage::decode(&montage).unwrap();
        assert_eq!(message.parsed.len(), 1);
        assert_eq!(message.responses.len(), 3);
        let failure = message.failure.unwrap();
        assert_eq!(failure.index, 1);
        assert!(matches!(
            failure.error,
            GatewayError::Meter(MeterError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_passthrough_missing_entries() {
        let mut montage = Montage::new();
        montage
            .push_field(vec![2])
            .push_field(meter_response(Identifier::FORWARD_ACTIVE_ENERGY, vec![0; 4]));
        let message = PassthroughMessage::decode(&montage).unwrap();
        assert_eq!(message.parsed.len(), 1);
        assert!(matches!(
            message.failure,
            Some(PassthroughFailure {
                index: 1,
                error: GatewayError::InvalidDataLength
            })
        ));
    }

    #[test]
    fn test_passthrough_empty() {
        assert!(matches!(
            PassthroughMessage::decode(&Montage::new()),
            Err(GatewayError::InvalidData)
        ));
        let montage = Montage::decompose(&[0x00, 0x00]);
        assert!(matches!(
            PassthroughMessage::decode(&montage),
            Err(GatewayError::InvalidData)
        ));
    }

    #[test]
    fn test_message_dispatch() {
        let mut montage = Montage::new();
        montage.push_field(vec![0x10]);
        assert!(matches!(
            Message::decode(MessageCode::SIGNAL_UPLINK, &montage).unwrap(),
            Some(Message::Signal(SignalMessage { intensity: 16 }))
        ));
        assert!(Message::decode(MessageCode::SIGNAL, &montage)
            .unwrap()
            .is_none());
        assert!(Message::decode(MessageCode(0xEE), &montage)
            .unwrap()
            .is_none());
    }
}
