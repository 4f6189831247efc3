//! Builders shared by the integration tests.
#![allow(dead_code)]

use ammeter_gateway::dlt645::{Control, Data, Dlt645Frame, Identifier, MeterAddress};
use ammeter_gateway::transport::{Frame, MessageCode, Montage, Sequence};
use ammeter_gateway::GatewayConfig;
use bytes::Bytes;
use std::sync::Arc;

pub const METER: &str = "220419093277";

pub fn meter_address() -> MeterAddress {
    METER.parse().unwrap()
}

/// Normal read response from the meter.
pub fn meter_response(identifier: Identifier, value: Vec<u8>) -> Vec<u8> {
    Dlt645Frame {
        address: meter_address(),
        control: Control::from(0x91),
        data: Data::new(identifier, value),
    }
    .encode()
    .unwrap()
}

/// Read-address response, as embedded in a register message.
pub fn address_response() -> Vec<u8> {
    let a = meter_address().to_bytes();
    Dlt645Frame {
        address: meter_address(),
        control: Control::from(0x93),
        data: Data::new(Identifier::from_le_bytes([a[0], a[1], a[2], a[3]]), vec![a[4], a[5]]),
    }
    .encode()
    .unwrap()
}

pub fn uplink(code: MessageCode, sequence: Sequence, montage: &Montage) -> Frame {
    Frame::new(0x00, sequence, code, Bytes::from(montage.compose().unwrap()))
}

pub fn register_frame() -> Frame {
    let mut montage = Montage::new();
    montage
        .push_field(b"V1.0.3".to_vec())
        .push_field(b"861234567890123".to_vec())
        .push_field(b"89860412345678901234".to_vec())
        .push_field(vec![24])
        .push_field(address_response());
    uplink(MessageCode::REGISTER_UPLINK, Sequence([0, 0, 0, 1]), &montage)
}

pub fn heartbeat_frame(signal: u8) -> Frame {
    let mut montage = Montage::new();
    montage.push_field(vec![signal]);
    uplink(MessageCode::HEARTBEAT_UPLINK, Sequence([0, 0, 0, 2]), &montage)
}

pub fn passthrough_frame(sequence: Sequence, entries: Vec<Vec<u8>>) -> Frame {
    let mut montage = Montage::new();
    montage
        .push_field(vec![entries.len() as u8])
        .push_fields(entries);
    uplink(MessageCode::PASSTHROUGH_UPLINK, sequence, &montage)
}

/// Identifier of the single read request carried by a passthrough downlink.
pub fn requested_identifier(command: &Frame) -> Identifier {
    let montage = Montage::decompose(&command.payload);
    assert_eq!(montage.field(0), Some(&[1u8][..]));
    Dlt645Frame::parse(montage.field(1).unwrap())
        .unwrap()
        .data
        .identifier
}

pub fn config() -> Arc<GatewayConfig> {
    Arc::new(GatewayConfig::default())
}
