//! # Telemetry
//!
//! Decoded readings are turned into JSON messages and handed to a
//! [`TelemetrySink`]. The gateway ships two sinks: [`LogSink`] writes the
//! payload to the log, [`ChannelSink`] forwards it into a tokio channel for
//! an embedding application to consume.

use crate::dlt645::{MeterAddress, Reading};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Per-phase values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseData {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl From<[f64; 3]> for PhaseData {
    fn from([a, b, c]: [f64; 3]) -> Self {
        PhaseData { a, b, c }
    }
}

/// Message published for one reading. Only the field matching the reading is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    /// Meter address.
    pub no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<PhaseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electric: Option<PhaseData>,
    /// Forward active energy in kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_total: Option<f64>,
}

impl TelemetryMessage {
    /// Message for a reading, or `None` for readings that are not forwarded.
    pub fn from_reading(address: &MeterAddress, reading: &Reading) -> Option<Self> {
        let mut message = TelemetryMessage {
            no: address.to_string(),
            ..Default::default()
        };
        match *reading {
            Reading::ForwardActiveEnergy(total) => message.power_total = Some(total),
            Reading::Voltage(phases) => message.voltage = Some(phases.into()),
            Reading::Current(phases) => message.electric = Some(phases.into()),
            _ => return None,
        }
        Some(message)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Destination for telemetry payloads.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Writes payloads to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        info!("[{}] {}", topic, String::from_utf8_lossy(payload));
        Ok(())
    }
}

/// Forwards `(topic, payload)` pairs into a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<(String, Vec<u8>)>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(String, Vec<u8>)>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TelemetrySink for ChannelSink {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.tx
            .send((topic.to_string(), payload.to_vec()))
            .await
            .map_err(|_| GatewayError::Sink("telemetry channel closed".into()))
    }
}
