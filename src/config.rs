//! Gateway configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration.

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_TELEMETRY_TOPIC, DEFAULT_WARMUP,
};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load and validate configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GatewayError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            return Err(GatewayError::Config(
                "polling.interval_secs must be positive".into(),
            ));
        }
        if self.polling.command_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "polling.command_timeout_secs must be positive".into(),
            ));
        }
        if self.protocol.outbound_queue == 0 {
            return Err(GatewayError::Config(
                "protocol.outbound_queue must be positive".into(),
            ));
        }
        if self.telemetry.topic.is_empty() {
            return Err(GatewayError::Config("telemetry.topic is empty".into()));
        }
        Ok(())
    }

    /// Default configuration rendered as TOML.
    pub fn sample() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| GatewayError::Config(format!("Failed to serialize config: {e}")))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address concentrators connect to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Wire handling switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Drop transport frames whose CRC does not match.
    #[serde(default = "default_true")]
    pub verify_checksum: bool,

    /// Handle frames of a connection one at a time, in arrival order.
    #[serde(default)]
    pub serial_dispatch: bool,

    /// Capacity of the per-connection outbound queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            serial_dispatch: false,
            outbound_queue: default_outbound_queue(),
        }
    }
}

/// Meter polling timings, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl PollingConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            warmup_secs: default_warmup_secs(),
            interval_secs: default_interval_secs(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Topic readings are published to.
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5009))
}

fn default_true() -> bool {
    true
}

fn default_outbound_queue() -> usize {
    64
}

fn default_warmup_secs() -> u64 {
    DEFAULT_WARMUP.as_secs()
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_topic() -> String {
    DEFAULT_TELEMETRY_TOPIC.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
