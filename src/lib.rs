//! # ammeter-gateway - Protocol Gateway for Ammeter Concentrators
//!
//! The ammeter-gateway crate terminates TCP connections from field
//! concentrators, decodes their framed transport protocol and the DL/T
//! 645-2007 meter frames relayed inside it, polls each registered meter
//! periodically and publishes the decoded readings as JSON telemetry.
//!
//! ## Layers
//!
//! - [`transport`]: frame layout, stream codec, payload montage and typed
//!   uplink messages
//! - [`dlt645`]: meter address, control byte, identifier data and frame codec
//! - [`session`]: per-connection dispatcher, command/response correlation and
//!   the polling scheduler
//! - [`telemetry`]: telemetry message model and sinks
//! - [`server`]: TCP accept loop and connection handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ammeter_gateway::{serve, GatewayConfig, LogSink};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> ammeter_gateway::Result<()> {
//! let config = Arc::new(GatewayConfig::load("config/config.toml")?);
//! let listener = TcpListener::bind(config.server.bind).await?;
//! serve(listener, config, Arc::new(LogSink)).await
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dlt645;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod transport;
pub mod util;

pub use crate::config::GatewayConfig;
pub use crate::error::{GatewayError, Result};
pub use crate::logging::init_logger;

pub use dlt645::{Dlt645Frame, Identifier, MeterAddress, MeterError, Reading};
pub use server::{handle_connection, serve, serve_until};
pub use session::Session;
pub use telemetry::{ChannelSink, LogSink, TelemetryMessage, TelemetrySink};
pub use transport::{Frame, FrameCodec, Message, MessageCode, Montage, Sequence};
