//! # DL/T 645-2007 Meter Protocol
//!
//! Address, control byte, identifier data and frame codec for the
//! electricity-meter protocol carried inside passthrough messages.

pub mod address;
pub mod control;
pub mod data;
pub mod error;
pub mod frame;

pub use address::MeterAddress;
pub use control::{Control, Direction, Function};
pub use data::{Data, Identifier, Reading, Unit};
pub use error::MeterError;
pub use frame::Dlt645Frame;
