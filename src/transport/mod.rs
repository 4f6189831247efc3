//! # Concentrator Transport Protocol
//!
//! Outer framing between the gateway and the concentrators: frame layout,
//! message codes, stream codec, payload montage and typed messages.

pub mod code;
pub mod codec;
pub mod frame;
pub mod message;
pub mod montage;

pub use code::MessageCode;
pub use codec::FrameCodec;
pub use frame::{Frame, Sequence};
pub use message::{
    DecodeMessage, HeartbeatMessage, Message, PassthroughFailure, PassthroughMessage,
    RegisterMessage, SignalMessage,
};
pub use montage::Montage;
