//! Draft-protocol wire formats: the upgrade handshake and sentinel framing.

pub mod frame;
pub mod handshake;

pub use frame::{Frame, FrameDecoder};
pub use handshake::{HandshakeRequest, HandshakeResponse};
