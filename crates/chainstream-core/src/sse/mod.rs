//! Server-Sent Events: frame decoding and the upstream bridge.

mod bridge;
mod decoder;

pub use bridge::{ConnectionState, STARTUP_CONTENT, SseBridge};
pub use decoder::{SseDecoder, SseEvent};
