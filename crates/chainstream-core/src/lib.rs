//! Chainstream core: lazily produced message sequences.
//!
//! A producer hands out a single [`Deferred`] handle. Awaiting it yields a
//! [`StreamingMessage`] that carries a payload and the handle to the next,
//! not yet resolved message. Consumers walk the sequence with [`consume`] or
//! pull it as a stream through [`ChainCursor`].
//!
//! Two sources feed the same chain shape:
//! - [`IntervalSource`] emits a numbered message on a fixed period.
//! - [`SseBridge`] republishes the events of an upstream event-stream endpoint.
//!
//! Every source owns its timer or connection for as long as the consumer holds
//! the outstanding handle. Dropping the handle (or the cursor wrapping it)
//! stops the source.

pub mod chain;
pub mod consumer;
pub mod error;
pub mod interval;
pub mod message;
pub mod sse;

pub use chain::{ChainProducer, Deferred, StreamingMessage, chain, from_messages};
pub use consumer::{ChainCursor, consume};
pub use error::{ChainError, Result};
pub use interval::{DEFAULT_PERIOD, DEFAULT_TEMPLATE, IntervalSource, MIN_PERIOD, interval_chain};
pub use message::Message;
pub use sse::{ConnectionState, STARTUP_CONTENT, SseBridge, SseDecoder, SseEvent};
