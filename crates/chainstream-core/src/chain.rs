//! Deferred chain primitives.
//!
//! A chain is a singly linked list whose links are one-shot channels. The
//! producer keeps the sending half of the only unresolved link; every
//! [`ChainProducer::emit`] resolves that link with a message plus the
//! receiving half of a fresh link, then keeps the fresh sender.

use crate::error::{ChainError, Result};
use crate::message::Message;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// A resolved link of the chain.
#[derive(Debug)]
pub struct StreamingMessage {
    pub message: Message,
    /// Handle to the following message, `None` at the end of the chain.
    pub next: Option<Deferred>,
}

impl StreamingMessage {
    pub fn id(&self) -> u64 {
        self.message.id
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    pub fn into_parts(self) -> (Message, Option<Deferred>) {
        (self.message, self.next)
    }
}

/// Handle to a not yet resolved [`StreamingMessage`].
///
/// Awaiting consumes the handle. Dropping it detaches the consumer and lets
/// the producer stop.
#[derive(Debug)]
#[must_use = "dropping a Deferred detaches the consumer from the chain"]
pub struct Deferred {
    rx: oneshot::Receiver<StreamingMessage>,
}

impl Future for Deferred {
    type Output = Result<StreamingMessage>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|resolved| resolved.map_err(|_| ChainError::Abandoned))
    }
}

/// Producing side of a chain. Holds the single outstanding resolver.
#[derive(Debug)]
pub struct ChainProducer {
    resolver: oneshot::Sender<StreamingMessage>,
    emitted: u64,
}

/// Allocate a chain and return its producer together with the head handle.
pub fn chain() -> (ChainProducer, Deferred) {
    let (resolver, rx) = oneshot::channel();
    (
        ChainProducer {
            resolver,
            emitted: 0,
        },
        Deferred { rx },
    )
}

impl ChainProducer {
    /// Resolve the outstanding handle with `message` and a fresh handle for
    /// the message after it.
    pub fn emit(&mut self, message: Message) -> Result<()> {
        let (resolver, rx) = oneshot::channel();
        let previous = std::mem::replace(&mut self.resolver, resolver);
        previous
            .send(StreamingMessage {
                message,
                next: Some(Deferred { rx }),
            })
            .map_err(|_| ChainError::Detached)?;
        self.emitted += 1;
        Ok(())
    }

    /// Resolve the outstanding handle with the final message of the chain.
    pub fn finish(self, message: Message) -> Result<()> {
        self.resolver
            .send(StreamingMessage {
                message,
                next: None,
            })
            .map_err(|_| ChainError::Detached)
    }

    /// Completes once the consumer has dropped the outstanding handle.
    ///
    /// Cancel safe, so it can sit in a `select!` next to a timer or a socket.
    pub async fn detached(&mut self) {
        self.resolver.closed().await
    }

    pub fn is_detached(&self) -> bool {
        self.resolver.is_closed()
    }

    /// Number of messages emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Build a bounded chain from already known messages.
///
/// The last message carries no `next`. An empty input yields a head that
/// resolves to [`ChainError::Abandoned`].
pub fn from_messages<I>(messages: I) -> Deferred
where
    I: IntoIterator<Item = Message>,
{
    let (mut producer, head) = chain();
    let mut messages = messages.into_iter().peekable();

    while let Some(message) = messages.next() {
        // The head is still held here, so neither call can observe a detach.
        if messages.peek().is_none() {
            let _ = producer.finish(message);
            return head;
        }
        let _ = producer.emit(message);
    }

    head
}
