//! Walking a deferred chain.

use crate::chain::{Deferred, StreamingMessage};
use crate::error::Result;
use crate::message::Message;
use futures::Stream;
use futures::stream::FusedStream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Await each handle in turn and hand every resolved message to `on_message`.
///
/// Returns the number of delivered messages once a message without `next`
/// arrives. A handle that resolves to an error ends the walk with that error;
/// messages delivered before it have already been passed to the callback.
pub async fn consume<F>(head: Deferred, mut on_message: F) -> Result<usize>
where
    F: FnMut(Message),
{
    let mut pending = head;
    let mut delivered = 0;

    loop {
        let StreamingMessage { message, next } = pending.await?;
        on_message(message);
        delivered += 1;

        match next {
            Some(next) => pending = next,
            None => return Ok(delivered),
        }
    }
}

/// Pull-based view of a chain.
///
/// Yields messages in arrival order. Ends after a message without `next`, or
/// right after yielding an error. Dropping the cursor drops the outstanding
/// handle and so detaches the producer.
#[derive(Debug)]
pub struct ChainCursor {
    pending: Option<Deferred>,
}

impl ChainCursor {
    pub fn new(head: Deferred) -> Self {
        Self {
            pending: Some(head),
        }
    }
}

impl From<Deferred> for ChainCursor {
    fn from(head: Deferred) -> Self {
        Self::new(head)
    }
}

impl Stream for ChainCursor {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(pending).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(StreamingMessage { message, next })) => {
                self.pending = next;
                Poll::Ready(Some(Ok(message)))
            }
            Poll::Ready(Err(err)) => {
                self.pending = None;
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

impl FusedStream for ChainCursor {
    fn is_terminated(&self) -> bool {
        self.pending.is_none()
    }
}
