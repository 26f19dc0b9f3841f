//! Republishes an upstream event stream as a deferred chain.

use super::decoder::SseDecoder;
use crate::chain::{ChainProducer, Deferred, chain};
use crate::error::{ChainError, Result};
use crate::message::Message;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Content of the message emitted before the upstream connection opens.
pub const STARTUP_CONTENT: &str = "Starting up";

/// Lifecycle of the upstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Error,
}

/// JSON payload of an upstream event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamPayload {
    #[serde(alias = "id")]
    message_num: u64,
    content: String,
}

impl UpstreamPayload {
    fn into_message(self) -> Message {
        Message::new(self.message_num, self.content)
    }
}

/// Connects to an event-stream endpoint and exposes its `message` events as a
/// chain.
///
/// No reconnection is attempted. When the upstream fails or ends, the chain
/// is abandoned and the consumer sees [`ChainError::Abandoned`].
///
/// Message ids are passed through from the upstream unchanged, so they only
/// follow arrival order. The startup message always has id 1, and an upstream
/// counting from 0 repeats it.
#[derive(Debug)]
pub struct SseBridge {
    client: reqwest::Client,
    url: String,
    state: watch::Sender<ConnectionState>,
}

impl SseBridge {
    pub fn new(url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            state,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Watch the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Emit the startup message, connect in the background and return the
    /// head handle. Must be called from within a tokio runtime.
    pub fn start(self) -> Deferred {
        self.spawn().0
    }

    /// Like [`start`](Self::start), also returning the connection task, which
    /// resolves to the final connection state.
    pub fn spawn(self) -> (Deferred, JoinHandle<ConnectionState>) {
        let (mut producer, head) = chain();
        let _ = producer.emit(Message::new(1, STARTUP_CONTENT));

        let handle = tokio::spawn(async move { self.run(producer).await });
        (head, handle)
    }

    async fn run(self, mut producer: ChainProducer) -> ConnectionState {
        let state = match self.pump(&mut producer).await {
            Ok(state) => state,
            Err(err) => {
                warn!(url = %self.url, error = %err, "Upstream event source failed");
                ConnectionState::Error
            }
        };

        self.set_state(state);
        debug!(
            url = %self.url,
            emitted = producer.emitted(),
            "Upstream bridge stopped"
        );
        state
    }

    async fn pump(&self, producer: &mut ChainProducer) -> Result<ConnectionState> {
        self.set_state(ConnectionState::Connecting);

        let request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .send();
        let response = tokio::select! {
            _ = producer.detached() => return Ok(ConnectionState::Closed),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::UpstreamStatus(status.as_u16()));
        }

        self.set_state(ConnectionState::Open);

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        loop {
            let chunk = tokio::select! {
                _ = producer.detached() => {
                    debug!(url = %self.url, "Bridge consumer detached");
                    return Ok(ConnectionState::Closed);
                }
                chunk = body.next() => chunk,
            };

            let Some(chunk) = chunk else {
                debug!(url = %self.url, "Upstream event stream ended");
                return Ok(ConnectionState::Closed);
            };

            for event in decoder.push(&chunk?) {
                if event.event != "message" {
                    continue;
                }
                let payload: UpstreamPayload = serde_json::from_str(&event.data)?;
                if producer.emit(payload.into_message()).is_err() {
                    return Ok(ConnectionState::Closed);
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(url = %self.url, ?previous, current = ?state, "Bridge connection state changed");
        }
    }
}
