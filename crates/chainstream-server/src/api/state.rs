use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Settings and counters shared by the stream handlers.
#[derive(Debug)]
pub struct StreamContext {
    pub tick_interval: Duration,
    pub upstream_url: String,
    pub http_client: reqwest::Client,
    route_writes: AtomicU64,
}

impl StreamContext {
    pub fn new(tick_interval: Duration, upstream_url: impl Into<String>) -> Self {
        Self {
            tick_interval,
            upstream_url: upstream_url.into(),
            http_client: reqwest::Client::new(),
            route_writes: AtomicU64::new(0),
        }
    }

    /// Events written by `/route-stream` across all connections.
    pub fn route_writes(&self) -> u64 {
        self.route_writes.load(Ordering::Relaxed)
    }

    pub(crate) fn record_route_write(&self) {
        self.route_writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Application state shared across all API handlers
pub type AppState = Arc<StreamContext>;
