use crate::api::state::AppState;
use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, header},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use chainstream_core::Message;
use tokio::time::{Instant, interval_at};
use tracing::debug;
use uuid::Uuid;

/// Content template of `/route-stream` events.
pub fn route_message(number: u64) -> Message {
    Message::new(
        number,
        format!("Hello from server route - message number {}", number),
    )
}

// GET /route-stream
//
// One `data: {"id":n,"content":...}` event per tick, starting at 0. The timer
// lives inside the body stream, so a client abort drops it with the body.
pub async fn route_stream(State(state): State<AppState>) -> impl IntoResponse {
    let connection_id = Uuid::new_v4();
    let period = state.tick_interval;
    debug!(%connection_id, ?period, "Opening route stream");

    let stream = async_stream::stream! {
        let mut ticker = interval_at(Instant::now() + period, period);
        let mut message_num = 0u64;

        loop {
            ticker.tick().await;
            state.record_route_write();
            yield Event::default().json_data(route_message(message_num));
            message_num += 1;
        }
    };

    (
        [
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-transform"),
            ),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(stream),
    )
}
