pub mod action_stream;
pub mod route_stream;
pub mod state;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, header},
    routing::get,
};
use serde::Serialize;
use state::AppState;
use tower_http::cors::CorsLayer;

#[derive(Serialize)]
struct Health {
    status: String,
    version: &'static str,
    route_writes: u64,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "chainstream is working!".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        route_writes: state.route_writes(),
    })
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        // Raw SSE endpoint
        .route("/route-stream", get(route_stream::route_stream))
        // Deferred chains forwarded as SSE
        .route(
            "/action-stream/interval",
            get(action_stream::interval_action_stream),
        )
        .route(
            "/action-stream/bridge",
            get(action_stream::bridge_action_stream),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::state::{AppState, StreamContext};
    use axum::body::Body;
    use axum::http::Request;
    use chainstream_core::{SseDecoder, SseEvent};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;

    pub fn state(tick_interval: Duration, upstream_url: &str) -> AppState {
        Arc::new(StreamContext::new(tick_interval, upstream_url))
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    /// Read body frames until `count` events are decoded or the body ends.
    pub async fn next_events(
        body: &mut Body,
        decoder: &mut SseDecoder,
        count: usize,
    ) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while events.len() < count {
            let Some(frame) = body.frame().await else {
                break;
            };
            if let Ok(data) = frame.unwrap().into_data() {
                events.extend(decoder.push(&data));
            }
        }
        events
    }
}
