use crate::api::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use chainstream_core::{ChainCursor, Deferred, IntervalSource, SseBridge};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{debug, warn};
use uuid::Uuid;

/// Walk `head` and forward each message as an SSE event.
///
/// A failing chain ends the body with one `event: error` frame. Dropping the
/// body drops the cursor, which detaches the producer behind `head`.
fn forward_chain(
    head: Deferred,
    source: &'static str,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let connection_id = Uuid::new_v4();
    debug!(%connection_id, source, "Walking deferred chain");

    ChainCursor::new(head).map(move |item| {
        let event = match item {
            Ok(message) => {
                debug!(%connection_id, source, id = message.id, "Forwarding message");
                Event::default()
                    .json_data(&message)
                    .unwrap_or_else(|err| error_event(&err.to_string()))
            }
            Err(err) => {
                warn!(%connection_id, source, error = %err, "Deferred chain ended");
                error_event(&err.to_string())
            }
        };
        Ok::<_, Infallible>(event)
    })
}

fn error_event(message: &str) -> Event {
    Event::default().event("error").data(message)
}

// GET /action-stream/interval
pub async fn interval_action_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let head = IntervalSource::new(state.tick_interval).start();
    Sse::new(forward_chain(head, "interval"))
}

// GET /action-stream/bridge
pub async fn bridge_action_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let head = SseBridge::new(state.upstream_url.clone())
        .with_client(state.http_client.clone())
        .start();
    Sse::new(forward_chain(head, "bridge"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{router, test_support};
    use chainstream_core::{Message, STARTUP_CONTENT, SseDecoder, from_messages};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(data: &str) -> Message {
        serde_json::from_str(data).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_action_stream() {
        let state = test_support::state(Duration::from_secs(5), "http://127.0.0.1:1/route-stream");
        let response = router(state)
            .oneshot(test_support::get("/action-stream/interval"))
            .await
            .unwrap();

        let mut body = response.into_body();
        let mut decoder = SseDecoder::new();
        let events = test_support::next_events(&mut body, &mut decoder, 3).await;

        let ids: Vec<u64> = events.iter().map(|event| parse(&event.data).id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(
            parse(&events[2].data).content,
            "Hello from server action interval stream - message number 3"
        );
    }

    #[tokio::test]
    async fn test_bridge_action_stream() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/route-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"messageNum\":5,\"content\":\"X\"}\n\n"),
            )
            .mount(&upstream)
            .await;

        let state = test_support::state(
            Duration::from_secs(5),
            &format!("{}/route-stream", upstream.uri()),
        );
        let response = router(state)
            .oneshot(test_support::get("/action-stream/bridge"))
            .await
            .unwrap();

        let mut body = response.into_body();
        let mut decoder = SseDecoder::new();
        let events = test_support::next_events(&mut body, &mut decoder, 4).await;

        assert_eq!(events.len(), 3);
        assert_eq!(parse(&events[0].data), Message::new(1, STARTUP_CONTENT));
        assert_eq!(parse(&events[1].data), Message::new(5, "X"));
        assert_eq!(events[2].event, "error");
    }

    #[tokio::test]
    async fn test_forward_chain_ends_after_last_message() {
        let head = from_messages(vec![Message::new(1, "a"), Message::new(2, "b")]);
        let events: Vec<_> = forward_chain(head, "test").collect().await;
        assert_eq!(events.len(), 2);
    }
}
