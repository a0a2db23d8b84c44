use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, SessionGuard};

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages/";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<AppState> {
    Router::new()
        .route(SSE_PATH, get(sse_connect))
        .route(MESSAGES_PATH, post(post_message))
        .route("/messages", post(post_message))
}

/// Event stream that unregisters its session once the client goes away.
struct SessionStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S> Stream for SessionStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

async fn sse_connect(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (guard, rx) = state.sessions.open();
    let session_id = guard.id();
    tracing::info!(event = "sse_session_opened", session_id = %session_id, "SSE client connected");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?session_id={}", session_id.simple()));
    let messages = ReceiverStream::new(rx).map(|message: Value| {
        Ok(Event::default().event("message").data(message.to_string()))
    });

    let stream = SessionStream {
        inner: stream::once(futures::future::ready(Ok::<_, Infallible>(endpoint))).chain(messages),
        _guard: guard,
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

#[derive(Debug, Deserialize)]
struct MessageParams {
    session_id: Option<String>,
}

/// Accept a JSON-RPC message for an open session. Responses are delivered on
/// that session's event stream, not in this response.
async fn post_message(
    State(state): State<AppState>,
    Query(params): Query<MessageParams>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let raw_id = params.session_id.ok_or(AppError::MissingSession)?;
    let session_id =
        Uuid::parse_str(raw_id.trim()).map_err(|_| AppError::InvalidSession(raw_id.clone()))?;
    let sender = state
        .sessions
        .sender(&session_id)
        .ok_or(AppError::UnknownSession(session_id))?;

    let incoming: Value = serde_json::from_slice(&body)
        .map_err(|err| AppError::MalformedMessage(err.to_string()))?;

    let mcp = state.mcp.clone();
    tokio::spawn(async move {
        for response in mcp.handle_incoming_message(incoming).await {
            if sender.send(response).await.is_err() {
                tracing::warn!(
                    event = "sse_response_dropped",
                    session_id = %session_id,
                    "SSE stream closed before the response was delivered"
                );
                break;
            }
        }
    });

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use tower::ServiceExt;

    use crate::state::test_state;

    fn app() -> axum::Router {
        super::router().with_state(test_state())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    #[tokio::test]
    async fn missing_session_id_is_bad_request() {
        let response = app()
            .oneshot(post("/messages/", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let uri = format!("/messages/?session_id={}", uuid::Uuid::now_v7().simple());
        let response = app()
            .oneshot(post(&uri, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_session_id_is_bad_request() {
        let response = app()
            .oneshot(post("/messages/?session_id=not-a-uuid", "{}"))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn responses_arrive_on_the_session_stream() {
        let state = test_state();
        let app = super::router().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sse")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .expect("content-type header should exist"),
            "text/event-stream"
        );

        let mut events = response.into_body().into_data_stream();
        let first = events
            .next()
            .await
            .expect("endpoint event should arrive")
            .expect("frame should be readable");
        let first = String::from_utf8(first.to_vec()).expect("event should be utf-8");
        assert!(first.contains("event: endpoint"));
        let endpoint = first
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("endpoint event should carry data")
            .to_string();
        assert!(endpoint.starts_with("/messages/?session_id="));
        assert_eq!(state.sessions.active_count(), 1);

        let accepted = app
            .oneshot(post(&endpoint, r#"{"jsonrpc":"2.0","id":42,"method":"ping"}"#))
            .await
            .expect("request should succeed");
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);

        let message = events
            .next()
            .await
            .expect("message event should arrive")
            .expect("frame should be readable");
        let message = String::from_utf8(message.to_vec()).expect("event should be utf-8");
        assert!(message.contains("event: message"));
        assert!(message.contains(r#""id":42"#));
        assert!(message.contains(r#""result":{}"#));

        drop(events);
        assert_eq!(state.sessions.active_count(), 0);
    }
}
