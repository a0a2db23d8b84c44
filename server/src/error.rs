use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

/// Transport-level failures. JSON-RPC errors never take this path; they are
/// answered in-band by the runtime.
#[derive(Debug)]
pub enum AppError {
    /// `session_id` query parameter absent (400)
    MissingSession,
    /// `session_id` is not a UUID (400)
    InvalidSession(String),
    /// No open SSE stream for this id (404)
    UnknownSession(Uuid),
    /// Request body is not JSON (400)
    MalformedMessage(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs_hint: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::now_v7().to_string();

        let (status, error, message, docs_hint) = match self {
            AppError::MissingSession => (
                StatusCode::BAD_REQUEST,
                "session_id_required",
                "session_id is required".to_string(),
                Some("Open GET /sse first and POST to the URL from its endpoint event."),
            ),
            AppError::InvalidSession(raw) => (
                StatusCode::BAD_REQUEST,
                "invalid_session_id",
                format!("Invalid session ID '{raw}'"),
                None,
            ),
            AppError::UnknownSession(id) => {
                tracing::warn!(event = "sse_session_unknown", session_id = %id, "Message for unknown SSE session");
                (
                    StatusCode::NOT_FOUND,
                    "session_not_found",
                    "Could not find session".to_string(),
                    Some("The SSE stream may have closed; reconnect to GET /sse."),
                )
            }
            AppError::MalformedMessage(detail) => (
                StatusCode::BAD_REQUEST,
                "malformed_message",
                format!("Could not parse message: {detail}"),
                None,
            ),
        };

        (
            status,
            Json(ErrorBody {
                error,
                message,
                request_id,
                docs_hint,
            }),
        )
            .into_response()
    }
}
