use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body of every response the proxy generates itself.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Builds a JSON `{"detail": ...}` response with the given status.
pub fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    let body = ErrorBody {
        detail: detail.into(),
    };
    (status, Json(body)).into_response()
}
