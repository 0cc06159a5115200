use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::headers::InvalidIdentityHeader;
use crate::http::response::error_response;

/// Failures of a single forwarded call.
///
/// Upstream 4xx/5xx answers are not errors here; they are relayed as-is.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The outbound call did not finish within the configured timeout
    #[error("Aiden API timeout")]
    Timeout,

    /// Connection, DNS, TLS or protocol failure talking to the upstream
    #[error("Aiden API unavailable: {0}")]
    Transport(String),

    /// The composed target URL did not parse
    #[error("Aiden API unavailable: invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Identity(#[from] InvalidIdentityHeader),
}

impl ForwardError {
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ForwardError::Timeout
        } else {
            ForwardError::Transport(describe(error))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport(_) | ForwardError::InvalidUrl(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

/// Renders an error together with its source chain.
///
/// reqwest's top-level message only names the URL; the cause that matters
/// (connection refused, DNS failure, ...) sits further down the chain.
pub fn describe(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
