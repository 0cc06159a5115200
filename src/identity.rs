//! Caller identity and the verification seam.
//!
//! The proxy never validates credentials itself. Each route handler asks the
//! [`IdentityVerifier`] held in the server state who the caller is, and the
//! forwarder passes the answer upstream as `X-User-*` headers.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::http::response::error_response;

const DEFAULT_ROLE: &str = "user";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated caller, as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            role: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Email, or an empty string when unknown.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    /// Display name, or an empty string when unknown.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Role, falling back to `"user"` when missing or blank.
    pub fn role_or_default(&self) -> &str {
        self.role
            .as_deref()
            .filter(|role| !role.is_empty())
            .unwrap_or(DEFAULT_ROLE)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingCredentials,

    #[error("identity endpoint rejected credentials with status {0}")]
    Rejected(StatusCode),

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials | AuthError::Rejected(_) => {
                tracing::debug!(error = %self, "Rejecting unauthenticated request");
                error_response(StatusCode::UNAUTHORIZED, "Not authenticated")
            }
            AuthError::Unavailable(_) => {
                tracing::error!(error = %self, "Identity verification failed");
                error_response(StatusCode::BAD_GATEWAY, self.to_string())
            }
        }
    }
}

/// Resolves the credentials on an inbound request into a caller identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError>;
}

/// Verifier that delegates to a remote identity endpoint.
///
/// The caller's `Authorization` and `Cookie` headers are replayed against
/// the endpoint with a `GET`; a 2xx answer must carry a JSON
/// [`CallerIdentity`].
pub struct RemoteVerifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteVerifier {
    pub fn new(endpoint: Url) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IdentityVerifier for RemoteVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
        let mut credentials = HeaderMap::new();
        for name in [header::AUTHORIZATION, header::COOKIE] {
            for value in headers.get_all(&name) {
                credentials.append(name.clone(), value.clone());
            }
        }

        if credentials.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .headers(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(status));
        }
        if !status.is_success() {
            return Err(AuthError::Unavailable(format!(
                "unexpected status {status} from identity endpoint"
            )));
        }

        response
            .json::<CallerIdentity>()
            .await
            .map_err(|e| AuthError::Unavailable(format!("malformed identity record: {e}")))
    }
}
