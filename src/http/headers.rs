//! Header rules for traffic crossing the proxy.

use axum::http::header::{self, HeaderMap, HeaderValue};

use crate::identity::CallerIdentity;

pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_EMAIL: &str = "x-user-email";
pub const X_USER_NAME: &str = "x-user-name";
pub const X_USER_ROLE: &str = "x-user-role";

/// Headers that only describe the inbound connection.
const HOP_BY_HOP: [&str; 5] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

const IDENTITY_HEADERS: [&str; 4] = [X_USER_ID, X_USER_EMAIL, X_USER_NAME, X_USER_ROLE];

#[derive(Debug, thiserror::Error)]
#[error("identity value for {header} cannot be sent as a header")]
pub struct InvalidIdentityHeader {
    pub header: &'static str,
}

/// Builds the header set for an outbound request.
///
/// Inbound `Host` and `Content-Length` are regenerated by the client, so
/// they never cross. Inbound `X-User-*` headers are dropped as well: only
/// `identity` decides what the upstream is told about the caller.
pub fn outbound_headers(
    inbound: &HeaderMap,
    identity: Option<&CallerIdentity>,
) -> Result<HeaderMap, InvalidIdentityHeader> {
    let mut headers = inbound.clone();

    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    for name in HOP_BY_HOP.into_iter().chain(IDENTITY_HEADERS) {
        headers.remove(name);
    }

    if let Some(identity) = identity {
        let values = [
            (X_USER_ID, identity.id.as_str()),
            (X_USER_EMAIL, identity.email_or_empty()),
            (X_USER_NAME, identity.name_or_empty()),
            (X_USER_ROLE, identity.role_or_default()),
        ];
        for (name, value) in values {
            // from_bytes accepts UTF-8 display names; only control bytes fail
            let value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|_| InvalidIdentityHeader { header: name })?;
            headers.insert(name, value);
        }
    }

    Ok(headers)
}

/// Headers from an upstream response that are relayed to the caller.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}
