//! Request forwarding to the upstream origin.

use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use reqwest::Method;
use std::time::Duration;
use url::Url;

use crate::http::headers::{outbound_headers, relay_headers};
use crate::identity::CallerIdentity;
use crate::proxy::error::ForwardError;

/// Methods whose inbound body is forwarded.
pub fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// The parts of an inbound request that cross the proxy.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    pub body: Bytes,
}

impl InboundRequest {
    /// Captures headers and query, reading the body only when `method`
    /// forwards one.
    pub async fn read(request: Request, method: &Method) -> Result<Self, BytesRejection> {
        let headers = request.headers().clone();
        let query = request.uri().query().map(str::to_string);

        let body = if carries_body(method) {
            Bytes::from_request(request, &()).await?
        } else {
            Bytes::new()
        };

        Ok(Self {
            headers,
            query,
            body,
        })
    }
}

/// Upstream answer, relayed to the caller without interpretation.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Forwards requests to a single upstream origin.
///
/// Cloning is cheap; clones share the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    origin: String,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(origin: &Url, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ForwardError::from_reqwest(&e))?;

        Ok(Self {
            client,
            origin: origin.as_str().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `origin + "/" + upstream_path`, with `query` attached verbatim.
    pub fn target_url(&self, upstream_path: &str, query: Option<&str>) -> Result<Url, ForwardError> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.origin,
            upstream_path.trim_start_matches('/')
        ))?;
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    /// Builds the outbound request without sending it.
    pub fn build_request(
        &self,
        inbound: &InboundRequest,
        upstream_path: &str,
        method: Method,
        identity: Option<&CallerIdentity>,
    ) -> Result<reqwest::Request, ForwardError> {
        let url = self.target_url(upstream_path, inbound.query.as_deref())?;
        let headers = outbound_headers(&inbound.headers, identity)?;
        let with_body = carries_body(&method);

        let mut builder = self.client.request(method, url).headers(headers);
        if with_body {
            builder = builder.body(inbound.body.clone());
        }

        builder.build().map_err(|e| ForwardError::from_reqwest(&e))
    }

    /// Sends one request upstream and collects the full response.
    ///
    /// No retries. Timeouts and transport failures come back as
    /// [`ForwardError`]; every upstream status is a success here.
    pub async fn forward(
        &self,
        inbound: InboundRequest,
        upstream_path: &str,
        method: Method,
        identity: Option<&CallerIdentity>,
    ) -> Result<UpstreamResponse, ForwardError> {
        let request = self
            .build_request(&inbound, upstream_path, method.clone(), identity)
            .inspect_err(|error| {
                tracing::error!(
                    method = %method,
                    path = upstream_path,
                    error = %error,
                    "Could not build upstream request"
                )
            })?;
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::debug!(
            method = %method,
            url = %url,
            user = identity.map(|i| i.id.as_str()),
            "Forwarding request upstream"
        );

        let result = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            let headers = relay_headers(response.headers());
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        match result {
            Ok(response) => {
                tracing::debug!(
                    method = %method,
                    url = %url,
                    status = response.status.as_u16(),
                    "Upstream responded"
                );
                Ok(response)
            }
            Err(e) => {
                let error = ForwardError::from_reqwest(&e);
                match &error {
                    ForwardError::Timeout => tracing::warn!(
                        method = %method,
                        url = %url,
                        timeout = ?self.timeout,
                        "Upstream request timed out"
                    ),
                    _ => tracing::error!(
                        method = %method,
                        url = %url,
                        error = %error,
                        "Upstream request failed"
                    ),
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(origin: &str) -> Forwarder {
        Forwarder::new(&Url::parse(origin).unwrap(), Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn composes_origin_and_path() {
        let fwd = forwarder("http://localhost:8000");
        let url = fwd.target_url("jobs/42/status", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/jobs/42/status");
    }

    #[test]
    fn keeps_origin_base_path() {
        let fwd = forwarder("http://aiden.internal/api/");
        let url = fwd.target_url("jobs", None).unwrap();
        assert_eq!(url.as_str(), "http://aiden.internal/api/jobs");
    }

    #[test]
    fn attaches_query_verbatim() {
        let fwd = forwarder("http://localhost:8000");
        let url = fwd.target_url("jobs", Some("tag=a&tag=b&empty=&flag")).unwrap();
        assert_eq!(url.query(), Some("tag=a&tag=b&empty=&flag"));
    }

    #[test]
    fn query_reencodes_only_literal_quote() {
        let fwd = forwarder("http://localhost:8000");
        let url = fwd.target_url("jobs", Some("name=o'brien&q=a%27b")).unwrap();
        assert_eq!(url.query(), Some("name=o%27brien&q=a%27b"));
    }

    #[test]
    fn body_only_for_write_methods() {
        let fwd = forwarder("http://localhost:8000");
        let inbound = InboundRequest {
            body: Bytes::from_static(b"{\"name\":\"nightly\"}"),
            ..Default::default()
        };

        let post = fwd.build_request(&inbound, "jobs", Method::POST, None).unwrap();
        let sent = post.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(sent, b"{\"name\":\"nightly\"}");

        let get = fwd.build_request(&inbound, "jobs", Method::GET, None).unwrap();
        assert!(get.body().is_none());

        let delete = fwd.build_request(&inbound, "jobs/1", Method::DELETE, None).unwrap();
        assert!(delete.body().is_none());
    }

    #[test]
    fn method_is_not_translated() {
        let fwd = forwarder("http://localhost:8000");
        let request = fwd
            .build_request(&InboundRequest::default(), "jobs/1", Method::PATCH, None)
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
    }
}
