//! Mock upstream shared by the integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// Spawns an upstream on an ephemeral port and returns its origin.
///
/// Known paths answer with fixed responses; any other request is echoed
/// back as JSON describing what arrived.
pub async fn spawn_upstream() -> Url {
    let app = Router::new()
        .route("/jobs/42/status", get(job_status))
        .route("/jobs/missing", get(missing))
        .route("/jobs/locked", get(locked))
        .route("/jobs/slow", get(slow))
        .route("/jobs/moved", get(moved))
        .fallback(echo);

    let addr = serve(app).await;
    Url::parse(&format!("http://{addr}")).unwrap()
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An origin nothing listens on.
pub fn closed_origin() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

async fn job_status() -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"state":"running"}"#,
    )
        .into_response()
}

async fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "no such job",
    )
        .into_response()
}

async fn locked() -> Response {
    (
        StatusCode::FORBIDDEN,
        [
            (header::CONTENT_TYPE, "application/problem+json"),
            (header::HeaderName::from_static("x-upstream"), "aiden"),
        ],
        r#"{"detail":"forbidden"}"#,
    )
        .into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late".into_response()
}

async fn moved() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/jobs/elsewhere")]).into_response()
}

async fn echo(request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let headers = header_pairs(request.headers());
    let body: Bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();

    axum::Json(json!({
        "method": method,
        "path": path,
        "query": query,
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
        .collect()
}

/// Values of `name` in an echoed request, in arrival order.
pub fn echoed_header<'a>(echo: &'a Value, name: &str) -> Vec<&'a str> {
    echo["headers"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|pair| pair[0] == name)
        .map(|pair| pair[1].as_str().unwrap())
        .collect()
}
