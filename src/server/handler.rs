use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::proxy::{InboundRequest, RouteDescriptor};
use crate::server::AppState;

/// Handles one request for `route`: authenticate, then forward.
pub async fn proxy_route(
    route: &'static RouteDescriptor,
    state: AppState,
    request: Request,
) -> Response {
    let identity = match state.verifier.verify(request.headers()).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    let Some(upstream_path) = route.upstream_path(request.uri().path()) else {
        tracing::warn!(
            route = route.name,
            path = %request.uri().path(),
            "Path did not match route pattern"
        );
        return StatusCode::NOT_FOUND.into_response();
    };

    let method = route.method.as_method();
    let inbound = match InboundRequest::read(request, &method).await {
        Ok(inbound) => inbound,
        Err(rejection) => return rejection.into_response(),
    };

    tracing::debug!(
        route = route.name,
        user = %identity.id,
        upstream = %upstream_path,
        "Proxying request"
    );

    match state
        .forwarder
        .forward(inbound, &upstream_path, method, Some(&identity))
        .await
    {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}
