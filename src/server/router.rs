use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::routing::{MethodRouter, get, on};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;

use crate::proxy::ROUTES;
use crate::server::AppState;
use crate::server::handler::{health, proxy_route};

/// Builds the application router from the static route table.
///
/// Entries sharing an inbound pattern are merged into one method router, so
/// e.g. `GET /jobs` and `POST /jobs` serve the same path and any other verb
/// gets 405.
pub fn build(state: AppState, max_body_bytes: usize) -> Router {
    let mut by_path: BTreeMap<&'static str, MethodRouter<AppState>> = BTreeMap::new();

    for route in ROUTES {
        let handler = move |State(state): State<AppState>, request: Request| {
            proxy_route(route, state, request)
        };
        let method_router = match by_path.remove(route.inbound) {
            Some(existing) => existing.on(route.method.filter(), handler),
            None => on(route.method.filter(), handler),
        };
        by_path.insert(route.inbound, method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
        .route("/healthz", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
