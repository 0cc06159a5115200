use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::identity::RemoteVerifier;
use crate::proxy::Forwarder;
use crate::server::{AppState, router};

/// Serves the proxy on `cfg.listen_addr` until `shutdown` resolves.
pub async fn run<F>(cfg: &Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let forwarder = Forwarder::new(&cfg.upstream_url, cfg.request_timeout())
        .context("Failed to build upstream client")?;
    let verifier = RemoteVerifier::new(cfg.identity_url.clone())
        .context("Failed to build identity client")?;

    let state = AppState::new(forwarder, Arc::new(verifier));
    let app = router::build(state, cfg.max_body_bytes);

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;
    info!(
        listen = %cfg.listen_addr,
        upstream = %cfg.upstream_url,
        identity = %cfg.identity_url,
        "Listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
