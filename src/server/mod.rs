//! HTTP server: route registration, the shared route handler and the
//! listener loop.

pub mod handler;
pub mod listener;
pub mod router;

use std::sync::Arc;

use crate::identity::IdentityVerifier;
use crate::proxy::Forwarder;

/// State shared by every route handler. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(forwarder: Forwarder, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            forwarder,
            verifier,
        }
    }
}
