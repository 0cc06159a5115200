//! Aiden Proxy - authenticated reverse proxy for the Aiden jobs API
//!
//! Routes a fixed set of job, orientation and governance endpoints to a single
//! upstream origin, attaching the verified caller's identity as headers.

pub mod config;
pub mod http;
pub mod identity;
pub mod proxy;
pub mod server;
