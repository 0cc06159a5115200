//! Reverse proxy functionality
//!
//! This module holds the static route table and the forwarder that relays
//! each routed request to the upstream origin.

pub mod error;
pub mod forwarder;
pub mod routes;

pub use error::ForwardError;
pub use forwarder::{Forwarder, InboundRequest, UpstreamResponse};
pub use routes::{ROUTES, RouteDescriptor, RouteMethod};
