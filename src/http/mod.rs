//! HTTP plumbing shared by the server and the forwarder.
//!
//! - **`headers`**: which headers cross the proxy in each direction, and the
//!   `X-User-*` identity headers injected on the way out
//! - **`response`**: JSON error bodies returned when the proxy itself answers

pub mod headers;
pub mod response;
