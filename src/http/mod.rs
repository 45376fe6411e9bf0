//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → [admission pipeline]
//!     → [forward gate]
//!     → forward.rs (route, pick destination, one upstream attempt)
//!     → Send to client
//! ```

pub mod forward;
pub mod server;

pub use forward::{ForwardError, Forwarder, UpstreamForwarder, X_GATEWAY_SUBJECT};
pub use server::{build_router, GatewayServer};
