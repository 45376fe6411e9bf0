//! API gateway admission core.
//!
//! Every inbound request passes an ordered admission pipeline (HTTPS
//! enforcement, malicious-input detection, sliding-window rate limiting)
//! and then an authenticating forward gate before it reaches the
//! forwarding engine.

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod pipeline;
pub mod rate_limit;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
