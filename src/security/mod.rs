//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → https.rs (secure transport or redirect)
//!     → inspection.rs (headers, query, path, declared size)
//!         → patterns.rs (attack signatures)
//!     → Pass to rate limiting
//!
//! Outgoing response:
//!     → headers.rs (security header set, HSTS on HTTPS)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod https;
pub mod inspection;
pub mod patterns;

pub use headers::SecurityHeaders;
pub use https::TransportSecurity;
pub use inspection::RequestInspector;
pub use patterns::{Category, DetectionResult, PatternMatcher};
