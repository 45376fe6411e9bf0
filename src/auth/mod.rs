//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → gate.rs (bypass anonymous paths and upgrade requests)
//!     → authenticator.rs (verify bearer credential)
//!     → Principal attached to request extensions
//!     → Forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: any verification failure ends in 401/403/503
//! - The gate never inspects what the forwarder does with the request

pub mod authenticator;
pub mod gate;

use axum::http::{header, HeaderMap};

pub use authenticator::{AuthError, Authenticator, Principal, StaticTokenAuthenticator};
pub use gate::{forward_gate, ForwardGate};

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
