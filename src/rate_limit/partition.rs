//! Partition key resolution.
//!
//! Precedence, first available wins:
//! 1. `sub:<subject>` of a principal already attached to the request
//! 2. `tok:<fingerprint>` of a presented but unverified bearer token
//! 3. `ip:<address>` of the remote peer
//! 4. `anonymous`

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use sha2::{Digest, Sha256};

use crate::auth::{bearer_token, Principal};

pub const ANONYMOUS: &str = "anonymous";

/// Derives the identity string requests are counted under.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionKeyResolver;

impl PartitionKeyResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve<B>(&self, req: &Request<B>) -> String {
        if let Some(principal) = req.extensions().get::<Principal>() {
            return format!("sub:{}", principal.subject);
        }
        if let Some(token) = bearer_token(req.headers()) {
            return format!("tok:{}", token_fingerprint(token));
        }
        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return format!("ip:{}", addr.ip());
        }
        ANONYMOUS.to_string()
    }
}

/// Stable, non-reversible stand-in for a raw token (first 16 bytes of its
/// SHA-256, hex encoded).
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..16])
}
