//! Malicious-input detection for whole requests.
//!
//! # Responsibilities
//! - Skip allow-listed health and introspection paths, matched on the
//!   normalized path so dot segments cannot reach into the allow-list
//! - Reject header-spoofing vectors by name
//! - Run every query value through the pattern matcher
//! - Check the decoded path for traversal
//! - Enforce the declared Content-Length ceiling
//!
//! # Design Decisions
//! - Fixed check order; the first flag wins and scanning stops
//! - Detect and reject only, the request is never rewritten
//! - Only the declared length is checked; the body is never read here

use std::sync::Arc;

use axum::http::{header, HeaderName, Request};
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::config::InspectionConfig;
use crate::routing::matcher::{matches_any_prefix, normalize_path};
use crate::security::patterns::{has_control_byte, Category, DetectionResult, PatternMatcher};

/// Applies the pattern matcher and size ceiling to inbound requests.
#[derive(Debug, Clone)]
pub struct RequestInspector {
    matcher: Arc<PatternMatcher>,
    bypass_prefixes: Vec<String>,
    denied_headers: Vec<HeaderName>,
    max_content_length: u64,
}

impl RequestInspector {
    pub fn new(config: &InspectionConfig, matcher: Arc<PatternMatcher>) -> Self {
        let denied_headers = config
            .denied_headers
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) {
                Ok(h) => Some(h),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid denied header name");
                    None
                }
            })
            .collect();

        Self {
            matcher,
            bypass_prefixes: config.bypass_prefixes.clone(),
            denied_headers,
            max_content_length: config.max_content_length,
        }
    }

    /// Whether the request falls under an allow-listed prefix.
    pub fn is_bypassed<B>(&self, req: &Request<B>) -> bool {
        matches_any_prefix(&normalize_path(req.uri().path()), &self.bypass_prefixes)
    }

    /// Inspect a request. Returns the first flag found.
    pub fn inspect<B>(&self, req: &Request<B>) -> DetectionResult {
        // 1. Allow-listed paths
        if self.is_bypassed(req) {
            return DetectionResult::Clean;
        }
        self.inspect_contents(req)
    }

    /// Every check except the allow-list.
    pub fn inspect_contents<B>(&self, req: &Request<B>) -> DetectionResult {
        let path = req.uri().path();

        // 2. Spoofing headers
        if let Some(name) = self.denied_headers.iter().find(|h| req.headers().contains_key(*h)) {
            tracing::debug!(header = %name, "Denied header present");
            return DetectionResult::Flagged(Category::Header);
        }

        // 3. Query parameters
        if let Some(query) = req.uri().query() {
            if let flagged @ DetectionResult::Flagged(_) = self.inspect_query(query) {
                return flagged;
            }
        }

        // 4. Decoded path
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        if has_control_byte(&decoded) {
            return DetectionResult::Flagged(Category::ControlByte);
        }
        if self.matcher.is_traversal(&decoded) {
            return DetectionResult::Flagged(Category::Traversal);
        }

        // 5. Declared size
        if let Some(len) = declared_content_length(req) {
            if len > self.max_content_length {
                return DetectionResult::Flagged(Category::Oversize);
            }
        }

        DetectionResult::Clean
    }

    fn inspect_query(&self, query: &str) -> DetectionResult {
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            if has_control_byte(&name) {
                return DetectionResult::Flagged(Category::ControlByte);
            }
            if let flagged @ DetectionResult::Flagged(_) = self.matcher.classify(&value) {
                return flagged;
            }
        }
        DetectionResult::Clean
    }

}

fn declared_content_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
