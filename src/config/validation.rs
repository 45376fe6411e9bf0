//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (rules reference policies, routes reference clusters)
//! - Validate value ranges (windows > 0, limits >= 1, segments fit the window)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate rate limit policy `{0}`")]
    DuplicatePolicy(String),
    #[error("policy `{0}` has a zero-length window")]
    ZeroWindow(String),
    #[error("policy `{0}` must permit at least one request")]
    ZeroPermitLimit(String),
    #[error("policy `{name}` has {segments} segments, which does not fit its window")]
    InvalidSegments { name: String, segments: u32 },
    #[error("rule for `{prefix}` references unknown policy `{policy}`")]
    UnknownPolicy { prefix: String, policy: String },
    #[error("rule prefix `{0}` must start with '/'")]
    InvalidPrefix(String),
    #[error("route `{route}` references unknown cluster `{cluster}`")]
    UnknownCluster { route: String, cluster: String },
    #[error("cluster `{cluster}` has invalid destination `{address}`")]
    InvalidDestination { cluster: String, address: String },
    #[error("invalid trusted proxy address `{0}`")]
    InvalidTrustedProxy(String),
    #[error("inspection.max_content_length must be greater than zero")]
    ZeroContentLength,
    #[error("rate_limit.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut policy_names = HashSet::new();
    for policy in &config.rate_limit.policies {
        if !policy_names.insert(policy.name.as_str()) {
            errors.push(ValidationError::DuplicatePolicy(policy.name.clone()));
        }
        if policy.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow(policy.name.clone()));
        }
        if policy.permit_limit == 0 {
            errors.push(ValidationError::ZeroPermitLimit(policy.name.clone()));
        }
        // Segments must be at least one millisecond long.
        if policy.segments == 0 || u64::from(policy.segments) > policy.window_secs * 1000 {
            errors.push(ValidationError::InvalidSegments {
                name: policy.name.clone(),
                segments: policy.segments,
            });
        }
    }

    for rule in &config.rate_limit.rules {
        if !rule.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(rule.path_prefix.clone()));
        }
        if !policy_names.contains(rule.policy.as_str()) {
            errors.push(ValidationError::UnknownPolicy {
                prefix: rule.path_prefix.clone(),
                policy: rule.policy.clone(),
            });
        }
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    let cluster_ids: HashSet<&str> = config.clusters.iter().map(|c| c.id.as_str()).collect();
    for route in &config.routes {
        if !cluster_ids.contains(route.cluster.as_str()) {
            errors.push(ValidationError::UnknownCluster {
                route: route.id.clone(),
                cluster: route.cluster.clone(),
            });
        }
    }

    for cluster in &config.clusters {
        for address in &cluster.destinations {
            if address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidDestination {
                    cluster: cluster.id.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    for proxy in &config.listener.trusted_proxies {
        if proxy.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidTrustedProxy(proxy.clone()));
        }
    }

    if config.inspection.max_content_length == 0 {
        errors.push(ValidationError::ZeroContentLength);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
