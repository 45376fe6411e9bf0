//! Path to policy selection.
//!
//! # Design Decisions
//! - Bypass list is checked first and always wins
//! - Rules are sorted longest prefix first at construction, so the first
//!   match at request time is the longest one
//! - Prefixes compare case-insensitively on segment boundaries, against
//!   the normalized path (`/health/../api` is selected as `/api`)

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::rate_limit::policy::Policy;
use crate::routing::matcher::{has_path_prefix, matches_any_prefix, normalize_path};

/// Result of looking up the policy for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySelection {
    Limited(Arc<Policy>),
    NoLimit,
}

#[derive(Debug, Clone)]
pub struct PolicySelector {
    bypass_prefixes: Vec<String>,
    rules: Vec<(String, Arc<Policy>)>,
}

impl PolicySelector {
    /// Build from `(prefix, policy)` pairs.
    pub fn new(bypass_prefixes: Vec<String>, rules: Vec<(String, Arc<Policy>)>) -> Self {
        let mut rules = rules;
        rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            bypass_prefixes,
            rules,
        }
    }

    /// Build from config. Rules naming an unknown policy are skipped
    /// (validation reports them before this point).
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let policies: HashMap<&str, Arc<Policy>> = config
            .policies
            .iter()
            .map(|p| (p.name.as_str(), Arc::new(Policy::from_config(p))))
            .collect();

        let rules = config
            .rules
            .iter()
            .filter_map(|rule| match policies.get(rule.policy.as_str()) {
                Some(policy) => Some((rule.path_prefix.clone(), policy.clone())),
                None => {
                    tracing::warn!(prefix = %rule.path_prefix, policy = %rule.policy, "Skipping rule with unknown policy");
                    None
                }
            })
            .collect();

        Self::new(config.bypass_prefixes.clone(), rules)
    }

    pub fn select(&self, path: &str) -> PolicySelection {
        let path = normalize_path(path);
        if matches_any_prefix(&path, &self.bypass_prefixes) {
            return PolicySelection::NoLimit;
        }
        self.rules
            .iter()
            .find(|(prefix, _)| has_path_prefix(&path, prefix))
            .map(|(_, policy)| PolicySelection::Limited(policy.clone()))
            .unwrap_or(PolicySelection::NoLimit)
    }
}
