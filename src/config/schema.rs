//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, transport security).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Malicious-input inspection settings.
    pub inspection: InspectionConfig,

    /// Rate limiting policies and path rules.
    pub rate_limit: RateLimitConfig,

    /// Forward gate authentication settings.
    pub auth: AuthConfig,

    /// Outbound security headers.
    pub headers: SecurityHeadersConfig,

    /// Route definitions mapping request paths to clusters.
    pub routes: Vec<RouteConfig>,

    /// Upstream cluster definitions.
    pub clusters: Vec<ClusterConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Local/dev mode. Disables the HTTPS redirect stage entirely.
    pub dev_mode: bool,

    /// Port used when building HTTPS redirect targets. `None` keeps the
    /// default port (443).
    pub https_port: Option<u16>,

    /// Peers allowed to attest secure transport via `X-Forwarded-Proto`.
    pub trusted_proxies: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            dev_mode: false,
            https_port: None,
            trusted_proxies: vec!["127.0.0.1".to_string(), "::1".to_string()],
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Malicious-input inspection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Path prefixes that skip inspection (health and introspection).
    pub bypass_prefixes: Vec<String>,

    /// Header names whose mere presence rejects the request.
    pub denied_headers: Vec<String>,

    /// Maximum declared Content-Length in bytes.
    pub max_content_length: u64,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            bypass_prefixes: vec!["/health".to_string(), "/_gateway".to_string()],
            denied_headers: vec![
                "x-original-url".to_string(),
                "x-rewrite-url".to_string(),
                "x-http-method-override".to_string(),
                "x-http-method".to_string(),
                "x-method-override".to_string(),
            ],
            max_content_length: 50 * 1024 * 1024, // 50 MiB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// How often idle counter state is swept, in seconds.
    pub sweep_interval_secs: u64,

    /// Paths that are never limited (checked before prefix rules).
    pub bypass_prefixes: Vec<String>,

    /// Named policies.
    pub policies: Vec<PolicyConfig>,

    /// Path prefix to policy bindings. Longest prefix wins.
    pub rules: Vec<RuleConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 30,
            bypass_prefixes: vec![
                "/health".to_string(),
                "/_gateway".to_string(),
                "/api/auth/token".to_string(),
            ],
            policies: vec![
                PolicyConfig {
                    name: "global".to_string(),
                    window_secs: 60,
                    permit_limit: 100,
                    segments: 6,
                },
                PolicyConfig {
                    name: "auth".to_string(),
                    window_secs: 60,
                    permit_limit: 10,
                    segments: 2,
                },
            ],
            rules: vec![
                RuleConfig {
                    path_prefix: "/".to_string(),
                    policy: "global".to_string(),
                },
                RuleConfig {
                    path_prefix: "/api/auth".to_string(),
                    policy: "auth".to_string(),
                },
            ],
        }
    }
}

/// A named sliding-window policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Policy identifier, referenced by rules.
    pub name: String,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum admissions per window.
    pub permit_limit: u32,

    /// Number of segments the window is split into.
    #[serde(default = "default_segments")]
    pub segments: u32,
}

fn default_segments() -> u32 {
    1
}

/// Binds a path prefix to a policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Path prefix (case-insensitive).
    pub path_prefix: String,

    /// Name of the policy to apply.
    pub policy: String,
}

/// Forward gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Realm advertised in `WWW-Authenticate` challenges.
    pub realm: String,

    /// Paths forwarded without credentials (credential issuance).
    pub anonymous_prefixes: Vec<String>,

    /// Paths on which protocol-upgrade requests skip authentication.
    pub upgrade_prefixes: Vec<String>,

    /// Static bearer tokens accepted by the built-in authenticator.
    pub tokens: Vec<TokenConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            realm: "gateway".to_string(),
            anonymous_prefixes: vec!["/api/auth".to_string()],
            upgrade_prefixes: vec!["/ws".to_string(), "/hubs".to_string()],
            tokens: Vec::new(),
        }
    }
}

/// A static bearer token and the subject it identifies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub token: String,
    pub subject: String,

    /// Known but refused (results in 403 rather than 401).
    #[serde(default)]
    pub disabled: bool,
}

/// Outbound security header values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    pub content_security_policy: String,
    pub permissions_policy: String,
    pub hsts_max_age_secs: u64,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            content_security_policy: "default-src 'self'; frame-ancestors 'none'; object-src 'none'"
                .to_string(),
            permissions_policy: "camera=(), microphone=(), geolocation=(), payment=()".to_string(),
            hsts_max_age_secs: 31_536_000, // 1 year
        }
    }
}

/// Route configuration mapping requests to clusters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/diagnostics.
    pub id: String,

    /// Cluster to forward to.
    pub cluster: String,

    /// Path prefix to match.
    pub path_prefix: String,

    /// Allowed methods. Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// A set of interchangeable upstream destinations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Unique cluster identifier.
    pub id: String,

    /// Destination addresses (e.g., "127.0.0.1:3000").
    pub destinations: Vec<String>,

    /// Maximum concurrent requests per destination.
    #[serde(default = "default_max_destination_conns")]
    pub max_connections: usize,

    /// Destination selection strategy.
    #[serde(default)]
    pub load_balancing: LoadBalancingPolicy,
}

/// Destination selection strategy for a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingPolicy {
    #[default]
    RoundRobin,
    LeastConnections,
}

fn default_max_destination_conns() -> usize {
    100
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
