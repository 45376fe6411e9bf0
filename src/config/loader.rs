//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LoadBalancingPolicy;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.inspection.max_content_length, 50 * 1024 * 1024);
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [listener]
            bind_address = "127.0.0.1:9000"
            dev_mode = true

            [rate_limit]
            policies = [{ name = "api", window_secs = 60, permit_limit = 10, segments = 2 }]
            rules = [{ path_prefix = "/api", policy = "api" }]

            [[auth.tokens]]
            token = "secret"
            subject = "alice"

            [[clusters]]
            id = "backend"
            destinations = ["127.0.0.1:3000", "127.0.0.1:3001"]
            load_balancing = "least_connections"

            [[routes]]
            id = "api-route"
            cluster = "backend"
            path_prefix = "/api"
            methods = ["GET", "POST"]
        "#;

        let config = parse_config(toml).unwrap();
        assert!(config.listener.dev_mode);
        assert_eq!(config.rate_limit.policies.len(), 1);
        assert_eq!(config.rate_limit.policies[0].segments, 2);
        assert_eq!(config.auth.tokens[0].subject, "alice");
        assert!(!config.auth.tokens[0].disabled);
        assert_eq!(config.clusters[0].max_connections, 100);
        assert_eq!(config.clusters[0].load_balancing, LoadBalancingPolicy::LeastConnections);
        assert_eq!(config.routes[0].methods, vec!["GET", "POST"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let toml = r#"
            [rate_limit]
            policies = []
            rules = [{ path_prefix = "/api", policy = "nope" }]
        "#;
        match parse_config(toml) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }
}
