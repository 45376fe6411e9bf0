//! Security response headers.
//!
//! # Responsibilities
//! - Stamp a fixed security header set on every outbound response
//! - Add Strict-Transport-Security only when the request arrived over HTTPS
//!
//! # Design Decisions
//! - Values are validated once at startup; stamping is infallible
//! - Headers are inserted (overwriting upstream values), never appended

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SecurityHeadersConfig;

/// Pre-built header values applied on the way out.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    content_security_policy: Option<HeaderValue>,
    permissions_policy: Option<HeaderValue>,
    strict_transport_security: HeaderValue,
}

impl SecurityHeaders {
    pub fn new(config: &SecurityHeadersConfig) -> Self {
        Self {
            content_security_policy: header_value("content-security-policy", &config.content_security_policy),
            permissions_policy: header_value("permissions-policy", &config.permissions_policy),
            strict_transport_security: HeaderValue::from_str(&format!(
                "max-age={}; includeSubDomains",
                config.hsts_max_age_secs
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("max-age=31536000; includeSubDomains")),
        }
    }

    pub fn apply(&self, headers: &mut HeaderMap, secure: bool) {
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        if let Some(csp) = &self.content_security_policy {
            headers.insert(header::CONTENT_SECURITY_POLICY, csp.clone());
        }
        if let Some(policy) = &self.permissions_policy {
            headers.insert("permissions-policy", policy.clone());
        }
        if secure {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, self.strict_transport_security.clone());
        }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new(&SecurityHeadersConfig::default())
    }
}

fn header_value(name: &str, value: &str) -> Option<HeaderValue> {
    if value.is_empty() {
        return None;
    }
    match HeaderValue::from_str(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(header = name, error = %e, "Invalid security header value, header disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_http_has_no_hsts() {
        let mut headers = HeaderMap::new();
        SecurityHeaders::default().apply(&mut headers, false);

        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(headers.contains_key("permissions-policy"));
        assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn test_https_adds_hsts() {
        let mut headers = HeaderMap::new();
        SecurityHeaders::default().apply(&mut headers, true);
        assert_eq!(
            headers[header::STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[test]
    fn test_empty_policy_is_omitted() {
        let config = SecurityHeadersConfig {
            content_security_policy: String::new(),
            ..SecurityHeadersConfig::default()
        };
        let mut headers = HeaderMap::new();
        SecurityHeaders::new(&config).apply(&mut headers, false);
        assert!(!headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }
}
