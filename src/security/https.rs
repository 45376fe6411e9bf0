//! Transport security checks.
//!
//! # Responsibilities
//! - Decide whether a request arrived over HTTPS
//! - Build the HTTPS equivalent of a plain-HTTP URL for redirects
//!
//! # Design Decisions
//! - `X-Forwarded-Proto` is only believed from configured trusted proxies
//! - Requests without connection info (in-process callers) are never trusted

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::uri::Scheme;
use axum::http::{header, HeaderName, Request};

use crate::config::ListenerConfig;

pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

#[derive(Debug, Clone, Default)]
pub struct TransportSecurity {
    trusted_proxies: Vec<IpAddr>,
    https_port: Option<u16>,
}

impl TransportSecurity {
    pub fn new(trusted_proxies: Vec<IpAddr>, https_port: Option<u16>) -> Self {
        Self {
            trusted_proxies,
            https_port,
        }
    }

    pub fn from_config(config: &ListenerConfig) -> Self {
        let trusted = config
            .trusted_proxies
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect();
        Self::new(trusted, config.https_port)
    }

    /// True if the request used HTTPS, directly or via a trusted proxy.
    pub fn is_secure<B>(&self, req: &Request<B>) -> bool {
        if req.uri().scheme() == Some(&Scheme::HTTPS) {
            return true;
        }
        let forwarded_https = req
            .headers()
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);
        forwarded_https && self.from_trusted_proxy(req)
    }

    fn from_trusted_proxy<B>(&self, req: &Request<B>) -> bool {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| self.trusted_proxies.contains(&addr.ip()))
            .unwrap_or(false)
    }

    /// The `https://` form of the request URL, or `None` without a host.
    pub fn redirect_location<B>(&self, req: &Request<B>) -> Option<String> {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| req.uri().authority().map(|a| a.to_string()))?;
        let host = strip_port(&host);
        if host.is_empty() {
            return None;
        }

        let authority = match self.https_port {
            Some(port) if port != 443 => format!("{}:{}", host, port),
            _ => host.to_string(),
        };
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Some(format!("https://{}{}", authority, path_and_query))
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal keeps its colons.
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split(':').next().unwrap_or(host)
}
