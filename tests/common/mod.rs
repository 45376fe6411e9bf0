//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use admission_gateway::auth::{AuthError, Authenticator, Principal};
use admission_gateway::config::{GatewayConfig, PolicyConfig, RuleConfig, TokenConfig};
use admission_gateway::http::Forwarder;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const VALID_TOKEN: &str = "valid-token";
pub const REVOKED_TOKEN: &str = "revoked-token";

/// Forwarder that counts calls and answers 200.
#[derive(Default)]
pub struct CountingForwarder {
    calls: AtomicUsize,
}

impl CountingForwarder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Forwarder for CountingForwarder {
    async fn forward(&self, _request: Request<Body>) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        "forwarded".into_response()
    }
}

/// Authenticator that knows two fixed tokens.
pub struct MockAuthenticator;

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Principal, AuthError> {
        match credential {
            VALID_TOKEN => Ok(Principal::new("alice")),
            REVOKED_TOKEN => Err(AuthError::Forbidden),
            _ => Err(AuthError::Invalid),
        }
    }
}

/// Dev-mode config with a `{60s, 10, 2}` policy on `/api`.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.dev_mode = true;
    config.rate_limit.policies.push(PolicyConfig {
        name: "api".to_string(),
        window_secs: 60,
        permit_limit: 10,
        segments: 2,
    });
    config.rate_limit.rules.push(RuleConfig {
        path_prefix: "/api".to_string(),
        policy: "api".to_string(),
    });
    config.auth.tokens.push(TokenConfig {
        token: VALID_TOKEN.to_string(),
        subject: "alice".to_string(),
        disabled: false,
    });
    config
}

pub fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header(header::AUTHORIZATION, format!("Bearer {VALID_TOKEN}"))
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a mock backend on an ephemeral port. It answers 200 with the
/// received request head as the body.
pub async fn start_echo_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let body = String::from_utf8_lossy(&head).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}
