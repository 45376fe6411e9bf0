//! Terminal rejections and their HTTP responses.
//!
//! Every rejection becomes a well-formed response here; none of them
//! propagate as errors out of the pipeline.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::security::patterns::Category;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Why a request was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Plain-HTTP request outside dev mode.
    HttpsRequired { location: String },
    /// Flagged by the malicious-input detector.
    MalformedInput(Category),
    /// Over the policy's permit limit.
    RateLimited {
        policy: String,
        limit: u32,
        retry_after: Duration,
    },
    /// No or invalid credential.
    Unauthenticated { realm: String, token_presented: bool },
    /// Valid credential that is not allowed through.
    Unauthorized,
    /// The authentication collaborator could not answer.
    AuthUnavailable,
}

impl Rejection {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::HttpsRequired { .. } => "https_required",
            Rejection::MalformedInput(Category::Oversize) => "oversize",
            Rejection::MalformedInput(_) => "malformed_input",
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::Unauthenticated { .. } => "unauthenticated",
            Rejection::Unauthorized => "unauthorized",
            Rejection::AuthUnavailable => "auth_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::HttpsRequired { .. } => StatusCode::PERMANENT_REDIRECT,
            Rejection::MalformedInput(Category::Oversize) => StatusCode::PAYLOAD_TOO_LARGE,
            Rejection::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Rejection::Unauthorized => StatusCode::FORBIDDEN,
            Rejection::AuthUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Whole seconds, rounded up, never below one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Rejection::HttpsRequired { location } => {
                let mut response = status.into_response();
                if let Ok(value) = HeaderValue::from_str(&location) {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                response
            }
            Rejection::MalformedInput(category) => {
                let message = match category {
                    Category::Oversize => "Request payload exceeds the maximum allowed size.",
                    _ => "Request contains potentially malicious content.",
                };
                let error = match category {
                    Category::Oversize => "Payload too large",
                    _ => "Bad request",
                };
                (
                    status,
                    Json(json!({
                        "error": error,
                        "message": message,
                        "category": category,
                    })),
                )
                    .into_response()
            }
            Rejection::RateLimited {
                limit, retry_after, ..
            } => {
                let secs = retry_after_secs(retry_after);
                let reset = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs()
                    + secs;
                let mut response = (
                    status,
                    Json(json!({
                        "error": "Rate limit exceeded",
                        "message": "Too many requests. Please try again later.",
                        "retryAfterSeconds": secs,
                    })),
                )
                    .into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
                headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
                response
            }
            Rejection::Unauthenticated {
                realm,
                token_presented,
            } => {
                let challenge = if token_presented {
                    format!("Bearer realm=\"{}\", error=\"invalid_token\"", realm)
                } else {
                    format!("Bearer realm=\"{}\"", realm)
                };
                let mut response = (
                    status,
                    Json(json!({
                        "error": "Unauthorized",
                        "message": "A valid bearer token is required.",
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                }
                response
            }
            Rejection::Unauthorized => (
                status,
                Json(json!({
                    "error": "Forbidden",
                    "message": "The presented credential is not permitted.",
                })),
            )
                .into_response(),
            Rejection::AuthUnavailable => (
                status,
                Json(json!({
                    "error": "Service unavailable",
                    "message": "Authentication is temporarily unavailable.",
                })),
            )
                .into_response(),
        }
    }
}
