//! Authenticating forward gate.
//!
//! Sits between the admission pipeline and the forwarder. Anonymous paths
//! and protocol upgrades on the upgrade prefixes pass straight through;
//! everything else needs a verified bearer credential.
//!
//! Anything reaching the forwarder under an inspection allow-list prefix
//! skipped the detector during admission, so it is fully inspected here.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};

use crate::auth::{bearer_token, AuthError, Authenticator};
use crate::config::AuthConfig;
use crate::http::forward::Forwarder;
use crate::observability::metrics;
use crate::pipeline::Rejection;
use crate::routing::{matches_any_prefix, normalize_path};
use crate::security::{Category, DetectionResult, RequestInspector};

pub struct ForwardGate {
    authenticator: Arc<dyn Authenticator>,
    forwarder: Arc<dyn Forwarder>,
    realm: String,
    anonymous_prefixes: Vec<String>,
    upgrade_prefixes: Vec<String>,
    inspector: Option<RequestInspector>,
}

impl ForwardGate {
    pub fn new(
        config: &AuthConfig,
        authenticator: Arc<dyn Authenticator>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            authenticator,
            forwarder,
            realm: config.realm.clone(),
            anonymous_prefixes: config.anonymous_prefixes.clone(),
            upgrade_prefixes: config.upgrade_prefixes.clone(),
            inspector: None,
        }
    }

    /// Inspect forwarded requests that matched the inspector's allow-list.
    pub fn with_inspector(mut self, inspector: RequestInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Whether the request skips authentication.
    pub fn bypasses<B>(&self, req: &Request<B>) -> bool {
        let path = normalize_path(req.uri().path());
        matches_any_prefix(&path, &self.anonymous_prefixes)
            || (is_upgrade(req.headers()) && matches_any_prefix(&path, &self.upgrade_prefixes))
    }

    /// Flag found on a request that skipped inspection during admission.
    fn screen<B>(&self, req: &Request<B>) -> Option<Category> {
        let inspector = self.inspector.as_ref()?;
        if !inspector.is_bypassed(req) {
            return None;
        }
        match inspector.inspect_contents(req) {
            DetectionResult::Flagged(category) => Some(category),
            DetectionResult::Clean => None,
        }
    }

    pub async fn handle(&self, mut request: Request<Body>) -> Response {
        if let Some(category) = self.screen(&request) {
            tracing::warn!(
                category = %category,
                path = %request.uri().path(),
                "Malicious input on allow-listed path"
            );
            metrics::record_flagged(category.as_str());
            let rejection = Rejection::MalformedInput(category);
            metrics::record_rejection(rejection.reason());
            return rejection.into_response();
        }

        if self.bypasses(&request) {
            tracing::debug!(path = %request.uri().path(), "Authentication bypassed");
            return self.forwarder.forward(request).await;
        }

        let token = bearer_token(request.headers()).map(str::to_owned);
        let result = match token {
            Some(token) => self.authenticator.authenticate(&token).await,
            None => Err(AuthError::Missing),
        };

        match result {
            Ok(principal) => {
                tracing::debug!(subject = %principal.subject, "Authenticated");
                request.extensions_mut().insert(principal);
                self.forwarder.forward(request).await
            }
            Err(e) => {
                let rejection = self.rejection_for(&e);
                tracing::warn!(
                    path = %request.uri().path(),
                    error = %e,
                    "Authentication failed"
                );
                metrics::record_rejection(rejection.reason());
                rejection.into_response()
            }
        }
    }

    fn rejection_for(&self, error: &AuthError) -> Rejection {
        match error {
            AuthError::Missing => Rejection::Unauthenticated {
                realm: self.realm.clone(),
                token_presented: false,
            },
            AuthError::Invalid => Rejection::Unauthenticated {
                realm: self.realm.clone(),
                token_presented: true,
            },
            AuthError::Forbidden => Rejection::Unauthorized,
            AuthError::Unavailable(_) => Rejection::AuthUnavailable,
        }
    }
}

/// `Upgrade` header present, or `Connection` lists `upgrade`.
fn is_upgrade(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
        || headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Fallback handler forwarding through the gate.
pub async fn forward_gate(State(gate): State<Arc<ForwardGate>>, request: Request<Body>) -> Response {
    gate.handle(request).await
}
