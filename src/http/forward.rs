//! Forwarding to upstream clusters.
//!
//! # Responsibilities
//! - Define the `Forwarder` seam the forward gate hands admitted requests to
//! - Default implementation: route lookup, destination selection, one
//!   upstream attempt
//!
//! # Design Decisions
//! - No retries; a failed attempt is a 502
//! - The authenticated subject is passed upstream in `x-gateway-subject`;
//!   a client-supplied value is always dropped

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderName, HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::auth::Principal;
use crate::load_balancer::ClusterManager;
use crate::observability::metrics;
use crate::routing::RouteTable;

pub const X_GATEWAY_SUBJECT: HeaderName = HeaderName::from_static("x-gateway-subject");

/// Hop-by-hop headers that are not forwarded.
const HOP_BY_HOP: [HeaderName; 5] = [
    header::CONNECTION,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Downstream collaborator receiving admitted, authenticated requests.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>) -> Response;
}

/// Forwards to the cluster of the first matching route.
pub struct UpstreamForwarder {
    routes: Arc<RouteTable>,
    clusters: Arc<ClusterManager>,
    client: Client<HttpConnector, Body>,
}

impl UpstreamForwarder {
    pub fn new(routes: Arc<RouteTable>, clusters: Arc<ClusterManager>, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            routes,
            clusters,
            client,
        }
    }
}

/// Why a request could not be forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("no route matches {0}")]
    NoRoute(String),
    #[error("no destination available in cluster {0}")]
    NoDestination(String),
    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::NoRoute(_) => StatusCode::NOT_FOUND,
            ForwardError::NoDestination(_) => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::InvalidRequest(_) | ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let message = match self {
            ForwardError::NoRoute(_) => "No matching route found",
            ForwardError::NoDestination(_) => "No upstream destination available",
            ForwardError::InvalidRequest(_) | ForwardError::Upstream(_) => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}

impl UpstreamForwarder {
    async fn try_forward(&self, request: Request<Body>, start: Instant) -> Result<Response, ForwardError> {
        let path = request.uri().path().to_string();

        let route = self
            .routes
            .match_request(&request)
            .ok_or_else(|| ForwardError::NoRoute(path.clone()))?;
        let cluster = route.cluster.as_str();

        let destination = self
            .clusters
            .get(cluster)
            .ok_or_else(|| ForwardError::NoDestination(cluster.to_string()))?;

        let request = rewrite(request, &destination.addr.to_string())?;

        tracing::debug!(route = %route.id, destination = %destination.addr, path = %path, "Forwarding request");

        let response = self.client.request(request).await.map_err(|e| {
            tracing::error!(destination = %destination.addr, error = %e, "Upstream error");
            metrics::record_upstream(cluster, 502, start);
            e
        })?;
        metrics::record_upstream(cluster, response.status().as_u16(), start);

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[async_trait]
impl Forwarder for UpstreamForwarder {
    async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        match self.try_forward(request, start).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Request not forwarded");
                e.into_response()
            }
        }
    }
}

/// Point the request at `authority`, strip hop-by-hop headers and stamp
/// the authenticated subject.
fn rewrite(request: Request<Body>, authority: &str) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(Authority::from_str(authority)?);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some("/".parse()?);
    }
    parts.uri = Uri::from_parts(uri_parts)?;

    for name in HOP_BY_HOP.iter() {
        parts.headers.remove(name);
    }
    parts.headers.remove(&X_GATEWAY_SUBJECT);
    if let Some(principal) = parts.extensions.get::<Principal>() {
        if let Ok(value) = HeaderValue::from_str(&principal.subject) {
            parts.headers.insert(X_GATEWAY_SUBJECT, value);
        }
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_targets_destination() {
        let mut request = Request::get("/api/users?page=2")
            .header(X_GATEWAY_SUBJECT, "spoofed")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(Principal::new("alice"));

        let rewritten = rewrite(request, "127.0.0.1:3000").unwrap();
        assert_eq!(rewritten.uri().to_string(), "http://127.0.0.1:3000/api/users?page=2");
        assert_eq!(rewritten.headers()[&X_GATEWAY_SUBJECT], "alice");
        assert!(rewritten.headers().get(header::CONNECTION).is_none());
    }

    #[test]
    fn test_rewrite_drops_client_subject_without_principal() {
        let request = Request::get("/x")
            .header(X_GATEWAY_SUBJECT, "spoofed")
            .body(Body::empty())
            .unwrap();
        let rewritten = rewrite(request, "127.0.0.1:3000").unwrap();
        assert!(rewritten.headers().get(&X_GATEWAY_SUBJECT).is_none());
    }

    #[test]
    fn test_error_status() {
        assert_eq!(ForwardError::NoRoute("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ForwardError::NoDestination("web".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_no_route_is_not_found() {
        let forwarder = UpstreamForwarder::new(
            Arc::new(RouteTable::default()),
            Arc::new(ClusterManager::default()),
            Duration::from_secs(1),
        );
        let response = forwarder
            .forward(Request::get("/nothing").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
