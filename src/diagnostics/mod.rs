//! Read-only diagnostics surface.
//!
//! `GET /health`, `GET /_gateway/routes`, `GET /_gateway/clusters`. All
//! three are on the default inspection and rate-limit bypass lists and never
//! go through the forward gate.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::load_balancer::ClusterManager;
use crate::routing::RouteTable;

use self::handlers::{get_clusters, get_health, get_routes};

#[derive(Clone)]
pub struct DiagnosticsState {
    pub routes: Arc<RouteTable>,
    pub clusters: Arc<ClusterManager>,
}

pub fn diagnostics_router<S>(state: DiagnosticsState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(get_health))
        .route("/_gateway/routes", get(get_routes))
        .route("/_gateway/clusters", get(get_clusters))
        .with_state(state)
}
