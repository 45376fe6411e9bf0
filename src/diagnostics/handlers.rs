use axum::{extract::State, Json};
use serde::Serialize;

use crate::diagnostics::DiagnosticsState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub route_id: String,
    pub cluster_id: String,
    pub path: String,
    pub methods: Vec<String>,
    pub priority: u32,
}

#[derive(Debug, Serialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub destination_count: usize,
    pub load_balancing_policy: &'static str,
    pub destinations: Vec<String>,
}

pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

pub async fn get_routes(State(state): State<DiagnosticsState>) -> Json<Vec<RouteInfo>> {
    let routes = state
        .routes
        .routes()
        .iter()
        .map(|r| RouteInfo {
            route_id: r.id.clone(),
            cluster_id: r.cluster.clone(),
            path: r.path_prefix().to_string(),
            methods: r.methods(),
            priority: r.priority,
        })
        .collect();
    Json(routes)
}

pub async fn get_clusters(State(state): State<DiagnosticsState>) -> Json<Vec<ClusterInfo>> {
    let clusters = state
        .clusters
        .clusters()
        .map(|c| ClusterInfo {
            cluster_id: c.id.clone(),
            destination_count: c.destinations().len(),
            load_balancing_policy: c.policy_name(),
            destinations: c.destinations().iter().map(|d| d.addr.to_string()).collect(),
        })
        .collect();
    Json(clusters)
}
