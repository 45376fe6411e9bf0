//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by admission outcome
//! - `gateway_rejections_total` (counter): rejections by reason
//! - `gateway_flagged_total` (counter): detector hits by category
//! - `gateway_rate_limited_total` (counter): throttled requests by policy
//! - `gateway_upstream_requests_total` (counter): forwards by cluster, status
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency
//! - `gateway_rate_limit_partitions` (gauge): live limiter partitions
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(outcome: &'static str) {
    counter!("gateway_requests_total", "outcome" => outcome).increment(1);
}

/// Count a terminal rejection, from the pipeline or the forward gate.
pub fn record_rejection(reason: &'static str) {
    counter!("gateway_requests_total", "outcome" => "rejected").increment(1);
    counter!("gateway_rejections_total", "reason" => reason).increment(1);
}

pub fn record_flagged(category: &'static str) {
    counter!("gateway_flagged_total", "category" => category).increment(1);
}

pub fn record_rate_limited(policy: &str) {
    counter!("gateway_rate_limited_total", "policy" => policy.to_string()).increment(1);
}

pub fn record_upstream(cluster: &str, status: u16, start: Instant) {
    counter!(
        "gateway_upstream_requests_total",
        "cluster" => cluster.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_upstream_duration_seconds", "cluster" => cluster.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_partitions(count: usize) {
    gauge!("gateway_rate_limit_partitions").set(count as f64);
}
