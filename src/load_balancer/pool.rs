//! Cluster management.
//!
//! # Responsibilities
//! - Hold the destinations of each cluster
//! - Apply the cluster's load balancing strategy
//! - Hand out guards that track in-flight requests

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ClusterConfig, LoadBalancingPolicy};
use crate::load_balancer::{
    backend::{Destination, DestinationGuard},
    least_conn::LeastConnections,
    round_robin::RoundRobin,
    LoadBalancer,
};

/// One cluster: destinations plus a selection strategy.
#[derive(Debug)]
pub struct Cluster {
    pub id: String,
    destinations: Vec<Arc<Destination>>,
    balancer: Box<dyn LoadBalancer>,
}

impl Cluster {
    pub fn destinations(&self) -> &[Arc<Destination>] {
        &self.destinations
    }

    pub fn policy_name(&self) -> &'static str {
        self.balancer.name()
    }
}

/// Manages clusters and destination selection.
#[derive(Debug, Default)]
pub struct ClusterManager {
    clusters: BTreeMap<String, Cluster>,
}

impl ClusterManager {
    pub fn new(configs: &[ClusterConfig]) -> Self {
        let mut clusters = BTreeMap::new();

        for config in configs {
            let destinations = config
                .destinations
                .iter()
                .filter_map(|address| match address.parse() {
                    Ok(addr) => Some(Arc::new(Destination::new(addr, config.max_connections))),
                    Err(_) => {
                        tracing::warn!(cluster = %config.id, address = %address, "Invalid destination address");
                        None
                    }
                })
                .collect();

            let balancer: Box<dyn LoadBalancer> = match config.load_balancing {
                LoadBalancingPolicy::RoundRobin => Box::new(RoundRobin::new()),
                LoadBalancingPolicy::LeastConnections => Box::new(LeastConnections::new()),
            };

            clusters.insert(
                config.id.clone(),
                Cluster {
                    id: config.id.clone(),
                    destinations,
                    balancer,
                },
            );
        }

        Self { clusters }
    }

    /// Select a destination in the cluster.
    /// Returns a guard that releases the in-flight slot on drop.
    pub fn get(&self, cluster_id: &str) -> Option<DestinationGuard> {
        let Some(cluster) = self.clusters.get(cluster_id) else {
            tracing::debug!(cluster = %cluster_id, "Cluster not found");
            return None;
        };
        match cluster.balancer.next_destination(&cluster.destinations) {
            Some(destination) => destination.try_create_guard(),
            None => {
                tracing::debug!(
                    cluster = %cluster_id,
                    destination_count = cluster.destinations.len(),
                    "No destination with capacity"
                );
                None
            }
        }
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }
}
