//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Destination, LoadBalancer};

/// Least connections selector.
/// Selects the destination with the fewest in-flight requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn name(&self) -> &'static str {
        "least_connections"
    }

    fn next_destination(&self, destinations: &[Arc<Destination>]) -> Option<Arc<Destination>> {
        // In case of tie, the first one is selected (stability)
        destinations
            .iter()
            .filter(|d| d.has_capacity())
            .min_by_key(|d| d.active())
            .cloned()
    }
}
