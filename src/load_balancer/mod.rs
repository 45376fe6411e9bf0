//! Load balancing subsystem (default forwarding engine).
//!
//! # Data Flow
//! ```text
//! Route matched → cluster identified
//!     → pool.rs (get cluster destinations)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through destinations)
//!         - least_conn.rs (pick destination with fewest in-flight requests)
//!     → backend.rs (reserve an in-flight slot)
//!     → Return destination guard or none
//! ```
//!
//! # Design Decisions
//! - Algorithm selection per cluster
//! - No health checking; saturated destinations are skipped

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use crate::load_balancer::backend::Destination;

pub use pool::{Cluster, ClusterManager};

/// Destination selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Name reported by diagnostics.
    fn name(&self) -> &'static str;

    fn next_destination(&self, destinations: &[Arc<Destination>]) -> Option<Arc<Destination>>;
}
