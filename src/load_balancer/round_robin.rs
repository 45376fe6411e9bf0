//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Destination, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through destinations.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn next_destination(&self, destinations: &[Arc<Destination>]) -> Option<Arc<Destination>> {
        if destinations.is_empty() {
            return None;
        }

        // Skip saturated destinations, visiting each at most once.
        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = destinations.len();
        (0..len)
            .map(|i| &destinations[(start + i) % len])
            .find(|d| d.has_capacity())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let d1 = Arc::new(Destination::new("127.0.0.1:8080".parse().unwrap(), 100));
        let d2 = Arc::new(Destination::new("127.0.0.1:8081".parse().unwrap(), 100));
        let destinations = vec![d1.clone(), d2.clone()];

        assert_eq!(lb.next_destination(&destinations).unwrap().addr, d1.addr);
        assert_eq!(lb.next_destination(&destinations).unwrap().addr, d2.addr);
        assert_eq!(lb.next_destination(&destinations).unwrap().addr, d1.addr);
    }

    #[test]
    fn test_skips_saturated() {
        let lb = RoundRobin::new();
        let d1 = Arc::new(Destination::new("127.0.0.1:8080".parse().unwrap(), 1));
        let d2 = Arc::new(Destination::new("127.0.0.1:8081".parse().unwrap(), 1));
        let _busy = d1.try_create_guard().unwrap();
        let destinations = vec![d1, d2.clone()];

        assert_eq!(lb.next_destination(&destinations).unwrap().addr, d2.addr);
        assert_eq!(lb.next_destination(&destinations).unwrap().addr, d2.addr);
    }
}
