//! Upstream destination.
//!
//! # Responsibilities
//! - Represent a single destination address in a cluster
//! - Track in-flight requests (for least-connections selection)
//! - Enforce the per-destination concurrency cap

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A single upstream destination.
#[derive(Debug)]
pub struct Destination {
    /// The address of the destination.
    pub addr: SocketAddr,
    /// Maximum concurrent requests allowed.
    pub max_connections: usize,
    /// Number of requests currently in flight.
    pub active_connections: AtomicUsize,
}

impl Destination {
    pub fn new(addr: SocketAddr, max_connections: usize) -> Self {
        Self {
            addr,
            max_connections,
            active_connections: AtomicUsize::new(0),
        }
    }

    /// Get the current number of in-flight requests.
    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn has_capacity(&self) -> bool {
        self.active() < self.max_connections
    }

    fn release(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Try to reserve a slot; `None` when the destination is at capacity.
    pub fn try_create_guard(self: &Arc<Self>) -> Option<DestinationGuard> {
        let mut prev = self.active_connections.load(Ordering::Relaxed);
        loop {
            if prev >= self.max_connections {
                return None;
            }
            match self.active_connections.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        Some(DestinationGuard {
            destination: self.clone(),
        })
    }
}

/// A RAII guard that releases the in-flight slot on drop.
#[derive(Debug)]
pub struct DestinationGuard {
    pub destination: Arc<Destination>,
}

impl Deref for DestinationGuard {
    type Target = Destination;
    fn deref(&self) -> &Self::Target {
        &self.destination
    }
}

impl Drop for DestinationGuard {
    fn drop(&mut self) {
        self.destination.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_respects_capacity() {
        let dest = Arc::new(Destination::new("127.0.0.1:9000".parse().unwrap(), 2));
        let g1 = dest.try_create_guard().unwrap();
        let _g2 = dest.try_create_guard().unwrap();
        assert!(dest.try_create_guard().is_none());
        assert_eq!(dest.active(), 2);

        drop(g1);
        assert_eq!(dest.active(), 1);
        assert!(dest.try_create_guard().is_some());
    }
}
