//! Partitioned segmented sliding-window rate limiter.
//!
//! # Algorithm
//! ```text
//! window W, N segments of W/N, absolute segment number k = ⌊(now - epoch) / (W/N)⌋
//!
//!   slot = k mod N        ┌────┬────┬────┬────┐
//!                         │ k-3│ k-2│ k-1│ k  │  live segments: k-N < s ≤ k
//!                         └────┴────┴────┴────┘
//!
//! admit:  zero expired slots → sum live counts → below limit? count in slot k : reject
//! reject: retry_after = start(oldest non-empty live segment) + W - now
//! ```
//!
//! # Design Decisions
//! - Every live segment is weighted equally (no de-weighting of the oldest)
//! - One counter state per (policy, partition key); keys under different
//!   policies never share state
//! - A state is only touched while its map entry lock is held, so the
//!   read-sum-increment sequence is atomic per key; there is no global lock
//! - Idle states are reclaimed by `sweep`, driven by a background task

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::rate_limit::policy::{Decision, Policy};

/// Key of one counter state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PartitionId {
    policy: Arc<str>,
    key: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct Segment {
    /// Absolute segment number since the limiter epoch.
    index: u64,
    count: u32,
}

/// Circular buffer of segments for one (policy, key).
#[derive(Debug)]
struct CounterState {
    segments: Box<[Segment]>,
    segment_len: Duration,
    newest: u64,
}

impl CounterState {
    fn new(policy: &Policy) -> Self {
        Self {
            segments: vec![Segment::default(); policy.segments() as usize].into_boxed_slice(),
            segment_len: policy.segment_duration(),
            newest: 0,
        }
    }

    fn span(&self) -> u64 {
        self.segments.len() as u64
    }

    fn is_live(&self, segment: &Segment, current: u64) -> bool {
        segment.index + self.span() > current
    }

    fn expire(&mut self, current: u64) {
        let span = self.span();
        for segment in self.segments.iter_mut() {
            if segment.count > 0 && segment.index + span <= current {
                segment.count = 0;
            }
        }
    }

    fn estimated_count(&self, current: u64) -> u64 {
        self.segments
            .iter()
            .filter(|s| self.is_live(s, current))
            .map(|s| u64::from(s.count))
            .sum()
    }

    fn record(&mut self, current: u64) {
        let slot = (current % self.span()) as usize;
        let segment = &mut self.segments[slot];
        if segment.index != current {
            *segment = Segment { index: current, count: 0 };
        }
        segment.count = segment.count.saturating_add(1);
        self.newest = self.newest.max(current);
    }

    fn oldest_counted(&self, current: u64) -> Option<u64> {
        self.segments
            .iter()
            .filter(|s| s.count > 0 && self.is_live(s, current))
            .map(|s| s.index)
            .min()
    }

    fn is_idle(&self, current: u64) -> bool {
        self.newest + self.span() <= current
    }
}

/// Per-(policy, key) sliding-window admission control.
#[derive(Debug)]
pub struct RateLimiter {
    epoch: Instant,
    states: DashMap<PartitionId, CounterState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Segment boundaries are aligned to `epoch`.
    pub fn with_epoch(epoch: Instant) -> Self {
        Self {
            epoch,
            states: DashMap::new(),
        }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Decide whether one more request for `key` under `policy` fits in the
    /// trailing window ending at `now`.
    pub fn admit(&self, policy: &Policy, key: &str, now: Instant) -> Decision {
        let elapsed = now.saturating_duration_since(self.epoch);
        let current = segment_number(elapsed, policy.segment_duration());
        let id = PartitionId {
            policy: policy.shared_name(),
            key: key.to_string(),
        };

        let mut entry = self.states.entry(id).or_insert_with(|| CounterState::new(policy));
        let state = entry.value_mut();

        state.expire(current);
        let estimated = state.estimated_count(current);

        if estimated < u64::from(policy.permit_limit()) {
            state.record(current);
            return Decision::Admit;
        }

        let retry_after = match state.oldest_counted(current) {
            Some(oldest) => until_segment(oldest + state.span(), state.segment_len, elapsed),
            // Nothing counted yet the limit is reached (limit of zero).
            None => until_segment(current + 1, state.segment_len, elapsed),
        };
        Decision::Reject { retry_after }
    }

    /// Current estimated count for `key` without recording anything.
    pub fn snapshot(&self, policy: &Policy, key: &str, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.epoch);
        let current = segment_number(elapsed, policy.segment_duration());
        let id = PartitionId {
            policy: policy.shared_name(),
            key: key.to_string(),
        };
        self.states
            .get(&id)
            .map(|state| state.estimated_count(current))
            .unwrap_or(0)
            .min(u64::from(u32::MAX)) as u32
    }

    /// Drop counter states whose newest segment fell out of their window.
    /// Returns the number of states removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.epoch);
        let before = self.states.len();
        self.states
            .retain(|_, state| !state.is_idle(segment_number(elapsed, state.segment_len)));
        let removed = before.saturating_sub(self.states.len());
        metrics::record_partitions(self.states.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.states.len(), "Swept idle rate limit partitions");
        }
        removed
    }

    /// Number of tracked (policy, key) partitions.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Run `sweep` every `interval` until shutdown is signalled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Rate limit sweeper starting");
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep(Instant::now());
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn segment_number(elapsed: Duration, segment_len: Duration) -> u64 {
    (elapsed.as_nanos() / segment_len.as_nanos().max(1)) as u64
}

/// Time from `elapsed` until segment number `segment` begins.
fn until_segment(segment: u64, segment_len: Duration, elapsed: Duration) -> Duration {
    let start = u128::from(segment) * segment_len.as_nanos();
    let remaining = start.saturating_sub(elapsed.as_nanos());
    Duration::from_nanos(remaining.min(u128::from(u64::MAX)) as u64)
}
