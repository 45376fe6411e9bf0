//! Rate limit policies and admission decisions.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PolicyConfig;

/// A named sliding-window rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: Arc<str>,
    window: Duration,
    permit_limit: u32,
    segments: u32,
}

impl Policy {
    /// Create a policy. A segment count of zero is treated as one.
    pub fn new(name: impl Into<Arc<str>>, window: Duration, permit_limit: u32, segments: u32) -> Self {
        Self {
            name: name.into(),
            window,
            permit_limit,
            segments: segments.max(1),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(
            config.name.as_str(),
            Duration::from_secs(config.window_secs),
            config.permit_limit,
            config.segments,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn permit_limit(&self) -> u32 {
        self.permit_limit
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Length of one segment (window / segments), never zero.
    pub fn segment_duration(&self) -> Duration {
        (self.window / self.segments).max(Duration::from_nanos(1))
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject { retry_after: Duration },
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_duration() {
        let policy = Policy::new("p", Duration::from_secs(60), 10, 2);
        assert_eq!(policy.segment_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_segments_clamped() {
        let policy = Policy::new("p", Duration::from_secs(10), 1, 0);
        assert_eq!(policy.segments(), 1);
        assert_eq!(policy.segment_duration(), Duration::from_secs(10));
    }
}
