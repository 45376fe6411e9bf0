//! Admission stages.
//!
//! Each stage looks at the request and either lets it continue or ends the
//! pipeline with a [`Rejection`]. Stages are synchronous and in-memory.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, HeaderValue, Request};

use crate::observability::metrics;
use crate::pipeline::rejection::{Rejection, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
use crate::rate_limit::{Decision, PartitionKeyResolver, PolicySelection, PolicySelector, RateLimiter};
use crate::security::patterns::{Category, DetectionResult};
use crate::security::{RequestInspector, TransportSecurity};

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    /// Continue, counted against a policy.
    Metered(Quota),
    Reject(Rejection),
}

/// Capacity left under the selected policy after an admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
}

impl Quota {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
    }
}

/// One step of the admission pipeline.
pub trait Stage<B>: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, req: &Request<B>) -> StageOutcome;
}

/// Redirects plain-HTTP requests to HTTPS.
#[derive(Debug, Clone)]
pub struct HttpsStage {
    transport: TransportSecurity,
}

impl HttpsStage {
    pub fn new(transport: TransportSecurity) -> Self {
        Self { transport }
    }
}

impl<B> Stage<B> for HttpsStage {
    fn name(&self) -> &'static str {
        "https"
    }

    fn evaluate(&self, req: &Request<B>) -> StageOutcome {
        if self.transport.is_secure(req) {
            return StageOutcome::Continue;
        }
        match self.transport.redirect_location(req) {
            Some(location) => {
                tracing::debug!(location = %location, "Redirecting to HTTPS");
                StageOutcome::Reject(Rejection::HttpsRequired { location })
            }
            None => {
                tracing::warn!(path = %req.uri().path(), "Plain HTTP request without host");
                StageOutcome::Reject(Rejection::MalformedInput(Category::Header))
            }
        }
    }
}

/// Rejects requests flagged by the malicious-input detector.
#[derive(Debug, Clone)]
pub struct InspectionStage {
    inspector: RequestInspector,
}

impl InspectionStage {
    pub fn new(inspector: RequestInspector) -> Self {
        Self { inspector }
    }
}

impl<B> Stage<B> for InspectionStage {
    fn name(&self) -> &'static str {
        "inspection"
    }

    fn evaluate(&self, req: &Request<B>) -> StageOutcome {
        match self.inspector.inspect(req) {
            DetectionResult::Clean => StageOutcome::Continue,
            DetectionResult::Flagged(category) => {
                tracing::warn!(
                    category = %category,
                    method = %req.method(),
                    path = %req.uri().path(),
                    "Malicious input detected"
                );
                metrics::record_flagged(category.as_str());
                StageOutcome::Reject(Rejection::MalformedInput(category))
            }
        }
    }
}

/// Selects a policy for the path and asks the limiter for admission.
#[derive(Debug, Clone)]
pub struct RateLimitStage {
    selector: PolicySelector,
    resolver: PartitionKeyResolver,
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(selector: PolicySelector, limiter: Arc<RateLimiter>) -> Self {
        Self {
            selector,
            resolver: PartitionKeyResolver::new(),
            limiter,
        }
    }
}

impl<B> Stage<B> for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, req: &Request<B>) -> StageOutcome {
        let policy = match self.selector.select(req.uri().path()) {
            PolicySelection::Limited(policy) => policy,
            PolicySelection::NoLimit => return StageOutcome::Continue,
        };
        let key = self.resolver.resolve(req);
        let now = Instant::now();

        match self.limiter.admit(&policy, &key, now) {
            Decision::Admit => {
                let used = self.limiter.snapshot(&policy, &key, now);
                let quota = Quota {
                    limit: policy.permit_limit(),
                    remaining: policy.permit_limit().saturating_sub(used),
                };
                tracing::debug!(policy = %policy.name(), partition = %key, remaining = quota.remaining, "Admitted");
                StageOutcome::Metered(quota)
            }
            Decision::Reject { retry_after } => {
                tracing::warn!(
                    policy = %policy.name(),
                    partition = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(policy.name());
                StageOutcome::Reject(Rejection::RateLimited {
                    policy: policy.name().to_string(),
                    limit: policy.permit_limit(),
                    retry_after,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InspectionConfig;
    use crate::rate_limit::Policy;
    use crate::security::PatternMatcher;
    use std::time::Duration;

    #[test]
    fn test_https_stage_redirects() {
        let stage = HttpsStage::new(TransportSecurity::default());
        let req = Request::get("/a?b=c").header("host", "gw.test").body(()).unwrap();
        assert_eq!(
            stage.evaluate(&req),
            StageOutcome::Reject(Rejection::HttpsRequired {
                location: "https://gw.test/a?b=c".into()
            })
        );

        let secure = Request::get("https://gw.test/a").body(()).unwrap();
        assert_eq!(stage.evaluate(&secure), StageOutcome::Continue);
    }

    #[test]
    fn test_inspection_stage() {
        let stage = InspectionStage::new(RequestInspector::new(
            &InspectionConfig::default(),
            Arc::new(PatternMatcher::new()),
        ));
        let bad = Request::get("/x?q=..%2F..%2Fetc").body(()).unwrap();
        assert_eq!(
            stage.evaluate(&bad),
            StageOutcome::Reject(Rejection::MalformedInput(Category::Traversal))
        );
    }

    #[test]
    fn test_rate_limit_stage_reports_remaining() {
        let policy = Arc::new(Policy::new("api", Duration::from_secs(60), 3, 2));
        let selector = PolicySelector::new(vec!["/health".into()], vec![("/api".into(), policy)]);
        let stage = RateLimitStage::new(selector, Arc::new(RateLimiter::new()));

        let req = Request::get("/api/orders").body(()).unwrap();
        for remaining in [2, 1, 0] {
            assert_eq!(
                stage.evaluate(&req),
                StageOutcome::Metered(Quota { limit: 3, remaining })
            );
        }

        let health = Request::get("/health").body(()).unwrap();
        assert_eq!(stage.evaluate(&health), StageOutcome::Continue);
    }

    #[test]
    fn test_rate_limit_stage() {
        let policy = Arc::new(Policy::new("tight", Duration::from_secs(60), 1, 1));
        let selector = PolicySelector::new(vec![], vec![("/".into(), policy)]);
        let stage = RateLimitStage::new(selector, Arc::new(RateLimiter::new()));

        let req = Request::get("/x").body(()).unwrap();
        assert_eq!(
            stage.evaluate(&req),
            StageOutcome::Metered(Quota { limit: 1, remaining: 0 })
        );
        match stage.evaluate(&req) {
            StageOutcome::Reject(Rejection::RateLimited { policy, limit, .. }) => {
                assert_eq!(policy, "tight");
                assert_eq!(limit, 1);
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }
}
