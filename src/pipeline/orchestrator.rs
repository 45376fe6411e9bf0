//! Ordered admission pipeline.
//!
//! # State Machine
//! ```text
//! HttpsCheck → MaliciousInputCheck → PolicySelect+RateLimit → downstream (ForwardGate)
//!      │               │                       │
//!      └───────────────┴───────────────────────┴──→ Rejected(kind)
//!
//! Outbound (always, success and rejection): security headers, 429 headers,
//! remaining quota on metered admissions
//! ```
//!
//! # Design Decisions
//! - Stage order is data (`Vec<Box<dyn Stage>>`), visible via `stage_names`
//! - First rejection ends evaluation; later stages never see the request
//! - Dev mode leaves the HTTPS stage out entirely

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::pipeline::rejection::Rejection;
use crate::pipeline::stage::{HttpsStage, InspectionStage, Quota, RateLimitStage, Stage, StageOutcome};
use crate::rate_limit::{PolicySelector, RateLimiter};
use crate::security::{PatternMatcher, RequestInspector, SecurityHeaders, TransportSecurity};

/// Terminal state of admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Passed every stage; continue to the forward gate.
    Admitted { quota: Option<Quota> },
    /// Stopped by the named stage.
    Rejected {
        stage: &'static str,
        rejection: Rejection,
    },
}

pub struct AdmissionPipeline {
    stages: Vec<Box<dyn Stage<Body>>>,
    transport: TransportSecurity,
    headers: SecurityHeaders,
}

impl AdmissionPipeline {
    pub fn new(
        stages: Vec<Box<dyn Stage<Body>>>,
        transport: TransportSecurity,
        headers: SecurityHeaders,
    ) -> Self {
        Self {
            stages,
            transport,
            headers,
        }
    }

    /// Standard stage order for the given configuration.
    pub fn from_config(config: &GatewayConfig, limiter: Arc<RateLimiter>) -> Self {
        let transport = TransportSecurity::from_config(&config.listener);
        let mut stages: Vec<Box<dyn Stage<Body>>> = Vec::new();

        if config.listener.dev_mode {
            tracing::warn!("Dev mode: HTTPS redirection disabled");
        } else {
            stages.push(Box::new(HttpsStage::new(transport.clone())));
        }

        let matcher = Arc::new(PatternMatcher::new());
        stages.push(Box::new(InspectionStage::new(RequestInspector::new(
            &config.inspection,
            matcher,
        ))));

        if config.rate_limit.enabled {
            let selector = PolicySelector::from_config(&config.rate_limit);
            stages.push(Box::new(RateLimitStage::new(selector, limiter)));
        }

        Self::new(stages, transport, SecurityHeaders::new(&config.headers))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the stages in order, stopping at the first rejection.
    pub fn evaluate(&self, req: &Request<Body>) -> Admission {
        let mut quota = None;
        for stage in &self.stages {
            match stage.evaluate(req) {
                StageOutcome::Continue => {}
                StageOutcome::Metered(q) => quota = Some(q),
                StageOutcome::Reject(rejection) => {
                    return Admission::Rejected {
                        stage: stage.name(),
                        rejection,
                    };
                }
            }
        }
        Admission::Admitted { quota }
    }

    /// Outbound step, applied to every response.
    pub fn finish(&self, mut response: Response, secure: bool) -> Response {
        self.headers.apply(response.headers_mut(), secure);
        response
    }

    pub fn is_secure(&self, req: &Request<Body>) -> bool {
        self.transport.is_secure(req)
    }
}

/// Middleware running the pipeline in front of the downstream handler.
pub async fn admission_middleware(
    State(pipeline): State<Arc<AdmissionPipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let secure = pipeline.is_secure(&request);

    let response = match pipeline.evaluate(&request) {
        Admission::Admitted { quota } => {
            metrics::record_admission("admitted");
            let mut response = next.run(request).await;
            if let Some(quota) = quota {
                quota.apply(response.headers_mut());
            }
            response
        }
        Admission::Rejected { stage, rejection } => {
            tracing::debug!(stage, reason = rejection.reason(), "Request rejected");
            metrics::record_rejection(rejection.reason());
            rejection.into_response()
        }
    };

    pipeline.finish(response, secure)
}
