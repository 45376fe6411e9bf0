//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: diagnostics routes plus the forward gate fallback
//! - Mount the admission pipeline in front of everything
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and run until shutdown
//! - Own the limiter sweeper task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{forward_gate, Authenticator, ForwardGate, StaticTokenAuthenticator};
use crate::config::GatewayConfig;
use crate::diagnostics::{diagnostics_router, DiagnosticsState};
use crate::http::forward::{Forwarder, UpstreamForwarder};
use crate::lifecycle::{shutdown, Shutdown};
use crate::load_balancer::ClusterManager;
use crate::pipeline::{admission_middleware, AdmissionPipeline};
use crate::rate_limit::RateLimiter;
use crate::routing::RouteTable;
use crate::security::{PatternMatcher, RequestInspector};

/// The gateway: admission pipeline, forward gate and diagnostics.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl GatewayServer {
    /// Server with the built-in static-token authenticator and upstream forwarder.
    pub fn new(config: GatewayConfig) -> Self {
        let diagnostics = diagnostics_state(&config);
        let forwarder = Arc::new(UpstreamForwarder::new(
            diagnostics.routes.clone(),
            diagnostics.clusters.clone(),
            Duration::from_secs(config.timeouts.connect_secs),
        ));
        let authenticator = Arc::new(StaticTokenAuthenticator::new(&config.auth.tokens));
        if authenticator.is_empty() {
            tracing::warn!("No bearer tokens configured; only anonymous paths will be forwarded");
        } else {
            tracing::info!(tokens = authenticator.len(), "Static token authenticator loaded");
        }
        Self::assemble(config, diagnostics, authenticator, forwarder)
    }

    /// Server with caller-supplied collaborators.
    pub fn with_collaborators(
        config: GatewayConfig,
        authenticator: Arc<dyn Authenticator>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let diagnostics = diagnostics_state(&config);
        Self::assemble(config, diagnostics, authenticator, forwarder)
    }

    fn assemble(
        config: GatewayConfig,
        diagnostics: DiagnosticsState,
        authenticator: Arc<dyn Authenticator>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new());
        let pipeline = Arc::new(AdmissionPipeline::from_config(&config, limiter.clone()));
        let inspector = RequestInspector::new(&config.inspection, Arc::new(PatternMatcher::new()));
        let gate = Arc::new(ForwardGate::new(&config.auth, authenticator, forwarder).with_inspector(inspector));

        tracing::info!(stages = ?pipeline.stage_names(), "Admission pipeline assembled");

        let router = build_router(&config, pipeline, gate, diagnostics);
        Self {
            router,
            config,
            limiter,
        }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Arc<Shutdown>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway server starting");

        let sweeper = if self.config.rate_limit.enabled {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            Some(self.limiter.clone().spawn_sweeper(interval, shutdown.subscribe()))
        } else {
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()))
            .await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "Gateway server failed");
        }

        // Serve may end on an io error before shutdown fired.
        shutdown.trigger();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        tracing::info!("Gateway server stopped");
        result
    }
}

fn diagnostics_state(config: &GatewayConfig) -> DiagnosticsState {
    DiagnosticsState {
        routes: Arc::new(RouteTable::from_config(&config.routes)),
        clusters: Arc::new(ClusterManager::new(&config.clusters)),
    }
}

/// Build the Axum router with all middleware layers.
///
/// Outermost first: trace, request ID, timeout, admission, handlers.
#[allow(deprecated)]
pub fn build_router(
    config: &GatewayConfig,
    pipeline: Arc<AdmissionPipeline>,
    gate: Arc<ForwardGate>,
    diagnostics: DiagnosticsState,
) -> Router {
    Router::new()
        .merge(diagnostics_router(diagnostics))
        .fallback(forward_gate)
        .with_state(gate)
        .layer(middleware::from_fn_with_state(pipeline, admission_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}
