//! API Gateway Admission Core
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ ┌──────────────────────── admission pipeline ───────────────────────┐
//!                     │ HTTPS check → malicious-input check → policy select + rate limit │
//!                     └───────────────────────────────┬───────────────────────────────────┘
//!                                                     ▼
//!                                         ┌──────────────────────┐
//!                                         │  forward gate (auth) │
//!                                         └──────────┬───────────┘
//!                                                    ▼
//!                                   ┌────────────────────────────────┐
//!                                   │ forwarder: route → cluster     │────▶ Upstream
//!                                   │            → destination       │
//!                                   └────────────────────────────────┘
//!
//!     Every response, admitted or rejected, leaves with the security
//!     header set stamped on it.
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use admission_gateway::config::{load_config, GatewayConfig};
use admission_gateway::lifecycle::{signals, Shutdown};
use admission_gateway::observability::{logging, metrics};
use admission_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "admission-gateway", version, about = "API gateway admission core")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Development mode: no HTTPS redirection
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if cli.dev {
        config.listener.dev_mode = true;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "admission-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        dev_mode = config.listener.dev_mode,
        policies = config.rate_limit.policies.len(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    GatewayServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
