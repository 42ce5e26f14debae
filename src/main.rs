//! Integration gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                 INTEGRATION GATEWAY                   │
//!                      │                                                       │
//!  POST /v1/messages   │  ┌─────────┐    ┌──────────────┐    ┌──────────────┐ │
//!  ────────────────────┼─▶│  http   │───▶│ SyncManager  │───▶│ rate limiter │ │
//!                      │  │ server  │    │  (registry)  │    │ (per target) │ │
//!                      │  └─────────┘    └──────────────┘    └──────┬───────┘ │
//!                      │                                            ▼         │
//!                      │                                    ┌──────────────┐ │
//!                      │                                    │   circuit    │ │
//!                      │                                    │   breaker    │ │
//!                      │                                    └──────┬───────┘ │
//!                      │                                            ▼         │
//!                      │  ┌─────────┐                       ┌──────────────┐ │     Email / Chat /
//!                      │  │ health  │──── probe ───────────▶│ Integration  │─┼──▶  Ticketing /
//!                      │  │  loop   │                       │   adapter    │ │     Webhook
//!                      │  └─────────┘                       └──────────────┘ │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use integration_gateway::config::{load_config, GatewayConfig};
use integration_gateway::lifecycle::{build_manager, shutdown_signal};
use integration_gateway::observability::{logging, metrics};
use integration_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "integration-gateway", version, about = "Integration reliability gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "integration-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        integrations = config.integrations.len(),
        dispatch_timeout_secs = config.timeouts.dispatch_secs,
        health_checks = config.health_check.enabled,
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

    let manager = build_manager(&config)?.start();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, manager.clone());
    server.run(listener, shutdown_signal()).await?;

    manager.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
