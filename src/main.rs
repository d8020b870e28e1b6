//! Chain event relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /events ──▶ ┌──────────────┐    ┌───────────┐
//!                      │  normalizer  │───▶│   risk    │
//!                      └──────────────┘    └─────┬─────┘
//!                                                │ broadcast / alert
//!                                                ▼
//!                      ┌──────────────┐    ┌───────────────┐
//!     GET /ws ───────▶ │   registry   │◀───│  broadcaster  │◀── delivery loop
//!     (subscribers)    │  (DashMap)   │    │ (bounded FIFO)│    (interval_ms)
//!                      └──────┬───────┘    └───────┬───────┘
//!                             │ sinks              │ notifications
//!                             ▼                    ▼
//!                      WebSocket writers     log / metrics listeners
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use chain_relay::broadcast::Broadcaster;
use chain_relay::config::{load_config, RelayConfig};
use chain_relay::http::HttpServer;
use chain_relay::lifecycle::shutdown::{GOING_AWAY, SHUTDOWN_REASON};
use chain_relay::lifecycle::{wait_for_signal, Shutdown};
use chain_relay::notify::{Listeners, LogListener};
use chain_relay::observability::{init_logging, init_metrics, MetricsListener};

#[derive(Parser)]
#[command(name = "chain-relay", version, about = "Chain event relay")]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chain-relay starting");

    tracing::info!(
        bind_address = %config.server.bind_address,
        max_queue_size = config.broadcast.max_queue_size,
        max_retries = config.broadcast.max_retries,
        interval_ms = config.broadcast.interval_ms,
        retry_mode = ?config.broadcast.retry_mode,
        risk_enabled = config.risk.enabled,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listeners = Listeners::new();
    let broadcaster = Broadcaster::new(config.broadcast.clone(), listeners.clone());
    listeners.add(Arc::new(LogListener::new()));
    listeners.add(Arc::new(MetricsListener::new(broadcaster.registry())));
    broadcaster.start();

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, broadcaster.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;

    // Close clients first so open WebSocket connections do not hold up
    // the graceful HTTP shutdown.
    broadcaster.close(GOING_AWAY, SHUTDOWN_REASON);
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
