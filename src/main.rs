//! Match Outcome Inference Gateway
//!
//! Serves a match outcome classifier over HTTP behind a circuit breaker.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                   INFERENCE GATEWAY                      │
//!                    │                                                          │
//!   Client Request   │  ┌─────────┐    ┌──────────┐    ┌────────────────────┐   │
//!   ─────────────────┼─▶│  http   │───▶│ pipeline │───▶│  circuit breaker   │   │
//!                    │  │ server  │    │ validate │    │ + predictor timeout│   │
//!                    │  └─────────┘    └──────────┘    └─────────┬──────────┘   │
//!                    │                                           │              │
//!                    │                                           ▼              │
//!                    │                                   ┌──────────────┐       │
//!                    │                                   │  predictor   │       │
//!                    │                                   │  (softmax)   │       │
//!                    │                                   └──────┬───────┘       │
//!                    │                                          │               │
//!   Client Response  │  ┌─────────┐    ┌──────────────────────┐ │               │
//!   ◀────────────────┼──│ response│◀───│ enhancer / fallback  │◀┘               │
//!                    │  └─────────┘    └──────────────────────┘                 │
//!                    │                                                          │
//!                    │  Cross-cutting: config, observability, lifecycle         │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use inference_gateway::config::loader::load_config;
use inference_gateway::config::GatewayConfig;
use inference_gateway::lifecycle::{signals, startup, Shutdown};
use inference_gateway::observability::logging;
use inference_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "inference-gateway")]
#[command(about = "Match outcome inference gateway with circuit breaker fallback", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("inference-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        breaker = %config.breaker.name,
        predictor_timeout_ms = config.predictor.timeout_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::start_metrics(&config);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::forward_to(&signal_shutdown).await;
    });

    let server = HttpServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
