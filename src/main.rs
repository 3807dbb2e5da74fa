//! fault-telemetry service.
//!
//! A small web service that injects outages, errors and latency into its
//! own traffic and reports every request as correlated logs, metrics and
//! spans.
//!
//! ```text
//!   Client ──▶ http (axum) ──▶ lifecycle::Orchestrator
//!                                 │  fault::decide ─▶ sleep ─▶ handler
//!                                 ▼
//!                       telemetry sinks (log | metrics | spans)
//!                                 │
//!                                 ▼
//!                       health::RollingErrorRate
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use fault_telemetry::config::load_config;
use fault_telemetry::http::HttpServer;
use fault_telemetry::lifecycle::{build_orchestrator, signals, Shutdown};
use fault_telemetry::observability::{init_logging, install_prometheus};

#[derive(Debug, Parser)]
#[command(
    name = "fault-telemetry",
    version,
    about = "Fault-injecting web service with correlated telemetry"
)]
struct Cli {
    /// TOML config file. Environment overrides still apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref())?;
    let mut config = loaded.config;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    init_logging(&config.observability)?;
    tracing::info!("fault-telemetry v{} starting", env!("CARGO_PKG_VERSION"));
    for warning in &loaded.warnings {
        tracing::warn!(%warning, "Configuration value adjusted");
    }

    let prometheus = if config.observability.metrics_enabled {
        match install_prometheus() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Prometheus recorder");
                None
            }
        }
    } else {
        None
    };

    let orchestrator = build_orchestrator(&config);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, orchestrator, prometheus);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
