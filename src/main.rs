//! replica-probe: exercise a replicated pool from a config file.
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │              ReplicatedRouter                 │
//!  acquire_write ─▶│  primary endpoint ── breaker ── TcpConnector  │──▶ primary
//!                  │                                               │
//!  acquire_read ──▶│  cursor % N                                   │
//!                  │   ├─ replica-0 ── breaker ── TcpConnector     │──▶ replica 0
//!                  │   ├─ replica-1 ── breaker ── TcpConnector     │──▶ replica 1
//!                  │   └─ ... (fail over on error / open breaker)  │
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! `run` probes on an interval until Ctrl-C; `status` probes once and prints
//! the breaker snapshot as JSON.

use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use replicated_pool::config::{load_config, PoolConfig};
use replicated_pool::health::ProbeMonitor;
use replicated_pool::lifecycle::Shutdown;
use replicated_pool::net::TcpConnector;
use replicated_pool::observability::{logging, metrics};
use replicated_pool::pool::ReplicatedRouter;

#[derive(Parser)]
#[command(name = "replica-probe")]
#[command(about = "Probe a primary/replica store through failure-isolated endpoints", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "replica-probe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe periodically until interrupted
    Run,
    /// Probe once and print endpoint state
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(config = %cli.config.display(), "replica-probe v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = Arc::new(build_router(&config)?);
    let monitor = ProbeMonitor::new(router.clone(), Duration::from_millis(config.probe.interval_ms));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Status => {
            let report = monitor.probe_once().await;
            let output = serde_json::json!({
                "probe": report,
                "endpoints": router.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Run => {
            if !config.probe.enabled {
                tracing::info!("Probe disabled in configuration, nothing to do");
                return Ok(());
            }
            let shutdown = Shutdown::new();
            let task = tokio::spawn(monitor.run(shutdown.subscribe()));
            shutdown.trigger_on_ctrl_c().await;
            task.await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(config: &PoolConfig) -> Result<ReplicatedRouter<TcpStream>, Box<dyn std::error::Error>> {
    let timeout = config.pool.connect_timeout();
    let primary = TcpConnector::parse(&config.pool.primary, timeout)?;
    let replicas = config
        .pool
        .replicas
        .iter()
        .map(|addr| TcpConnector::parse(addr, timeout))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        pool = %config.pool.name,
        primary = %config.pool.primary,
        replicas = replicas.len(),
        connect_timeout_ms = config.pool.connect_timeout_ms,
        "Configuration loaded"
    );

    let router = ReplicatedRouter::new(
        config.pool.name.clone(),
        primary,
        replicas,
        &config.circuit_breaker.to_breaker_config(),
    )?;
    Ok(router)
}
