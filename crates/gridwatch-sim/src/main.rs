//! Gridwatch Sim - Simulated backend
//!
//! Serves the Gridwatch REST API over an in-memory device fleet whose
//! telemetry drifts on a timer.

mod api;
mod auth;
mod config;
mod pulse;
mod registry;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "gridwatch-sim")]
#[command(about = "Simulated device fleet serving the Gridwatch REST API")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gridwatch-sim.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Disable /api/simulate scenarios
    #[arg(long)]
    no_simulation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Gridwatch Sim v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.no_simulation {
        config.simulation.enabled = false;
    }

    info!(
        bind = %config.server.bind,
        simulation = config.simulation.enabled,
        pulse_ms = config.simulation.pulse_interval_ms,
        "Configuration loaded"
    );

    let state = state::AppState::new(config);
    server::run(state).await
}
