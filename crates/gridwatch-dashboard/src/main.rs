//! Gridwatch - Terminal operations dashboard
//!
//! Polls the backend for device telemetry, draws the device list and charts,
//! and reads operator commands from stdin.

mod config;
mod controller;
mod dispatcher;
mod input;
mod poll;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use gridwatch_client::{Backend, HttpBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::controller::Dashboard;
use crate::poll::PollTicker;

#[derive(Parser, Debug)]
#[command(name = "gridwatch")]
#[command(about = "Live operations dashboard for the Gridwatch device fleet")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gridwatch.toml")]
    config: PathBuf,

    /// Backend base URL
    #[arg(short, long)]
    backend: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Fetch one snapshot, print it and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // stdout belongs to the dashboard
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Gridwatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(url) = args.backend {
        config.backend.url = url;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.poll.interval_ms = interval_ms;
    }

    info!(
        backend = %config.backend.url,
        interval_ms = config.poll.interval_ms,
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let backend: Arc<dyn Backend> = Arc::new(
            HttpBackend::new(config.backend.url.clone(), config.backend.timeout())
                .context("Failed to create HTTP client")?,
        );

        if args.once {
            let snapshot = backend
                .devices()
                .await
                .with_context(|| format!("Failed to fetch devices from {}", config.backend.url))?;
            println!("{} devices:", snapshot.len());
            for device in snapshot.devices() {
                println!(
                    "  - {} ({}) {} load {:.1}%",
                    device.name, device.id, device.status, device.load
                );
            }
            return Ok(());
        }

        let (dashboard, completions) = Dashboard::new(backend, &config);
        let ticker = PollTicker::new(config.poll.interval());
        dashboard.run(completions, ticker).await
    })
}
