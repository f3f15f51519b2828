//! Policy propagator daemon
//!
//! Replicates root policies onto the clusters chosen by their placement
//! rules, keeping every replica in line with its root:
//! - Watch-driven reconciliation with retry and backoff
//! - Periodic resync of every root
//! - Event logging for every propagation

use anyhow::Context;
use clap::Parser;
use propagator_daemon::{Controller, DaemonConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Policy propagator CLI
#[derive(Parser)]
#[command(name = "propagatord")]
#[command(about = "Policy propagator - replicates root policies onto placed clusters", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PROPAGATOR_CONFIG")]
    config: Option<String>,

    /// Seed manifest file loaded into the store at startup
    #[arg(short, long, env = "PROPAGATOR_SEED")]
    seed: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "PROPAGATOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "PROPAGATOR_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        DaemonConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting propagatord");

    let controller = Controller::new(config)
        .await
        .context("failed to start controller")?;
    controller.run().await?;
    Ok(())
}
