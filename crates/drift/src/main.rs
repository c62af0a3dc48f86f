//! Drift - data-quality divergence service
//!
//! # Usage
//!
//! ```bash
//! # Serve with defaults plus environment overrides
//! WAREHOUSE_DSN=mysql://reader:pw@warehouse:9030/platform_offline drift
//!
//! # Explicit config, verbose logs, other port
//! drift --config configs/drift.toml --log-level debug --port 9090
//!
//! # No Redis: cache and tags live in process memory
//! drift --memory-store
//! ```

mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use drift_config::{Config, LogConfig, LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Drift - compares vendor-reported ad metrics with pipeline-computed ones
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, env = "DRIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// HTTP port. Overrides config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep cache and tags in process memory instead of Redis
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    config
        .apply_env()
        .context("invalid environment override")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let log_level = resolve_log_level(cli.log_level.as_deref(), &config.log)?;
    init_logging(&config.log, log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "(defaults)".into()),
        memory_store = cli.memory_store,
        "drift starting"
    );

    if let Err(e) = serve::run(config, cli.memory_store).await {
        tracing::error!(error = %format!("{:#}", e), "server error");
        return Err(e);
    }

    tracing::info!("drift shutdown complete");
    Ok(())
}

/// Explicit path must exist; without one, every section takes its default
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            Config::from_file(path).context("failed to load configuration")
        }
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default info
fn resolve_log_level(cli_level: Option<&str>, log: &LogConfig) -> Result<LogLevel> {
    match cli_level {
        Some(level) => level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!("invalid --log-level: {}", e)),
        None => Ok(log.level),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, level: LogLevel) -> Result<()> {
    let filter = EnvFilter::try_new(log.directive(level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}
