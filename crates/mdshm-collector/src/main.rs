//! # mdshm-collector
//!
//! Producer process: subscribes to Binance futures aggregate trades and 1m
//! klines, logs every record to disk, and republishes the most recent records
//! of each symbol through a named shared memory segment.
//!
//! # Usage
//!
//! ```bash
//! mdshm-collector -s btcusdt,ethusdt -o ./data
//! mdshm-collector --config collector.json --log-level debug
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mdshm_core::config::{CollectorConfig, load_config};
use mdshm_feed::Collector;
use tracing::{error, info};

/// Binance market data collector with shared memory distribution.
#[derive(Parser)]
#[command(
    name = "mdshm-collector",
    about = "Binance market data collector with shared memory distribution"
)]
struct Cli {
    /// Comma-separated symbols (e.g. btcusdt,ethusdt). Overrides the config file.
    #[arg(short, long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Output directory for data files (default: ./data).
    #[arg(short, long)]
    output: Option<String>,

    /// Configuration file path (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Shared memory segment name.
    #[arg(long)]
    shm_name: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    /// Load the config file, if any, and apply command-line overrides.
    fn resolve_config(&self) -> Result<CollectorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => CollectorConfig::default(),
        };
        if !self.symbols.is_empty() {
            config.feed.symbols = self.symbols.clone();
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(name) = &self.shm_name {
            config.shm.name = name.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_dir.is_some() {
            config.logging.dir = self.log_dir.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.resolve_config()?;

    // 1. Initialize logging
    mdshm_core::logging::init_logging(
        &config.logging.level,
        config.logging.dir.as_deref(),
        "mdshm-collector",
    );

    // 2. Validate configuration
    config.normalize()?;
    info!(
        "mdshm-collector starting: symbols={} output={} shm={} ({} bytes)",
        config.feed.symbols.join(","),
        config.output_dir,
        config.shm.name,
        config.shm.size
    );

    // 3. Data files and shared memory, then the feed
    let mut collector = Collector::new(config)?;
    collector.init()?;
    collector.start().await?;
    info!("data collection started, press Ctrl+C to stop");

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 5. Stop tasks; dropping the writer unlinks the segment
    if let Err(e) = collector.stop().await {
        error!("error during shutdown: {e:#}");
    }
    info!("cleanup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "mdshm-collector",
            "-s",
            "btcusdt,ethusdt",
            "-o",
            "/tmp/md",
            "-l",
            "debug",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.feed.symbols, vec!["btcusdt", "ethusdt"]);
        assert_eq!(config.output_dir, "/tmp/md");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.shm.name, mdshm_core::shm::DEFAULT_SHM_NAME);
    }

    #[test]
    fn no_flags_keeps_defaults() {
        let cli = Cli::parse_from(["mdshm-collector"]);
        let config = cli.resolve_config().unwrap();
        assert!(config.feed.symbols.is_empty());
        assert_eq!(config.output_dir, "./data");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
