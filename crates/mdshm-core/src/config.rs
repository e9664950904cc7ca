//! Collector configuration.
//!
//! Settings come from an optional JSON file; every field has a default, so an
//! empty object (or no file at all) is a valid config. Command-line flags are
//! applied on top by the binary.
//!
//! # Example
//!
//! ```json
//! {
//!   "logging": { "level": "info", "dir": "/tmp/log" },
//!   "feed": {
//!     "symbols": ["BTCUSDT", "ETHUSDT"],
//!     "ws_base_url": "wss://fstream.binance.com/stream",
//!     "kline_interval": "1m",
//!     "cpu_affinity_ingest": 2
//!   },
//!   "shm": { "name": "/binance_market_data", "size": 67108864, "publish_interval_ms": 500 },
//!   "output_dir": "./data",
//!   "stats_interval_sec": 5
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MdShmError;
use crate::ring::RING_CAPACITY;
use crate::shm::layout::{
    DEFAULT_SHM_NAME, DEFAULT_SHM_SIZE, HEADER_SIZE, MAX_SYMBOLS, SIZE_FIELD_LEN,
};

pub const DEFAULT_WS_BASE_URL: &str = "wss://fstream.binance.com/stream";

/// Top-level collector config, deserialized from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub logging: LoggingConfig,
    pub feed: FeedConfig,
    pub shm: ShmConfig,
    /// Root of the per-symbol on-disk logs.
    pub output_dir: String,
    /// Period of the stats table in seconds.
    pub stats_interval_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub symbols: Vec<String>,
    /// Combined-stream endpoint, without the query string.
    pub ws_base_url: String,
    pub kline_interval: String,
    /// Bound of the channel between the WebSocket task and the ingest thread.
    pub channel_capacity: usize,
    /// Records kept per symbol and kind.
    pub ring_capacity: usize,
    /// CPU core for the ingest thread.
    pub cpu_affinity_ingest: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShmConfig {
    pub name: String,
    pub size: usize,
    /// Serializer period. Publishing itself is rate-limited to once a second.
    pub publish_interval_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), dir: None }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            ws_base_url: DEFAULT_WS_BASE_URL.into(),
            kline_interval: "1m".into(),
            channel_capacity: 65_536,
            ring_capacity: RING_CAPACITY,
            cpu_affinity_ingest: None,
        }
    }
}

impl Default for ShmConfig {
    fn default() -> Self {
        Self { name: DEFAULT_SHM_NAME.into(), size: DEFAULT_SHM_SIZE, publish_interval_ms: 500 }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            feed: FeedConfig::default(),
            shm: ShmConfig::default(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            stats_interval_sec: DEFAULT_STATS_INTERVAL_SEC,
        }
    }
}

const DEFAULT_OUTPUT_DIR: &str = "./data";
const DEFAULT_STATS_INTERVAL_SEC: u64 = 5;

impl CollectorConfig {
    /// Canonicalize symbols and reject values the collector cannot run with.
    ///
    /// Symbols are trimmed and uppercased; empty entries and repeats are
    /// dropped. More than [`MAX_SYMBOLS`] symbols is not an error: the list is
    /// cut to the first [`MAX_SYMBOLS`] with a warning.
    pub fn normalize(&mut self) -> Result<(), MdShmError> {
        let mut symbols: Vec<String> = Vec::with_capacity(self.feed.symbols.len());
        for raw in &self.feed.symbols {
            let sym = raw.trim().to_ascii_uppercase();
            if !sym.is_empty() && !symbols.contains(&sym) {
                symbols.push(sym);
            }
        }
        if symbols.len() > MAX_SYMBOLS {
            warn!(
                "{} symbols configured, only the first {MAX_SYMBOLS} are used: {}",
                symbols.len(),
                symbols[..MAX_SYMBOLS].join(",")
            );
            symbols.truncate(MAX_SYMBOLS);
        }
        self.feed.symbols = symbols;

        if self.feed.symbols.is_empty() {
            return Err(MdShmError::Config("no symbols configured".into()));
        }
        if self.output_dir.is_empty() {
            self.output_dir = DEFAULT_OUTPUT_DIR.into();
        }
        if self.stats_interval_sec == 0 {
            self.stats_interval_sec = DEFAULT_STATS_INTERVAL_SEC;
        }
        if self.shm.publish_interval_ms == 0 {
            return Err(MdShmError::Config("shm.publish_interval_ms must be positive".into()));
        }
        if self.shm.size < HEADER_SIZE + MAX_SYMBOLS * SIZE_FIELD_LEN {
            return Err(MdShmError::Config(format!("shm.size {} is too small", self.shm.size)));
        }
        if self.feed.channel_capacity == 0 || self.feed.ring_capacity == 0 {
            return Err(MdShmError::Config(
                "feed.channel_capacity and feed.ring_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Load and parse a JSON config file. Missing fields take their defaults.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<CollectorConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CollectorConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let cfg: CollectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.shm.name, DEFAULT_SHM_NAME);
        assert_eq!(cfg.shm.size, DEFAULT_SHM_SIZE);
        assert_eq!(cfg.shm.publish_interval_ms, 500);
        assert_eq!(cfg.feed.kline_interval, "1m");
        assert_eq!(cfg.feed.ring_capacity, RING_CAPACITY);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.output_dir, "./data");
        assert_eq!(cfg.stats_interval_sec, 5);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let json = r#"{ "feed": { "symbols": ["btcusdt"] }, "shm": { "size": 1048576 } }"#;
        let cfg: CollectorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.feed.symbols, vec!["btcusdt"]);
        assert_eq!(cfg.feed.ws_base_url, DEFAULT_WS_BASE_URL);
        assert_eq!(cfg.shm.size, 1 << 20);
        assert_eq!(cfg.shm.name, DEFAULT_SHM_NAME);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.json");
        std::fs::write(&path, r#"{ "feed": { "symbols": ["ETHUSDT"] } }"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.output_dir, "./data");
        assert_eq!(cfg.stats_interval_sec, 5);
        assert_eq!(cfg.feed.symbols, vec!["ETHUSDT"]);
    }

    #[test]
    fn load_config_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_config(&path).is_err());
        assert!(load_config(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn normalize_uppercases_dedups_and_caps() {
        let mut cfg = CollectorConfig::default();
        cfg.feed.symbols = vec![" btcusdt ".into(), "BTCUSDT".into(), "".into()];
        cfg.feed.symbols.extend((0..12).map(|i| format!("sym{i}")));
        cfg.normalize().unwrap();

        assert_eq!(cfg.feed.symbols.len(), MAX_SYMBOLS);
        assert_eq!(cfg.feed.symbols[0], "BTCUSDT");
        assert_eq!(cfg.feed.symbols[1], "SYM0");
    }

    #[test]
    fn normalize_rejects_unusable_values() {
        let mut cfg = CollectorConfig::default();
        assert!(cfg.normalize().is_err());

        cfg.feed.symbols = vec!["BTCUSDT".into()];
        cfg.shm.size = 100;
        assert!(cfg.normalize().is_err());

        cfg.shm.size = DEFAULT_SHM_SIZE;
        cfg.shm.publish_interval_ms = 0;
        assert!(cfg.normalize().is_err());
    }
}
