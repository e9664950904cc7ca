//! Dump a collector data file (`trades_*.bin` or `klines_*.bin`) as a table.
//!
//! ```bash
//! mdshm-logdump trade data/BTCUSDT/trades_1700000000.bin 20
//! mdshm-logdump kline data/BTCUSDT/klines_1700000000.bin
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use mdshm_core::{KlineRecord, TradeRecord};
use mdshm_reader::dump::dump_log;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Trade,
    Kline,
}

/// Collector data file dumper.
#[derive(Parser, Debug)]
#[command(name = "mdshm-logdump", about = "Dump collector trade/kline data files")]
struct Cli {
    /// Record type stored in the file.
    #[arg(value_enum)]
    kind: Kind,

    /// Data file path.
    file: PathBuf,

    /// Number of records to display (default: all).
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    mdshm_core::logging::init_logging("warn", None, "mdshm-logdump");

    let limit = cli.count.map(|n| n as usize);
    let mut out = io::stdout().lock();
    match cli.kind {
        Kind::Trade => dump_log::<TradeRecord>(&mut out, &cli.file, limit),
        Kind::Kline => dump_log::<KlineRecord>(&mut out, &cli.file, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_must_be_positive() {
        assert!(Cli::try_parse_from(["mdshm-logdump", "trade", "x.bin", "0"]).is_err());
        let cli = Cli::try_parse_from(["mdshm-logdump", "kline", "x.bin", "3"]).unwrap();
        assert!(matches!(cli.kind, Kind::Kline));
        assert_eq!(cli.count, Some(3));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
