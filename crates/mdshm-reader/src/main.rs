//! # mdshm-reader
//!
//! Attaches read-only to the collector's shared memory segment and prints the
//! header plus the most recent records of one or all symbols.
//!
//! # Usage
//!
//! ```bash
//! mdshm-reader                    # every symbol, once
//! mdshm-reader -s btcusdt -n 20   # one symbol, 20 records
//! mdshm-reader -c -i 500          # refresh every 500 ms
//! ```

use std::io::{self, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mdshm_core::shm::{DEFAULT_SHM_NAME, ShmReader};
use mdshm_core::time_util;
use mdshm_reader::display;
use tracing::{error, warn};

const MIN_INTERVAL_MS: u64 = 100;

/// Binance shared memory market data reader.
#[derive(Parser, Debug)]
#[command(name = "mdshm-reader", about = "Binance shared memory market data reader")]
struct Cli {
    /// Display data for this symbol only (default: all symbols).
    #[arg(short, long)]
    symbol: Option<String>,

    /// Refresh continuously.
    #[arg(short, long)]
    continuous: bool,

    /// Refresh interval in milliseconds (continuous mode, minimum 100).
    #[arg(short, long, default_value_t = 1000)]
    interval: u64,

    /// Maximum records displayed per symbol (minimum 1).
    #[arg(short = 'n', long = "num-records", default_value_t = 10)]
    num_records: usize,

    /// Shared memory segment name.
    #[arg(long, default_value = DEFAULT_SHM_NAME)]
    name: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval.max(MIN_INTERVAL_MS))
    }

    fn max_records(&self) -> usize {
        self.num_records.max(1)
    }
}

/// Render one full screen from an attached segment.
fn render(out: &mut impl Write, reader: &ShmReader, cli: &Cli) -> Result<()> {
    display::write_info(out, reader, time_util::now_secs())?;
    match &cli.symbol {
        Some(symbol) => display::write_symbol(out, reader, symbol, cli.max_records())?,
        None => display::write_all_symbols(out, reader, cli.max_records())?,
    }
    out.flush()?;
    Ok(())
}

/// Attach, then render once or keep refreshing. `refreshes` bounds the
/// continuous loop; `None` runs until the process is killed.
///
/// A failed first attach is fatal in both modes. Later re-attach failures
/// are printed and retried on the next refresh.
fn run(out: &mut impl Write, cli: &Cli, refreshes: Option<usize>) -> ExitCode {
    let first = match ShmReader::attach(&cli.name) {
        Ok(reader) => reader,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Failed to open shared memory {}: {e:#}", cli.name);
            return ExitCode::FAILURE;
        }
    };

    if !cli.continuous {
        return match render(out, &first, cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let mut reader = Some(first);
    let interval = cli.interval();
    let mut done = 0usize;
    loop {
        // Clear screen, cursor home.
        let _ = write!(out, "\x1b[2J\x1b[H");
        match &reader {
            Some(r) => {
                if let Err(e) = render(out, r, cli) {
                    warn!("{e:#}");
                }
            }
            None => {
                let _ = writeln!(out, "Waiting for shared memory {}", cli.name);
                let _ = out.flush();
            }
        }

        done += 1;
        if refreshes.is_some_and(|n| done >= n) {
            return ExitCode::SUCCESS;
        }
        thread::sleep(interval);

        // Re-attach so a restarted collector is picked up.
        reader = match ShmReader::attach(&cli.name) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("re-attach failed: {e:#}");
                None
            }
        };
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    mdshm_core::logging::init_logging(&cli.log_level, None, "mdshm-reader");
    run(&mut io::stdout().lock(), &cli, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdshm_core::context::MarketContext;
    use mdshm_core::shm::ShmWriter;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["mdshm-reader"]);
        assert!(!cli.continuous);
        assert_eq!(cli.symbol, None);
        assert_eq!(cli.max_records(), 10);
        assert_eq!(cli.interval(), Duration::from_millis(1000));
        assert_eq!(cli.name, DEFAULT_SHM_NAME);
    }

    #[test]
    fn small_values_are_clamped() {
        let cli = Cli::parse_from(["mdshm-reader", "-c", "-i", "5", "-n", "0", "-s", "ethusdt"]);
        assert!(cli.continuous);
        assert_eq!(cli.interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(cli.max_records(), 1);
        assert_eq!(cli.symbol.as_deref(), Some("ethusdt"));
    }

    #[test]
    fn missing_segment_fails() {
        let cli = Cli::parse_from(["mdshm-reader", "--name", "/mdshm_test_reader_absent"]);
        let mut buf = Vec::new();
        assert_eq!(run(&mut buf, &cli, Some(3)), ExitCode::FAILURE);
        assert!(buf.is_empty());
    }

    #[test]
    fn continuous_mode_fails_when_first_attach_fails() {
        let cli = Cli::parse_from(["mdshm-reader", "-c", "--name", "/mdshm_test_reader_absent_c"]);
        let mut buf = Vec::new();
        assert_eq!(run(&mut buf, &cli, Some(3)), ExitCode::FAILURE);
        assert!(!String::from_utf8(buf).unwrap().contains("Waiting"));
    }

    #[test]
    fn continuous_mode_refreshes_attached_segment() {
        let name = format!("/mdshm_test_{}_reader_cont", std::process::id());
        let ctx = MarketContext::new(&["BTCUSDT".to_string()]).unwrap();
        let mut writer = ShmWriter::create(&name, 1 << 16, &ctx.names()).unwrap();
        writer.tick_at(&ctx, 1_000);

        let cli = Cli::parse_from(["mdshm-reader", "-c", "-i", "100", "--name", &name]);
        let mut buf = Vec::new();
        assert_eq!(run(&mut buf, &cli, Some(2)), ExitCode::SUCCESS);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches("Write counter: 1").count(), 2, "{text}");
        assert_eq!(text.matches("\x1b[2J").count(), 2);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
