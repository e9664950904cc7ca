//! Table dump of the collector's on-disk record logs.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use mdshm_core::disk_log::LogReader;
use mdshm_core::{KlineRecord, TradeRecord, WireRecord};

use crate::display::format_ms;

/// A record type that can be printed as one table row.
pub trait DumpRow: WireRecord {
    const TITLE: &'static str;

    fn header() -> String;
    fn row(&self) -> String;
}

impl DumpRow for TradeRecord {
    const TITLE: &'static str = "Trade";

    fn header() -> String {
        format!(
            "{:<23} | {:<23} | {:>16} | {:>16} | {:>12} | {}",
            "Event Time", "Trade Time", "Price", "Quantity", "Trade ID", "Buyer Maker"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<23} | {:<23} | {:>16.8} | {:>16.8} | {:>12} | {}",
            format_ms(self.event_time),
            format_ms(self.trade_time),
            self.price,
            self.quantity,
            self.trade_id,
            if self.is_buyer_maker { "Yes" } else { "No" }
        )
    }
}

impl DumpRow for KlineRecord {
    const TITLE: &'static str = "Kline";

    fn header() -> String {
        format!(
            "{:<23} | {:<23} | {:>14} | {:>14} | {:>14} | {:>14} | {:>16} | {:>8} | {}",
            "Open Time", "Close Time", "Open", "High", "Low", "Close", "Volume", "Trades", "Final"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<23} | {:<23} | {:>14.8} | {:>14.8} | {:>14.8} | {:>14.8} | {:>16.8} | {:>8} | {}",
            format_ms(self.open_time),
            format_ms(self.close_time),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.num_trades,
            if self.is_final { "Yes" } else { "No" }
        )
    }
}

/// Print up to `limit` records of `path` (all of them when `None`).
pub fn dump_log<T: DumpRow>(out: &mut impl Write, path: &Path, limit: Option<usize>) -> Result<()> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    let total = file_size / T::WIRE_LEN as u64;
    let shown = limit.map_or(total, |n| total.min(n as u64));

    writeln!(out, "{} data file: {}", T::TITLE, path.display())?;
    writeln!(out, "File size: {file_size} bytes")?;
    writeln!(out, "Record size: {} bytes", T::WIRE_LEN)?;
    writeln!(out, "Total records: {total}")?;
    writeln!(out)?;
    writeln!(out, "{}", T::header())?;
    writeln!(out, "{}", "-".repeat(T::header().len()))?;

    let mut reader = LogReader::<T>::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let mut printed = 0u64;
    while printed < shown {
        let Some(record) = reader.next() else { break };
        let record = record.with_context(|| format!("read failed after {printed} records"))?;
        writeln!(out, "{}", record.row())?;
        printed += 1;
    }

    writeln!(out)?;
    writeln!(out, "Displayed {printed} out of {total} records")?;
    let trailing = file_size % T::WIRE_LEN as u64;
    if trailing != 0 {
        writeln!(out, "Warning: {trailing} trailing bytes do not form a whole record")?;
    }
    Ok(())
}
