//! Text rendering of segment info and decoded slots.

use std::io::{self, Write};

use chrono::{Local, TimeZone};
use mdshm_core::MdShmError;
use mdshm_core::shm::{DecodedRecord, HEADER_SIZE, ShmReader, StopReason};
use tracing::warn;

/// Local time with millisecond precision, e.g. `2024-01-31 12:00:00.123`.
pub fn format_ms(ts_ms: i64) -> String {
    match Local.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => format!("<invalid {ts_ms}>"),
    }
}

/// Local time at second precision.
pub fn format_secs(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("<invalid {secs}>"),
    }
}

/// Segment header summary.
pub fn write_info(out: &mut impl Write, reader: &ShmReader, now_secs: u64) -> io::Result<()> {
    let last = reader.last_update_time();
    let layout = reader.layout();
    writeln!(out, "=== Market Data Shared Memory ({}) ===", reader.name())?;
    writeln!(out, "Last update: {}", format_secs(last as i64))?;
    writeln!(out, "Time since last update: {} seconds", now_secs.saturating_sub(last))?;
    writeln!(out, "Write counter: {}", reader.write_counter())?;
    writeln!(out, "Symbol count: {}", reader.symbols().len())?;
    writeln!(out, "Symbols: {}", reader.symbols().join(" "))?;
    writeln!(out)?;
    writeln!(out, "Shared memory layout:")?;
    writeln!(out, "  Header size: {HEADER_SIZE} bytes")?;
    writeln!(out, "  Data offset: {} bytes", layout.data_offset)?;
    writeln!(out, "  Slot size per symbol: {} bytes", layout.slot_size)?;
    writeln!(out, "  Total shared memory size: {} bytes", layout.total_size)?;
    writeln!(out)
}

fn write_record(out: &mut impl Write, rec: &DecodedRecord) -> io::Result<()> {
    match rec {
        DecodedRecord::Trade { record: t, .. } => {
            writeln!(
                out,
                "[TRADE] Time: {}, Event time: {}",
                format_ms(t.trade_time),
                format_ms(t.event_time)
            )?;
            writeln!(
                out,
                "        Price: {:.8}, Qty: {:.8}, TradeID: {}, BuyerMaker: {}",
                t.price, t.quantity, t.trade_id, t.is_buyer_maker as u8
            )
        }
        DecodedRecord::Kline { record: k, .. } => {
            writeln!(
                out,
                "[KLINE] Open time: {}, Close time: {}",
                format_ms(k.open_time),
                format_ms(k.close_time)
            )?;
            writeln!(
                out,
                "        OHLC: {:.8}, {:.8}, {:.8}, {:.8}, Vol: {:.8}, Trades: {}, Final: {}",
                k.open, k.high, k.low, k.close, k.volume, k.num_trades, k.is_final as u8
            )
        }
    }
}

/// Decode and print up to `max_records` records of `symbol`.
///
/// Lookup and slot errors are printed, not returned: they concern one symbol
/// and the caller moves on to the next.
pub fn write_symbol(
    out: &mut impl Write,
    reader: &ShmReader,
    symbol: &str,
    max_records: usize,
) -> io::Result<()> {
    let mut records = match reader.fetch_symbol(symbol, max_records) {
        Ok(records) => records,
        Err(MdShmError::UnknownSymbol(_)) => {
            return writeln!(out, "Symbol {symbol} not found in shared memory\n");
        }
        Err(e) => {
            warn!("{symbol}: {e}");
            return writeln!(out, "Symbol {symbol}: {e}\n");
        }
    };

    writeln!(out, "Data for symbol {}:", symbol.to_ascii_uppercase())?;
    for rec in records.by_ref() {
        write_record(out, &rec)?;
    }

    let summary = records.summary();
    if summary.resyncs > 0 {
        writeln!(out, "({} misaligned envelopes skipped)", summary.resyncs)?;
    }
    match summary.stop {
        Some(StopReason::BadLength) => writeln!(
            out,
            "Invalid record length, remaining {} bytes ignored",
            summary.remaining_bytes
        )?,
        Some(StopReason::TruncatedEnvelope) => writeln!(out, "Incomplete envelope at end of data")?,
        _ => {}
    }
    if summary.decoded == 0 {
        writeln!(out, "No data available for symbol {symbol}")?;
    } else if summary.stop == Some(StopReason::RecordLimit) {
        writeln!(out, "... more records available (showing {})", summary.decoded)?;
    }
    writeln!(out)
}

/// Every symbol in the segment, in slot order.
pub fn write_all_symbols(
    out: &mut impl Write,
    reader: &ShmReader,
    max_records: usize,
) -> io::Result<()> {
    for symbol in reader.symbols() {
        write_symbol(out, reader, symbol, max_records)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdshm_core::context::MarketContext;
    use mdshm_core::shm::ShmWriter;
    use mdshm_core::{KlineRecord, TradeRecord};

    #[test]
    fn millisecond_suffix() {
        let s = format_ms(1_700_000_000_123);
        assert!(s.ends_with(".123"), "{s}");
        assert_eq!(s.len(), "2023-11-14 22:13:20.123".len());
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn renders_segment_contents() {
        let name = format!("/mdshm_test_{}_display", std::process::id());
        let ctx = MarketContext::new(&["BTCUSDT".to_string(), "ETHUSDT".to_string()]).unwrap();
        {
            let btc = ctx.resolve("BTCUSDT").unwrap();
            let mut bufs = btc.lock();
            for id in 0..3 {
                let trade =
                    TradeRecord { trade_id: 100 + id, price: 42_000.5, ..Default::default() };
                bufs.push_trade("BTCUSDT", 1, trade);
            }
            bufs.push_kline("BTCUSDT", 1, KlineRecord { num_trades: 9, ..Default::default() });
        }
        let mut writer = ShmWriter::create(&name, 1 << 16, &ctx.names()).unwrap();
        writer.tick_at(&ctx, 1_000);

        let reader = ShmReader::attach(&name).unwrap();
        let info = render(|out| write_info(out, &reader, 5));
        assert!(info.contains("Write counter: 1"), "{info}");
        assert!(info.contains("Symbols: BTCUSDT ETHUSDT"), "{info}");
        assert!(info.contains("Time since last update: 4 seconds"), "{info}");

        let btc = render(|out| write_symbol(out, &reader, "btcusdt", 10));
        assert_eq!(btc.matches("[TRADE]").count(), 3, "{btc}");
        assert_eq!(btc.matches("[KLINE]").count(), 1, "{btc}");
        assert!(btc.contains("TradeID: 102"), "{btc}");
        assert!(btc.contains("Price: 42000.50000000"), "{btc}");

        let capped = render(|out| write_symbol(out, &reader, "BTCUSDT", 2));
        assert!(capped.contains("more records available (showing 2)"), "{capped}");

        let eth = render(|out| write_symbol(out, &reader, "ETHUSDT", 10));
        assert!(eth.contains("No data available"), "{eth}");

        let doge = render(|out| write_symbol(out, &reader, "DOGEUSDT", 10));
        assert!(doge.contains("not found"), "{doge}");
    }
}
