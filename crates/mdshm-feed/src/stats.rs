//! Periodic statistics table for the collector.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use mdshm_core::context::{MarketContext, StatsSnapshot};
use tracing::info;

const MB: f64 = 1024.0 * 1024.0;

/// Renders per-symbol counters and rates since the previous report.
pub struct StatsReporter {
    ctx: Arc<MarketContext>,
    previous: Vec<StatsSnapshot>,
    previous_at: Instant,
}

impl StatsReporter {
    pub fn new(ctx: Arc<MarketContext>) -> Self {
        let previous = vec![StatsSnapshot::default(); ctx.len()];
        Self { ctx, previous, previous_at: Instant::now() }
    }

    /// Log the table.
    pub fn report(&mut self) {
        let table = self.render(Instant::now());
        info!("[stats]\n{table}");
    }

    /// Build the table for the window ending at `now` and start a new window.
    pub fn render(&mut self, now: Instant) -> String {
        let secs = now.saturating_duration_since(self.previous_at).as_secs_f64().max(1e-3);
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{:<12}| {:>11} | {:>11} | {:>12} | {:>8}",
            "Symbol", "Trades", "Klines", "Messages/sec", "MB/sec"
        );
        let _ = writeln!(out, "{:-<12}|{:-<13}|{:-<13}|{:-<14}|{:-<9}", "", "", "", "", "");
        for (state, prev) in self.ctx.symbols().iter().zip(self.previous.iter_mut()) {
            let snap = state.stats.snapshot();
            let msg_rate = snap.messages.saturating_sub(prev.messages) as f64 / secs;
            let mb_rate = snap.bytes.saturating_sub(prev.bytes) as f64 / MB / secs;
            let _ = writeln!(
                out,
                "{:<12}| {:>11} | {:>11} | {:>12.2} | {:>8.2}",
                state.name(),
                snap.trades,
                snap.klines,
                msg_rate,
                mb_rate
            );
            *prev = snap;
        }

        let publish = &self.ctx.publish;
        let _ = writeln!(
            out,
            "shm: write_counter={} last_update={}",
            publish.write_counter.load(Ordering::Relaxed),
            publish.last_update_secs.load(Ordering::Relaxed)
        );
        let _ = write!(out, "buffered:");
        for state in self.ctx.symbols() {
            let (trades, klines) = {
                let bufs = state.lock();
                (bufs.trades.len(), bufs.klines.len())
            };
            let _ = write!(out, " {}={}/{}", state.name(), trades, klines);
        }

        self.previous_at = now;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rates_cover_the_last_window_only() {
        let ctx = Arc::new(MarketContext::new(&["BTCUSDT".to_string()]).unwrap());
        let mut reporter = StatsReporter::new(ctx.clone());
        let start = reporter.previous_at;

        let btc = ctx.resolve("BTCUSDT").unwrap();
        btc.stats.message_count.store(100, Ordering::Relaxed);
        btc.stats.trade_count.store(60, Ordering::Relaxed);
        btc.stats.kline_count.store(40, Ordering::Relaxed);
        btc.stats.bytes_processed.store(10 * 1024 * 1024, Ordering::Relaxed);
        btc.lock().push_trade("BTCUSDT", 1, Default::default());
        ctx.publish.write_counter.store(9, Ordering::Relaxed);

        let first = reporter.render(start + Duration::from_secs(10));
        assert!(first.contains("BTCUSDT"), "{first}");
        assert!(first.contains("10.00"), "{first}");
        assert!(first.contains("1.00"), "{first}");
        assert!(first.contains("write_counter=9"), "{first}");
        assert!(first.contains("BTCUSDT=1/0"), "{first}");

        // No new messages: the rate drops to zero.
        let second = reporter.render(start + Duration::from_secs(15));
        assert!(second.contains("0.00"), "{second}");
    }
}
