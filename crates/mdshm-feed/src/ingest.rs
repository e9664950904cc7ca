//! Ingestion: decoded feed events into disk logs, ring buffers and counters.
//!
//! Runs on one dedicated thread fed by a crossbeam channel, so events for a
//! symbol are applied in arrival order.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::Receiver;
use mdshm_core::context::MarketContext;
use mdshm_core::disk_log::SymbolLogs;
use mdshm_core::{Result, cpu_affinity, time_util};
use tracing::{error, info, warn};

use crate::event::{FeedEvent, FeedPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Published,
    /// The symbol is not configured; the event was dropped.
    UnknownSymbol,
    /// The disk append failed; the event was not published.
    DiskError,
}

pub struct Ingestor {
    ctx: Arc<MarketContext>,
    /// Indexed like `ctx.symbols()`.
    logs: Vec<SymbolLogs>,
    dropped: u64,
}

impl Ingestor {
    /// Open the disk logs of every configured symbol under `output_dir`.
    pub fn open(ctx: Arc<MarketContext>, output_dir: &Path, started_secs: u64) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        let logs = ctx
            .symbols()
            .iter()
            .map(|s| SymbolLogs::open(output_dir, s.name(), started_secs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ctx, logs, dropped: 0 })
    }

    /// Events dropped so far (unknown symbol or disk failure).
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Apply one event, stamping its envelope with `receipt_secs`.
    pub fn handle(&mut self, event: &FeedEvent, receipt_secs: i64) -> IngestOutcome {
        let Some(state) = self.ctx.resolve(&event.symbol) else {
            warn!("[ingest] data for unknown symbol {}", event.symbol);
            self.dropped += 1;
            return IngestOutcome::UnknownSymbol;
        };

        let logs = &mut self.logs[state.index()];
        let appended = match &event.payload {
            FeedPayload::Trade(t) => logs.trades.append(t),
            FeedPayload::Kline(k) => logs.klines.append(k),
        };
        if let Err(e) = appended {
            error!("[ingest] {} {} log write failed: {e}", state.name(), event.payload.kind());
            self.dropped += 1;
            return IngestOutcome::DiskError;
        }

        {
            let mut bufs = state.lock();
            match &event.payload {
                FeedPayload::Trade(t) => bufs.push_trade(state.name(), receipt_secs, *t),
                FeedPayload::Kline(k) => bufs.push_kline(state.name(), receipt_secs, *k),
            }
        }

        let stats = &state.stats;
        stats.message_count.fetch_add(1, Ordering::Relaxed);
        stats.bytes_processed.fetch_add(event.frame_len as u64, Ordering::Relaxed);
        match event.payload {
            FeedPayload::Trade(_) => stats.trade_count.fetch_add(1, Ordering::Relaxed),
            FeedPayload::Kline(_) => stats.kline_count.fetch_add(1, Ordering::Relaxed),
        };
        IngestOutcome::Published
    }
}

/// Drain `rx` on the calling thread until every sender is gone.
///
/// Intended for `spawn_blocking`; pins the thread first if `cpu_core` is set.
pub fn run_ingest_loop(
    label: &str,
    rx: Receiver<FeedEvent>,
    mut ingestor: Ingestor,
    cpu_core: Option<i32>,
) {
    cpu_affinity::maybe_bind(label, cpu_core);
    info!("[{label}] ingest loop started");

    let mut handled: u64 = 0;
    while let Ok(event) = rx.recv() {
        ingestor.handle(&event, time_util::now_secs() as i64);
        handled += 1;
    }

    info!("[{label}] ingest loop exiting: {handled} events, {} dropped", ingestor.dropped());
}
