//! Producer side of the segment.

use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::MmapMut;
use tracing::{info, warn};

use super::layout::{
    OFF_LAST_UPDATE, OFF_WRITE_COUNTER, SIZE_FIELD_LEN, SegmentLayout, header_counter,
};
use super::segment;
use crate::codec::ByteWriter;
use crate::context::MarketContext;
use crate::error::{MdShmError, Result};
use crate::ring::{RingBuffer, SymbolBuffers, pair_len};
use crate::time_util;
use crate::types::{KlineRecord, TradeRecord, WireRecord};

/// Minimum wall-clock gap between two published ticks.
pub const MIN_PUBLISH_INTERVAL_MS: u64 = 1_000;

const TRADE_PAIR: usize = pair_len::<TradeRecord>();
const KLINE_PAIR: usize = pair_len::<KlineRecord>();

// ---------------------------------------------------------------------------
// SlotPlan
// ---------------------------------------------------------------------------

/// How many pairs of each kind fit in one slot's payload budget.
///
/// Trades are placed first and may use the whole budget; klines get what is
/// left. Within each kind the oldest buffered pairs are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    pub trades: usize,
    pub klines: usize,
    pub truncated: bool,
}

impl SlotPlan {
    pub fn new(trade_count: usize, kline_count: usize, budget: usize) -> Self {
        let trades = trade_count.min(budget / TRADE_PAIR);
        let klines = kline_count.min((budget - trades * TRADE_PAIR) / KLINE_PAIR);
        Self { trades, klines, truncated: trades < trade_count || klines < kline_count }
    }

    /// Payload bytes this plan writes, excluding the size field.
    pub fn byte_len(&self) -> usize {
        self.trades * TRADE_PAIR + self.klines * KLINE_PAIR
    }
}

/// Serialize one symbol's buffers into `slot`: size field, trade pairs, then
/// kline pairs, each group oldest-first.
pub(crate) fn write_slot(slot: &mut [u8], bufs: &SymbolBuffers) -> Result<SlotPlan> {
    if slot.len() < SIZE_FIELD_LEN {
        return Err(MdShmError::OutOfBounds {
            offset: 0,
            needed: SIZE_FIELD_LEN,
            available: slot.len(),
        });
    }
    let (size_field, payload) = slot.split_at_mut(SIZE_FIELD_LEN);
    let plan = SlotPlan::new(bufs.trades.len(), bufs.klines.len(), payload.len());

    ByteWriter::new(size_field).put_u64(plan.byte_len() as u64)?;
    let mut w = ByteWriter::new(payload);
    write_oldest(&mut w, &bufs.trades, plan.trades)?;
    write_oldest(&mut w, &bufs.klines, plan.klines)?;
    debug_assert_eq!(w.position(), plan.byte_len());
    Ok(plan)
}

fn write_oldest<T: WireRecord>(
    w: &mut ByteWriter<'_>,
    ring: &RingBuffer<T>,
    keep: usize,
) -> Result<()> {
    for (envelope, record) in ring.iter().take(keep) {
        envelope.encode(w)?;
        record.encode(w)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tick results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Slots rewritten this tick.
    pub written: usize,
    /// Of those, slots that could not hold every buffered pair.
    pub truncated: usize,
    /// Symbols whose slot could not be written at all.
    pub skipped: usize,
    /// Header counter after this tick.
    pub write_counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Less than [`MIN_PUBLISH_INTERVAL_MS`] since the last published tick.
    Skipped,
    Published(TickReport),
}

// ---------------------------------------------------------------------------
// ShmWriter
// ---------------------------------------------------------------------------

/// Owner of the named segment. Dropping it unlinks the segment.
pub struct ShmWriter {
    name: String,
    map: MmapMut,
    layout: SegmentLayout,
    last_tick_ms: Option<u64>,
}

impl ShmWriter {
    /// Create the segment `name` of `total_size` bytes for `symbols`, in slot
    /// order. A stale segment with the same name is replaced.
    pub fn create(name: &str, total_size: usize, symbols: &[String]) -> Result<Self> {
        let name = segment::normalize_name(name);
        let layout = SegmentLayout::new(total_size, symbols.len())?;
        let map = segment::create(&name, total_size)?;

        let mut writer = Self { name, map, layout, last_tick_ms: None };
        writer.map.fill(0);
        layout.write_header(&mut writer.map, symbols)?;
        writer.counter(OFF_LAST_UPDATE).store(time_util::now_secs(), Ordering::Release);

        info!(
            "[shm] created {} ({} bytes, {} symbols, slot_size={})",
            writer.name, total_size, layout.symbol_count, layout.slot_size
        );
        Ok(writer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    pub fn write_counter(&self) -> u64 {
        self.counter(OFF_WRITE_COUNTER).load(Ordering::Acquire)
    }

    /// Raw view of the whole mapped segment.
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    fn counter(&self, offset: usize) -> &AtomicU64 {
        // SAFETY: the map spans at least HEADER_SIZE bytes (checked by
        // SegmentLayout::new), is page aligned, and lives as long as `self`.
        unsafe { header_counter(self.map.as_ptr(), offset) }
    }

    /// Publish every symbol's buffers if at least a second has passed since
    /// the previous published tick.
    pub fn tick(&mut self, ctx: &MarketContext) -> TickOutcome {
        self.tick_at(ctx, time_util::now_ms())
    }

    /// [`ShmWriter::tick`] with an explicit wall-clock time in milliseconds.
    pub fn tick_at(&mut self, ctx: &MarketContext, now_ms: u64) -> TickOutcome {
        let too_soon = self
            .last_tick_ms
            .and_then(|last| now_ms.checked_sub(last))
            .is_some_and(|elapsed| elapsed < MIN_PUBLISH_INTERVAL_MS);
        if too_soon {
            return TickOutcome::Skipped;
        }

        let mut report = TickReport::default();
        for state in ctx.symbols() {
            let Some(range) = self.layout.slot_range(state.index()) else {
                warn!(
                    "[shm] slot {} for {} lies outside the segment, skipped",
                    state.index(),
                    state.name()
                );
                report.skipped += 1;
                continue;
            };

            let result = {
                let bufs = state.lock();
                write_slot(&mut self.map[range], &bufs)
            };
            match result {
                Ok(plan) => {
                    report.written += 1;
                    if plan.truncated {
                        report.truncated += 1;
                        warn!(
                            "[shm] {} slot full: kept {} trades, {} klines ({} bytes)",
                            state.name(),
                            plan.trades,
                            plan.klines,
                            plan.byte_len()
                        );
                    }
                }
                Err(e) => {
                    warn!("[shm] {} slot write failed: {e}", state.name());
                    report.skipped += 1;
                }
            }
        }

        let secs = now_ms / 1_000;
        report.write_counter = self.counter(OFF_WRITE_COUNTER).fetch_add(1, Ordering::Release) + 1;
        self.counter(OFF_LAST_UPDATE).store(secs, Ordering::Release);
        ctx.publish.write_counter.store(report.write_counter, Ordering::Relaxed);
        ctx.publish.last_update_secs.store(secs, Ordering::Relaxed);
        self.last_tick_ms = Some(now_ms);

        TickOutcome::Published(report)
    }
}

impl Drop for ShmWriter {
    fn drop(&mut self) {
        match segment::unlink(&self.name) {
            Ok(()) => info!("[shm] unlinked {}", self.name),
            Err(e) => warn!("[shm] failed to unlink {}: {e}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteReader;
    use crate::shm::layout::HEADER_SIZE;
    use crate::shm::reader::{DecodedRecord, ShmReader, SlotRecords};
    use crate::types::Envelope;

    fn seg_name(tag: &str) -> String {
        format!("/mdshm_test_{}_{tag}", std::process::id())
    }

    fn names() -> Vec<String> {
        vec!["BTCUSDT".into(), "ETHUSDT".into()]
    }

    fn seed(ctx: &MarketContext, trades: i64, klines: i64) {
        let sym = ctx.resolve("BTCUSDT").unwrap();
        let mut bufs = sym.lock();
        for i in 0..trades {
            bufs.push_trade(sym.name(), i, TradeRecord { trade_id: i, ..Default::default() });
        }
        for i in 0..klines {
            bufs.push_kline(sym.name(), i, KlineRecord { open_time: i, ..Default::default() });
        }
    }

    #[test]
    fn plan_fills_trades_then_klines() {
        let plan = SlotPlan::new(2, 3, 2 * TRADE_PAIR + KLINE_PAIR + 10);
        assert_eq!(plan, SlotPlan { trades: 2, klines: 1, truncated: true });
        assert_eq!(plan.byte_len(), 2 * TRADE_PAIR + KLINE_PAIR);

        let plan = SlotPlan::new(3, 3, TRADE_PAIR + KLINE_PAIR - 1);
        assert_eq!((plan.trades, plan.klines), (1, 0));

        let plan = SlotPlan::new(5, 3, 10_000);
        assert!(!plan.truncated);
    }

    fn decode_slot(slot: &[u8]) -> Vec<DecodedRecord> {
        let len = ByteReader::new(slot).read_u64().unwrap() as usize;
        let payload = slot[SIZE_FIELD_LEN..SIZE_FIELD_LEN + len].to_vec();
        SlotRecords::decode("BTCUSDT", payload, usize::MAX).collect()
    }

    #[test]
    fn truncated_slot_keeps_oldest_trades() {
        let mut bufs = SymbolBuffers::default();
        for i in 0..5 {
            bufs.push_trade("BTCUSDT", i, TradeRecord { trade_id: i, ..Default::default() });
        }
        bufs.push_kline("BTCUSDT", 9, KlineRecord::default());

        let mut slot = vec![0u8; SIZE_FIELD_LEN + 3 * TRADE_PAIR];
        let plan = write_slot(&mut slot, &bufs).unwrap();
        assert_eq!(plan, SlotPlan { trades: 3, klines: 0, truncated: true });

        let ids: Vec<i64> = decode_slot(&slot)
            .into_iter()
            .map(|rec| match rec {
                DecodedRecord::Trade { record, .. } => record.trade_id,
                DecodedRecord::Kline { .. } => panic!("no room for klines"),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn truncated_slot_keeps_oldest_klines() {
        let mut bufs = SymbolBuffers::default();
        for i in 0..2 {
            bufs.push_trade("BTCUSDT", i, TradeRecord { trade_id: i, ..Default::default() });
        }
        for i in 1..=3 {
            bufs.push_kline("BTCUSDT", i, KlineRecord { open_time: i, ..Default::default() });
        }

        let budget = 2 * TRADE_PAIR + KLINE_PAIR + 10;
        let mut slot = vec![0u8; SIZE_FIELD_LEN + budget];
        let plan = write_slot(&mut slot, &bufs).unwrap();
        assert!(plan.truncated);

        let mut r = ByteReader::new(&slot);
        assert_eq!(r.read_u64().unwrap() as usize, 2 * TRADE_PAIR + KLINE_PAIR);
        r.seek(SIZE_FIELD_LEN + 2 * TRADE_PAIR);
        let env = Envelope::decode(&mut r).unwrap();
        assert_eq!(env.timestamp, 1);

        let records = decode_slot(&slot);
        assert_eq!(records.len(), 3);
        assert!(matches!(
            &records[2],
            DecodedRecord::Kline { record, .. } if record.open_time == 1
        ));
    }

    #[test]
    fn second_tick_within_a_second_is_skipped() {
        let ctx = MarketContext::new(&names()).unwrap();
        let mut writer = ShmWriter::create(&seg_name("rate"), 64 * 1024, &ctx.names()).unwrap();

        assert!(matches!(writer.tick_at(&ctx, 10_000), TickOutcome::Published(_)));
        assert_eq!(writer.tick_at(&ctx, 10_500), TickOutcome::Skipped);
        match writer.tick_at(&ctx, 11_000) {
            TickOutcome::Published(report) => {
                assert_eq!(report.written, 2);
                assert_eq!(report.write_counter, 2);
            }
            TickOutcome::Skipped => panic!("tick after a full second must publish"),
        }
        assert_eq!(writer.write_counter(), 2);
        assert_eq!(ctx.publish.write_counter.load(Ordering::Relaxed), 2);
        assert_eq!(ctx.publish.last_update_secs.load(Ordering::Relaxed), 11);
    }

    #[test]
    fn tick_without_new_data_is_idempotent() {
        let ctx = MarketContext::new(&names()).unwrap();
        seed(&ctx, 5, 3);
        let mut writer = ShmWriter::create(&seg_name("idem"), 64 * 1024, &ctx.names()).unwrap();

        writer.tick_at(&ctx, 1_000);
        let first = writer.bytes()[16..].to_vec();
        writer.tick_at(&ctx, 5_000);
        assert_eq!(&writer.bytes()[16..], &first[..]);
        assert_eq!(writer.write_counter(), 2);
    }

    #[test]
    fn small_segment_reports_truncation() {
        let ctx = MarketContext::new(&names()).unwrap();
        seed(&ctx, 10, 10);
        let total = HEADER_SIZE + 10 * (SIZE_FIELD_LEN + 3 * TRADE_PAIR);
        let mut writer = ShmWriter::create(&seg_name("trunc"), total, &ctx.names()).unwrap();

        match writer.tick_at(&ctx, 1_000) {
            TickOutcome::Published(report) => assert_eq!(report.truncated, 1),
            TickOutcome::Skipped => panic!("first tick must publish"),
        }
    }

    #[test]
    fn slot_outside_segment_is_skipped() {
        let ctx = MarketContext::new(&names()).unwrap();
        seed(&ctx, 3, 0);
        let mut writer = ShmWriter::create(&seg_name("outside"), 64 * 1024, &ctx.names()).unwrap();
        // Shrink the geometry so only slot 0 lies inside the segment.
        writer.layout.total_size = HEADER_SIZE + writer.layout.slot_size;

        match writer.tick_at(&ctx, 1_000) {
            TickOutcome::Published(report) => {
                assert_eq!((report.written, report.skipped), (1, 1));
                assert_eq!(report.write_counter, 1);
            }
            TickOutcome::Skipped => panic!("first tick must publish"),
        }
    }

    #[test]
    fn drop_unlinks_segment() {
        let name = seg_name("drop");
        let writer = ShmWriter::create(&name, 64 * 1024, &names()).unwrap();
        assert!(ShmReader::attach(&name).is_ok());
        drop(writer);
        assert!(matches!(ShmReader::attach(&name), Err(MdShmError::NotFound(_))));
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(ShmWriter::create(&seg_name("tiny"), 100, &names()).is_err());
        let eleven: Vec<String> = (0..11).map(|i| format!("S{i}")).collect();
        assert!(ShmWriter::create(&seg_name("many"), 64 * 1024, &eleven).is_err());
    }
}
