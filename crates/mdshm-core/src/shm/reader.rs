//! Consumer side of the segment.
//!
//! A reader never trusts the mapping: the header is validated on attach, the
//! slot size field is checked against the slot budget, and every envelope is
//! checked before its record is decoded. Decoding works on a private copy of
//! the slot payload so the writer may keep rewriting the mapping underneath.

use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::Mmap;
use tracing::{debug, info};

use super::layout::{
    OFF_LAST_UPDATE, OFF_WRITE_COUNTER, SIZE_FIELD_LEN, SegmentLayout, header_counter,
};
use super::segment;
use crate::codec::{ByteReader, align_up};
use crate::error::{MdShmError, Result};
use crate::types::{Envelope, KlineRecord, RecordKind, TradeRecord, WireRecord};

/// Alignment the decoder snaps to after skipping an unusable envelope.
const RESYNC_ALIGN: usize = 8;

// ---------------------------------------------------------------------------
// ShmReader
// ---------------------------------------------------------------------------

/// Read-only attachment to a segment created by [`super::ShmWriter`].
pub struct ShmReader {
    name: String,
    map: Mmap,
    layout: SegmentLayout,
    symbols: Vec<String>,
}

impl ShmReader {
    /// Map the segment `name` read-only and validate its header.
    pub fn attach(name: &str) -> Result<Self> {
        let name = segment::normalize_name(name);
        let map = segment::open_read_only(&name)?;
        let (layout, symbols) = SegmentLayout::read_header(&map)?;
        info!(
            "[shm] attached {} ({} bytes, symbols: {})",
            name,
            layout.total_size,
            symbols.join(",")
        );
        Ok(Self { name, map, layout, symbols })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbol names in slot order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    pub fn write_counter(&self) -> u64 {
        self.counter(OFF_WRITE_COUNTER).load(Ordering::Acquire)
    }

    /// Unix seconds of the last published tick.
    pub fn last_update_time(&self) -> u64 {
        self.counter(OFF_LAST_UPDATE).load(Ordering::Acquire)
    }

    fn counter(&self, offset: usize) -> &AtomicU64 {
        // SAFETY: read_header checked the map covers the header; mmap is page
        // aligned and the map lives as long as `self`.
        unsafe { header_counter(self.map.as_ptr(), offset) }
    }

    /// Decode up to `max_records` records from `symbol`'s slot.
    ///
    /// The symbol is matched case-insensitively against the header table.
    /// The payload is copied out before decoding starts.
    pub fn fetch_symbol(&self, symbol: &str, max_records: usize) -> Result<SlotRecords> {
        let index = self
            .symbols
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| MdShmError::UnknownSymbol(symbol.to_string()))?;
        let range = self
            .layout
            .slot_range(index)
            .ok_or_else(|| MdShmError::Layout(format!("slot {index} lies outside the segment")))?;
        let slot = &self.map[range];

        let declared = ByteReader::new(slot).read_u64()?;
        let budget = self.layout.payload_budget();
        if declared > budget as u64 {
            return Err(MdShmError::CorruptSlot {
                symbol: self.symbols[index].clone(),
                declared,
                budget,
            });
        }
        let payload = slot[SIZE_FIELD_LEN..SIZE_FIELD_LEN + declared as usize].to_vec();
        Ok(SlotRecords::decode(&self.symbols[index], payload, max_records))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedRecord {
    Trade { envelope: Envelope, record: TradeRecord },
    Kline { envelope: Envelope, record: KlineRecord },
}

impl DecodedRecord {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::Trade { envelope, .. } | Self::Kline { envelope, .. } => envelope,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Trade { .. } => RecordKind::Trade,
            Self::Kline { .. } => RecordKind::Kline,
        }
    }
}

/// Why decoding of a slot ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All valid bytes were consumed.
    EndOfData,
    /// `max_records` records were returned.
    RecordLimit,
    /// Fewer bytes than an envelope remained.
    TruncatedEnvelope,
    /// A recognised envelope declared the wrong length or overran the data.
    BadLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    pub decoded: usize,
    pub resyncs: usize,
    /// `None` while the iterator has not finished.
    pub stop: Option<StopReason>,
    pub remaining_bytes: usize,
}

/// Finite, single-pass iterator over the records of one slot.
#[derive(Debug)]
pub struct SlotRecords {
    symbol: String,
    payload: Vec<u8>,
    pos: usize,
    max_records: usize,
    decoded: usize,
    resyncs: usize,
    stop: Option<StopReason>,
}

impl SlotRecords {
    /// Decode `payload` (the valid bytes of a slot, without the size field)
    /// as pairs belonging to `symbol`.
    pub fn decode(symbol: &str, payload: Vec<u8>, max_records: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            payload,
            pos: 0,
            max_records,
            decoded: 0,
            resyncs: 0,
            stop: None,
        }
    }

    pub fn summary(&self) -> DecodeSummary {
        DecodeSummary {
            decoded: self.decoded,
            resyncs: self.resyncs,
            stop: self.stop,
            remaining_bytes: self.payload.len().saturating_sub(self.pos),
        }
    }

    fn finish(&mut self, reason: StopReason) -> Option<DecodedRecord> {
        self.stop = Some(reason);
        None
    }
}

impl Iterator for SlotRecords {
    type Item = DecodedRecord;

    fn next(&mut self) -> Option<DecodedRecord> {
        if self.stop.is_some() {
            return None;
        }
        loop {
            if self.pos >= self.payload.len() {
                return self.finish(StopReason::EndOfData);
            }
            if self.decoded >= self.max_records {
                return self.finish(StopReason::RecordLimit);
            }

            let mut r = ByteReader::new(&self.payload);
            r.seek(self.pos);
            let Ok(envelope) = Envelope::decode(&mut r) else {
                return self.finish(StopReason::TruncatedEnvelope);
            };

            let kind = match envelope.kind() {
                Some(kind) if envelope.is_for(&self.symbol) => kind,
                _ => {
                    debug!(
                        "[shm] {} resync at {}: tag={} symbol={:?}",
                        self.symbol,
                        self.pos,
                        envelope.tag(),
                        envelope.symbol_str()
                    );
                    self.resyncs += 1;
                    self.pos = align_up(r.position(), RESYNC_ALIGN);
                    continue;
                }
            };

            if envelope.length as usize != kind.wire_len() || r.remaining() < kind.wire_len() {
                return self.finish(StopReason::BadLength);
            }
            let decoded = match kind {
                RecordKind::Trade => TradeRecord::decode(&mut r)
                    .map(|record| DecodedRecord::Trade { envelope, record }),
                RecordKind::Kline => KlineRecord::decode(&mut r)
                    .map(|record| DecodedRecord::Kline { envelope, record }),
            };
            return match decoded {
                Ok(item) => {
                    self.pos = r.position();
                    self.decoded += 1;
                    Some(item)
                }
                Err(_) => self.finish(StopReason::BadLength),
            };
        }
    }
}
