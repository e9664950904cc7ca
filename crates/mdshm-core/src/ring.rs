//! Fixed-capacity circular store of recent records plus their envelopes.
//!
//! One [`RingBuffer`] exists per symbol per record kind. The buffer itself is
//! not synchronized: both kinds for a symbol sit together in
//! [`SymbolBuffers`], which lives behind that symbol's single mutex (see
//! [`crate::context`]).
//!
//! Invariant: `count <= capacity` and `next_index < capacity`. While the
//! buffer is not full the oldest entry is at index 0; once full, `next_index`
//! points at the oldest entry and the next append overwrites it.

use crate::types::{Envelope, KlineRecord, TradeRecord, WireRecord};

/// Recent records kept per symbol and kind.
pub const RING_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    envelopes: Vec<Envelope>,
    records: Vec<T>,
    count: usize,
    next_index: usize,
}

impl<T: Copy + Default> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(RING_CAPACITY)
    }
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            envelopes: vec![Envelope::default(); capacity],
            records: vec![T::default(); capacity],
            count: 0,
            next_index: 0,
        }
    }

    /// Store one entry, evicting the oldest when full. O(1).
    #[inline]
    pub fn push(&mut self, envelope: Envelope, record: T) {
        let idx = self.next_index;
        self.envelopes[idx] = envelope;
        self.records[idx] = record;
        self.next_index = (idx + 1) % self.capacity();
        self.count = (self.count + 1).min(self.capacity());
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Write cursor: the slot the next `push` will fill.
    #[inline]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Iterate the buffered entries oldest-first. Each call starts over.
    pub fn iter(&self) -> RingIter<'_, T> {
        let start = if self.is_full() { self.next_index } else { 0 };
        RingIter { ring: self, start, yielded: 0 }
    }
}

/// Chronological iterator over a [`RingBuffer`].
pub struct RingIter<'a, T> {
    ring: &'a RingBuffer<T>,
    start: usize,
    yielded: usize,
}

impl<'a, T: Copy + Default> Iterator for RingIter<'a, T> {
    type Item = (&'a Envelope, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded >= self.ring.count {
            return None;
        }
        let idx = (self.start + self.yielded) % self.ring.capacity();
        self.yielded += 1;
        Some((&self.ring.envelopes[idx], &self.ring.records[idx]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ring.count - self.yielded;
        (left, Some(left))
    }
}

impl<T: Copy + Default> ExactSizeIterator for RingIter<'_, T> {}

// ---------------------------------------------------------------------------
// SymbolBuffers
// ---------------------------------------------------------------------------

/// Both record kinds for one symbol, guarded together by one mutex.
#[derive(Debug, Clone, Default)]
pub struct SymbolBuffers {
    pub trades: RingBuffer<TradeRecord>,
    pub klines: RingBuffer<KlineRecord>,
}

impl SymbolBuffers {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            trades: RingBuffer::with_capacity(capacity),
            klines: RingBuffer::with_capacity(capacity),
        }
    }

    pub fn push_trade(&mut self, symbol: &str, timestamp: i64, record: TradeRecord) {
        self.trades.push(Envelope::for_record::<TradeRecord>(symbol, timestamp), record);
    }

    pub fn push_kline(&mut self, symbol: &str, timestamp: i64, record: KlineRecord) {
        self.klines.push(Envelope::for_record::<KlineRecord>(symbol, timestamp), record);
    }

    /// Bytes needed to serialize every buffered pair of both kinds.
    pub fn encoded_len(&self) -> usize {
        pair_len::<TradeRecord>() * self.trades.len()
            + pair_len::<KlineRecord>() * self.klines.len()
    }
}

/// Size of one envelope/record pair of type `T`.
#[inline]
pub const fn pair_len<T: WireRecord>() -> usize {
    crate::types::ENVELOPE_LEN + T::WIRE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: i64) -> TradeRecord {
        TradeRecord { trade_id: id, price: id as f64, ..Default::default() }
    }

    fn push_n(ring: &mut RingBuffer<TradeRecord>, range: std::ops::Range<i64>) {
        for id in range {
            ring.push(Envelope::for_record::<TradeRecord>("BTCUSDT", id), trade(id));
        }
    }

    fn ids(ring: &RingBuffer<TradeRecord>) -> Vec<i64> {
        ring.iter().map(|(_, r)| r.trade_id).collect()
    }

    #[test]
    fn empty_ring() {
        let ring = RingBuffer::<TradeRecord>::default();
        assert_eq!(ring.capacity(), RING_CAPACITY);
        assert!(ring.is_empty());
        assert_eq!(ring.iter().count(), 0);
    }

    #[test]
    fn partial_fill_keeps_arrival_order() {
        let mut ring = RingBuffer::default();
        push_n(&mut ring, 0..37);
        assert_eq!(ring.len(), 37);
        assert_eq!(ring.next_index(), 37);
        assert_eq!(ids(&ring), (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn exactly_full() {
        let mut ring = RingBuffer::default();
        push_n(&mut ring, 0..100);
        assert!(ring.is_full());
        assert_eq!(ring.next_index(), 0);
        assert_eq!(ids(&ring), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut ring = RingBuffer::default();
        push_n(&mut ring, 0..250);
        assert_eq!(ring.len(), 100);
        assert_eq!(ring.next_index(), 50);
        assert_eq!(ids(&ring), (150..250).collect::<Vec<_>>());
    }

    #[test]
    fn envelopes_travel_with_records() {
        let mut ring = RingBuffer::with_capacity(3);
        push_n(&mut ring, 0..5);
        for (env, rec) in ring.iter() {
            assert_eq!(env.timestamp, rec.trade_id);
        }
        assert_eq!(ring.iter().len(), 3);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut ring = RingBuffer::with_capacity(4);
        push_n(&mut ring, 0..6);
        assert_eq!(ids(&ring), ids(&ring));
        assert_eq!(ids(&ring), vec![2, 3, 4, 5]);
    }

    #[test]
    fn symbol_buffers_encoded_len() {
        let mut bufs = SymbolBuffers::default();
        bufs.push_trade("BTCUSDT", 1, trade(1));
        bufs.push_trade("BTCUSDT", 2, trade(2));
        bufs.push_kline("BTCUSDT", 3, KlineRecord::default());
        assert_eq!(pair_len::<TradeRecord>(), 73);
        assert_eq!(pair_len::<KlineRecord>(), 97);
        assert_eq!(bufs.encoded_len(), 2 * 73 + 97);
    }
}
