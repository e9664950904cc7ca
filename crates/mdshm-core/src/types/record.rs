//! Fixed-width market data records.
//!
//! # Wire layout
//!
//! ```text
//! TradeRecord (41 bytes)
//!   event_time i64 | trade_time i64 | price f64 | quantity f64 | trade_id i64 | is_buyer_maker u8
//!
//! KlineRecord (65 bytes)
//!   open_time i64 | close_time i64 | open f64 | close f64 | high f64 | low f64
//!   | volume f64 | num_trades i64 | is_final u8
//! ```
//!
//! Times are exchange milliseconds since the Unix epoch.

use crate::codec::{ByteReader, ByteWriter};
use crate::error::Result;

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// Discriminates the two record kinds carried through the segment.
///
/// The discriminant is the tag written into each envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordKind {
    Trade = 1,
    Kline = 2,
}

impl RecordKind {
    #[inline]
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Map an envelope tag back to a kind. Unknown tags return `None`.
    #[inline]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Trade),
            2 => Some(Self::Kline),
            _ => None,
        }
    }

    /// Exact encoded size of a record of this kind.
    #[inline]
    pub fn wire_len(self) -> usize {
        match self {
            Self::Trade => TradeRecord::WIRE_LEN,
            Self::Kline => KlineRecord::WIRE_LEN,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trade => write!(f, "trade"),
            Self::Kline => write!(f, "kline"),
        }
    }
}

// ---------------------------------------------------------------------------
// WireRecord
// ---------------------------------------------------------------------------

/// A record with a fixed-width packed encoding.
pub trait WireRecord: Copy + Default + Send + 'static {
    const KIND: RecordKind;
    const WIRE_LEN: usize;

    fn encode(&self, w: &mut ByteWriter<'_>) -> Result<()>;
    fn decode(r: &mut ByteReader<'_>) -> Result<Self>;

    /// Encode into a new `Vec` of exactly `WIRE_LEN` bytes.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; Self::WIRE_LEN];
        self.encode(&mut ByteWriter::new(&mut buf))?;
        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// TradeRecord
// ---------------------------------------------------------------------------

/// A single (aggregated) trade execution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeRecord {
    pub event_time: i64,
    pub trade_time: i64,
    pub price: f64,
    pub quantity: f64,
    pub trade_id: i64,
    pub is_buyer_maker: bool,
}

impl WireRecord for TradeRecord {
    const KIND: RecordKind = RecordKind::Trade;
    const WIRE_LEN: usize = 8 * 5 + 1;

    fn encode(&self, w: &mut ByteWriter<'_>) -> Result<()> {
        w.put_i64(self.event_time)?;
        w.put_i64(self.trade_time)?;
        w.put_f64(self.price)?;
        w.put_f64(self.quantity)?;
        w.put_i64(self.trade_id)?;
        w.put_flag(self.is_buyer_maker)
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            event_time: r.read_i64()?,
            trade_time: r.read_i64()?,
            price: r.read_f64()?,
            quantity: r.read_f64()?,
            trade_id: r.read_i64()?,
            is_buyer_maker: r.read_flag()?,
        })
    }
}

impl std::fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = if self.is_buyer_maker { "SELL" } else { "BUY" };
        write!(f, "Trade({side} {:.8}x{:.8} id={})", self.price, self.quantity, self.trade_id)
    }
}

// ---------------------------------------------------------------------------
// KlineRecord
// ---------------------------------------------------------------------------

/// A candlestick (kline) update. `is_final` marks the closing update of a bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KlineRecord {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub num_trades: i64,
    pub is_final: bool,
}

impl WireRecord for KlineRecord {
    const KIND: RecordKind = RecordKind::Kline;
    const WIRE_LEN: usize = 8 * 8 + 1;

    fn encode(&self, w: &mut ByteWriter<'_>) -> Result<()> {
        w.put_i64(self.open_time)?;
        w.put_i64(self.close_time)?;
        w.put_f64(self.open)?;
        w.put_f64(self.close)?;
        w.put_f64(self.high)?;
        w.put_f64(self.low)?;
        w.put_f64(self.volume)?;
        w.put_i64(self.num_trades)?;
        w.put_flag(self.is_final)
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            open_time: r.read_i64()?,
            close_time: r.read_i64()?,
            open: r.read_f64()?,
            close: r.read_f64()?,
            high: r.read_f64()?,
            low: r.read_f64()?,
            volume: r.read_f64()?,
            num_trades: r.read_i64()?,
            is_final: r.read_flag()?,
        })
    }
}

impl std::fmt::Display for KlineRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Kline(o={:.8} h={:.8} l={:.8} c={:.8} v={:.8} n={}{})",
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.num_trades,
            if self.is_final { " final" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            event_time: 1_672_515_782_136,
            trade_time: 1_672_515_782_130,
            price: 16500.5,
            quantity: 0.001,
            trade_id: 123_456_789,
            is_buyer_maker: true,
        }
    }

    #[test]
    fn wire_sizes() {
        assert_eq!(TradeRecord::WIRE_LEN, 41);
        assert_eq!(KlineRecord::WIRE_LEN, 65);
        assert_eq!(RecordKind::Trade.wire_len(), 41);
        assert_eq!(RecordKind::Kline.wire_len(), 65);
    }

    #[test]
    fn trade_layout_is_packed_le() {
        let bytes = sample_trade().to_bytes().unwrap();
        assert_eq!(bytes.len(), 41);
        assert_eq!(&bytes[..8], &1_672_515_782_136i64.to_le_bytes());
        assert_eq!(&bytes[16..24], &16500.5f64.to_le_bytes());
        assert_eq!(&bytes[32..40], &123_456_789i64.to_le_bytes());
        assert_eq!(bytes[40], 1);

        let back = TradeRecord::decode(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(back, sample_trade());
    }

    #[test]
    fn kline_decode_rejects_short_input() {
        let bytes = [0u8; 64];
        assert!(KlineRecord::decode(&mut ByteReader::new(&bytes)).is_err());
    }

    #[test]
    fn kind_tags() {
        assert_eq!(RecordKind::from_tag(1), Some(RecordKind::Trade));
        assert_eq!(RecordKind::from_tag(2), Some(RecordKind::Kline));
        assert_eq!(RecordKind::from_tag(0), None);
        assert_eq!(RecordKind::from_tag(3), None);
        assert_eq!(RecordKind::Kline.tag(), 2);
    }
}
