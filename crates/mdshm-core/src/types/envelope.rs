//! The envelope that precedes every record inside a shared-memory slot.
//!
//! ```text
//! Envelope (32 bytes)
//!   kind u32 | length u32 | timestamp i64 (receipt, unix seconds) | symbol [u8; 16]
//! ```
//!
//! The kind is stored as a raw tag so that a reader can represent (and skip)
//! envelopes whose tag it does not recognise.

use super::record::{RecordKind, WireRecord};
use super::symbol::{SYMBOL_LEN, symbol_from_bytes, symbol_matches, symbol_to_bytes};
use crate::codec::{ByteReader, ByteWriter};
use crate::error::Result;

/// Encoded size of an [`Envelope`].
pub const ENVELOPE_LEN: usize = 4 + 4 + 8 + SYMBOL_LEN;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    tag: u32,
    /// Byte count of the record that follows.
    pub length: u32,
    /// Local receipt time in seconds since the Unix epoch.
    pub timestamp: i64,
    pub symbol: [u8; SYMBOL_LEN],
}

impl Envelope {
    /// Build the envelope for a record of type `T`.
    pub fn for_record<T: WireRecord>(symbol: &str, timestamp: i64) -> Self {
        Self {
            tag: T::KIND.tag(),
            length: T::WIRE_LEN as u32,
            timestamp,
            symbol: symbol_to_bytes(symbol),
        }
    }

    /// The record kind, or `None` if the tag is not recognised.
    #[inline]
    pub fn kind(&self) -> Option<RecordKind> {
        RecordKind::from_tag(self.tag)
    }

    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    #[inline]
    pub fn symbol_str(&self) -> &str {
        symbol_from_bytes(&self.symbol)
    }

    #[inline]
    pub fn is_for(&self, symbol: &str) -> bool {
        symbol_matches(&self.symbol, symbol)
    }

    pub fn encode(&self, w: &mut ByteWriter<'_>) -> Result<()> {
        w.put_u32(self.tag)?;
        w.put_u32(self.length)?;
        w.put_i64(self.timestamp)?;
        w.put_bytes(&self.symbol)
    }

    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            tag: r.read_u32()?,
            length: r.read_u32()?,
            timestamp: r.read_i64()?,
            symbol: r.read_array()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KlineRecord, TradeRecord};

    #[test]
    fn envelope_len() {
        assert_eq!(ENVELOPE_LEN, 32);
    }

    #[test]
    fn for_record_sets_kind_and_length() {
        let env = Envelope::for_record::<KlineRecord>("BTCUSDT", 1_700_000_000);
        assert_eq!(env.kind(), Some(RecordKind::Kline));
        assert_eq!(env.length, 65);
        assert!(env.is_for("btcusdt"));

        let env = Envelope::for_record::<TradeRecord>("ETHUSDT", 0);
        assert_eq!(env.kind(), Some(RecordKind::Trade));
        assert_eq!(env.length, 41);
    }

    #[test]
    fn encode_decode() {
        let env = Envelope::for_record::<TradeRecord>("BTCUSDT", 1_700_000_123);
        let mut buf = [0u8; ENVELOPE_LEN];
        env.encode(&mut ByteWriter::new(&mut buf)).unwrap();
        assert_eq!(&buf[..4], &1u32.to_le_bytes());
        assert_eq!(&buf[16..23], b"BTCUSDT");

        let back = Envelope::decode(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(back, env);
        assert_eq!(back.symbol_str(), "BTCUSDT");
    }

    #[test]
    fn unknown_tag_has_no_kind() {
        let mut buf = [0u8; ENVELOPE_LEN];
        buf[0] = 9;
        let env = Envelope::decode(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(env.kind(), None);
        assert_eq!(env.tag(), 9);
    }
}
