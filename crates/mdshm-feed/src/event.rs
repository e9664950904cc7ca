//! Decoded feed events handed from the WebSocket task to the ingest thread.

use mdshm_core::{KlineRecord, RecordKind, TradeRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedPayload {
    Trade(TradeRecord),
    Kline(KlineRecord),
}

impl FeedPayload {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Trade(_) => RecordKind::Trade,
            Self::Kline(_) => RecordKind::Kline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    /// Exchange symbol as received, e.g. `BTCUSDT`.
    pub symbol: String,
    pub payload: FeedPayload,
    /// Size of the frame this event came from, for throughput stats.
    pub frame_len: usize,
}
