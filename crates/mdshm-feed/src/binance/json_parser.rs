//! Binance USD-M futures JSON parser.
//!
//! Handles combined-stream frames (`{"stream": "...", "data": {...}}`) and
//! bare event objects. Only `aggTrade` and `kline` events produce output;
//! everything else (subscription acks, other event types) is ignored.

use serde_json::Value;

use crate::event::{FeedEvent, FeedPayload};
use crate::json_util::{bool_field, parse_f64_field, parse_i64_field};
use mdshm_core::{KlineRecord, TradeRecord};

/// Parse one text frame. Returns `None` for frames that carry no market data
/// or are missing required fields.
pub fn parse_message(text: &str) -> Option<FeedEvent> {
    let v: Value = serde_json::from_str(text).ok()?;
    let data = v.get("data").unwrap_or(&v);
    let stream = v.get("stream").and_then(Value::as_str);

    let payload = match data.get("e")?.as_str()? {
        "aggTrade" => FeedPayload::Trade(parse_agg_trade(data)?),
        "kline" => FeedPayload::Kline(parse_kline(data.get("k")?)?),
        _ => return None,
    };

    Some(FeedEvent { symbol: event_symbol(data, stream)?, payload, frame_len: text.len() })
}

/// The `s` field, or the symbol part of the stream name (`btcusdt@aggTrade`).
fn event_symbol(data: &Value, stream: Option<&str>) -> Option<String> {
    if let Some(s) = data.get("s").and_then(Value::as_str) {
        return Some(s.to_ascii_uppercase());
    }
    let (sym, _) = stream?.split_once('@')?;
    Some(sym.to_ascii_uppercase())
}

fn parse_agg_trade(v: &Value) -> Option<TradeRecord> {
    Some(TradeRecord {
        event_time: parse_i64_field(v, "E")?,
        trade_time: parse_i64_field(v, "T")?,
        price: parse_f64_field(v, "p")?,
        quantity: parse_f64_field(v, "q")?,
        trade_id: parse_i64_field(v, "a")?,
        is_buyer_maker: bool_field(v, "m"),
    })
}

fn parse_kline(k: &Value) -> Option<KlineRecord> {
    Some(KlineRecord {
        open_time: parse_i64_field(k, "t")?,
        close_time: parse_i64_field(k, "T")?,
        open: parse_f64_field(k, "o")?,
        close: parse_f64_field(k, "c")?,
        high: parse_f64_field(k, "h")?,
        low: parse_f64_field(k, "l")?,
        volume: parse_f64_field(k, "v")?,
        num_trades: parse_i64_field(k, "n")?,
        is_final: bool_field(k, "x"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGG_TRADE: &str = r#"{"stream":"btcusdt@aggTrade","data":{"e":"aggTrade","E":1700000000123,"a":5933014,"s":"BTCUSDT","p":"42000.10","q":"0.015","f":100,"l":105,"T":1700000000120,"m":true}}"#;

    const KLINE: &str = r#"{"stream":"ethusdt@kline_1m","data":{"e":"kline","E":1700000000500,"s":"ETHUSDT","k":{"t":1699999980000,"T":1700000039999,"s":"ETHUSDT","i":"1m","f":1,"L":2,"o":"2000.00","c":"2001.50","h":"2002.00","l":"1999.75","v":"123.456","n":42,"x":false,"q":"0","V":"0","Q":"0","B":"0"}}}"#;

    #[test]
    fn agg_trade_frame() {
        let ev = parse_message(AGG_TRADE).unwrap();
        assert_eq!(ev.symbol, "BTCUSDT");
        assert_eq!(ev.frame_len, AGG_TRADE.len());
        assert_eq!(
            ev.payload,
            FeedPayload::Trade(TradeRecord {
                event_time: 1_700_000_000_123,
                trade_time: 1_700_000_000_120,
                price: 42000.10,
                quantity: 0.015,
                trade_id: 5_933_014,
                is_buyer_maker: true,
            })
        );
    }

    #[test]
    fn kline_frame() {
        let ev = parse_message(KLINE).unwrap();
        assert_eq!(ev.symbol, "ETHUSDT");
        let FeedPayload::Kline(k) = ev.payload else { panic!("expected kline") };
        assert_eq!(k.open_time, 1_699_999_980_000);
        assert_eq!(k.close_time, 1_700_000_039_999);
        assert_eq!(k.open, 2000.0);
        assert_eq!(k.close, 2001.5);
        assert_eq!(k.high, 2002.0);
        assert_eq!(k.low, 1999.75);
        assert_eq!(k.volume, 123.456);
        assert_eq!(k.num_trades, 42);
        assert!(!k.is_final);
    }

    #[test]
    fn symbol_falls_back_to_stream_name() {
        let bare = r#"{"e":"aggTrade","E":1,"a":2,"p":"1","q":"1","T":1,"m":false}"#;
        assert!(parse_message(bare).is_none());

        let with_stream = r#"{"stream":"solusdt@aggTrade","data":{"e":"aggTrade","E":1,"a":2,"p":"1","q":"1","T":1,"m":false}}"#;
        assert_eq!(parse_message(with_stream).unwrap().symbol, "SOLUSDT");
    }

    #[test]
    fn non_market_frames_are_ignored() {
        assert!(parse_message(r#"{"result":null,"id":1}"#).is_none());
        let book = r#"{"stream":"x@bookTicker","data":{"e":"bookTicker","s":"X"}}"#;
        assert!(parse_message(book).is_none());
        assert!(parse_message("not json").is_none());
        // Required field missing.
        let no_price = r#"{"data":{"e":"aggTrade","s":"BTCUSDT","E":1,"T":1,"q":"1","a":1}}"#;
        assert!(parse_message(no_price).is_none());
    }
}
