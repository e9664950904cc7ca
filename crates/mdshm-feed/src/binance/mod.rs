//! Binance USD-M futures combined stream: aggregate trades and klines.

pub mod json_parser;

use anyhow::{Result, bail};

/// Build the combined-stream URL subscribing `<sym>@aggTrade` and
/// `<sym>@kline_<interval>` for every symbol.
///
/// ```text
/// wss://fstream.binance.com/stream?streams=btcusdt@aggTrade/btcusdt@kline_1m
/// ```
pub fn combined_stream_url(
    base_url: &str,
    symbols: &[String],
    kline_interval: &str,
) -> Result<String> {
    if symbols.is_empty() {
        bail!("no symbols to subscribe");
    }
    let mut streams = Vec::with_capacity(symbols.len() * 2);
    for s in symbols {
        let lower = s.to_ascii_lowercase();
        streams.push(format!("{lower}@aggTrade"));
        streams.push(format!("{lower}@kline_{kline_interval}"));
    }

    let url = format!("{}?streams={}", base_url.trim_end_matches('/'), streams.join("/"));
    let parsed = url::Url::parse(&url)?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        bail!("feed url must be ws:// or wss://, got {}", parsed.scheme());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_combined_url() {
        let url = combined_stream_url(
            "wss://fstream.binance.com/stream",
            &["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            "1m",
        )
        .unwrap();
        assert_eq!(
            url,
            "wss://fstream.binance.com/stream?streams=btcusdt@aggTrade/btcusdt@kline_1m/ethusdt@aggTrade/ethusdt@kline_1m"
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(combined_stream_url("wss://fstream.binance.com/stream", &[], "1m").is_err());
        let btc = ["BTCUSDT".to_string()];
        assert!(combined_stream_url("https://example.com/stream", &btc, "1m").is_err());
        assert!(combined_stream_url("not a url", &["BTCUSDT".into()], "1m").is_err());
    }
}
