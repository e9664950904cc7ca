//! JSON field helpers for exchange payloads.
//!
//! Binance encodes prices and quantities as strings and ids/times as numbers,
//! but both forms are accepted everywhere.

use serde_json::Value;

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() { fast_float2::parse(s).ok() } else { v.as_f64() }
}

/// Parse a JSON value (string or number) as `i64`.
#[inline]
pub fn parse_str_i64(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() { s.parse().ok() } else { v.as_i64() }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

/// Parse a named field on a JSON object as `i64` (string or number).
#[inline]
pub fn parse_i64_field(v: &Value, key: &str) -> Option<i64> {
    parse_str_i64(v.get(key))
}

/// Boolean field; a missing field reads as `false`.
#[inline]
pub fn bool_field(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_as_strings_or_numbers() {
        let v = json!({ "p": "42000.50", "q": 0.25, "n": "17", "t": 1700000000000i64, "bad": "x" });
        assert_eq!(parse_f64_field(&v, "p"), Some(42000.5));
        assert_eq!(parse_f64_field(&v, "q"), Some(0.25));
        assert_eq!(parse_i64_field(&v, "n"), Some(17));
        assert_eq!(parse_i64_field(&v, "t"), Some(1_700_000_000_000));
        assert_eq!(parse_f64_field(&v, "bad"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
    }

    #[test]
    fn missing_bool_is_false() {
        let v = json!({ "m": true });
        assert!(bool_field(&v, "m"));
        assert!(!bool_field(&v, "x"));
    }
}
