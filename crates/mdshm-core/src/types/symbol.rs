//! Fixed-size symbol utilities for shared-memory compatibility.
//!
//! Envelopes and the segment header store symbols as `[u8; 16]` ASCII,
//! null-padded. The last byte is always left as a terminator, so at most
//! `SYMBOL_LEN - 1` characters survive the conversion.

/// Length of the fixed symbol buffer used in envelopes and the header.
pub const SYMBOL_LEN: usize = 16;

/// Write a symbol string into a fixed `[u8; SYMBOL_LEN]` buffer.
///
/// The remaining bytes are zero-filled. Symbols longer than
/// `SYMBOL_LEN - 1` bytes are truncated.
#[inline]
pub fn symbol_to_bytes(s: &str) -> [u8; SYMBOL_LEN] {
    let mut buf = [0u8; SYMBOL_LEN];
    let len = s.len().min(SYMBOL_LEN - 1);
    buf[..len].copy_from_slice(&s.as_bytes()[..len]);
    buf
}

/// Read a symbol from a fixed `[u8; SYMBOL_LEN]` buffer.
///
/// Returns the string up to the first null byte. Bytes that are not valid
/// UTF-8 (a torn or corrupt field) read as `""`.
#[inline]
pub fn symbol_from_bytes(buf: &[u8; SYMBOL_LEN]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(SYMBOL_LEN);
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}

/// Case-insensitive comparison between a fixed symbol field and a name.
#[inline]
pub fn symbol_matches(buf: &[u8; SYMBOL_LEN], name: &str) -> bool {
    let stored = symbol_from_bytes(buf);
    !stored.is_empty() && stored.eq_ignore_ascii_case(name)
}
