//! Wall-clock helpers.
//!
//! `clock_gettime(CLOCK_REALTIME)` on Linux, `SystemTime` elsewhere.

#[cfg(target_os = "linux")]
#[inline]
fn clock_realtime() -> (u64, u64) {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: CLOCK_REALTIME is always valid. On failure ts stays zeroed,
    // which reads as the epoch.
    unsafe {
        libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts);
    }
    (ts.tv_sec as u64, ts.tv_nsec as u64)
}

#[cfg(not(target_os = "linux"))]
#[inline]
fn clock_realtime() -> (u64, u64) {
    use std::time::{SystemTime, UNIX_EPOCH};
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (d.as_secs(), d.subsec_nanos() as u64)
}

/// Milliseconds since the Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    let (sec, nsec) = clock_realtime();
    sec * 1_000 + nsec / 1_000_000
}

/// Seconds since the Unix epoch. Used for envelope receipt stamps and file
/// names.
#[inline]
pub fn now_secs() -> u64 {
    clock_realtime().0
}
