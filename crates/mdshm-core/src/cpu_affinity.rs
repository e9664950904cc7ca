//! Optional pinning of the collector's worker threads to CPU cores.
//!
//! Wraps `core_affinity`. Pinning is best effort: an unknown core or a
//! refused request is logged and the thread keeps running unpinned.

use tracing::{info, warn};

/// Bind the calling thread to core `core_id`. Returns whether it worked.
pub fn bind_to_core(label: &str, core_id: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    let Some(core) = core_ids.get(core_id) else {
        warn!("[{label}] CPU core {core_id} not available (system has {} cores)", core_ids.len());
        return false;
    };
    let ok = core_affinity::set_for_current(*core);
    if ok {
        info!("[{label}] bound thread to CPU core {core_id}");
    } else {
        warn!("[{label}] failed to bind thread to CPU core {core_id}");
    }
    ok
}

/// [`bind_to_core`] if a core is configured. Negative ids mean "don't pin".
pub fn maybe_bind(label: &str, core_id: Option<i32>) {
    match core_id {
        Some(id) if id >= 0 => {
            bind_to_core(label, id as usize);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_core_is_refused() {
        assert!(!bind_to_core("test", usize::MAX));
    }

    #[test]
    fn unconfigured_is_a_no_op() {
        maybe_bind("test", None);
        maybe_bind("test", Some(-1));
    }
}
