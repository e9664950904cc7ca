//! # mdshm-core
//!
//! Core crate for the market data shared-memory distribution system, providing:
//!
//! - **Types** (`types`): fixed-width trade/kline records, envelopes, symbol utils
//! - **Byte codec** (`codec`): bounds-checked cursors over byte ranges
//! - **Ring buffer** (`ring`): per-symbol circular store of recent records
//! - **Context** (`context`): symbol table and per-symbol state shared by all threads
//! - **Shared memory** (`shm`): segment layout, writer (producer) and reader (consumer)
//! - **Disk log** (`disk_log`): append-only per-symbol record files
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `MdShmError` via thiserror
//! - **Scheduling** (`schedule`): periodic tasks on the tokio runtime
//! - **CPU affinity** (`cpu_affinity`): thread-to-core pinning
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod codec;
pub mod config;
pub mod context;
pub mod cpu_affinity;
pub mod disk_log;
pub mod error;
pub mod logging;
pub mod ring;
pub mod schedule;
pub mod shm;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::{MdShmError, Result};
pub use types::*;
