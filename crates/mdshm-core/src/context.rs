//! Process-wide market state, built once at startup.
//!
//! [`MarketContext`] owns the symbol table and, per symbol, the mutex-guarded
//! [`SymbolBuffers`] plus lock-free counters. It is shared by `Arc` between
//! the ingestion thread, the shared-memory writer and the stats reporter.
//!
//! Lock discipline: callers hold at most one symbol's mutex at a time and
//! release it after bounded work, so there is no lock ordering to get wrong.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{MdShmError, Result};
use crate::ring::{RING_CAPACITY, SymbolBuffers};
use crate::shm::layout::MAX_SYMBOLS;
use crate::types::SYMBOL_LEN;

/// Lock-free counters for one symbol, read by the reporter.
#[derive(Debug, Default)]
pub struct SymbolStats {
    pub trade_count: AtomicU64,
    pub kline_count: AtomicU64,
    pub message_count: AtomicU64,
    pub bytes_processed: AtomicU64,
}

impl SymbolStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            trades: self.trade_count.load(Ordering::Relaxed),
            klines: self.kline_count.load(Ordering::Relaxed),
            messages: self.message_count.load(Ordering::Relaxed),
            bytes: self.bytes_processed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub trades: u64,
    pub klines: u64,
    pub messages: u64,
    pub bytes: u64,
}

/// State for one configured symbol.
#[derive(Debug)]
pub struct SymbolState {
    name: String,
    index: usize,
    buffers: Mutex<SymbolBuffers>,
    pub stats: SymbolStats,
}

impl SymbolState {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the symbol table, which is also the shared-memory slot index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lock this symbol's buffers. A poisoned lock is recovered: the buffers
    /// hold plain data and every mutation leaves them consistent.
    pub fn lock(&self) -> MutexGuard<'_, SymbolBuffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mirror of the segment header counters, updated by the writer after each
/// published tick so the reporter never touches the mapping.
#[derive(Debug, Default)]
pub struct PublishStats {
    pub write_counter: AtomicU64,
    pub last_update_secs: AtomicU64,
}

#[derive(Debug)]
pub struct MarketContext {
    symbols: Vec<SymbolState>,
    pub publish: PublishStats,
}

impl MarketContext {
    /// Build the context for `names`, in order. Names are uppercased.
    ///
    /// Fails if the list is empty, longer than [`MAX_SYMBOLS`], contains a
    /// name that does not fit the 16-byte symbol field, or repeats a name.
    pub fn new(names: &[String]) -> Result<Self> {
        Self::with_capacity(names, RING_CAPACITY)
    }

    /// Same as [`MarketContext::new`] with a custom ring capacity per kind.
    pub fn with_capacity(names: &[String], capacity: usize) -> Result<Self> {
        if names.is_empty() {
            return Err(MdShmError::Config("at least one symbol is required".into()));
        }
        if names.len() > MAX_SYMBOLS {
            return Err(MdShmError::Config(format!(
                "{} symbols configured, at most {MAX_SYMBOLS} supported",
                names.len()
            )));
        }

        let mut symbols: Vec<SymbolState> = Vec::with_capacity(names.len());
        for (index, raw) in names.iter().enumerate() {
            let name = raw.trim().to_ascii_uppercase();
            if name.is_empty() || name.len() >= SYMBOL_LEN || !name.is_ascii() {
                return Err(MdShmError::Config(format!("invalid symbol name {raw:?}")));
            }
            if symbols.iter().any(|s| s.name == name) {
                return Err(MdShmError::Config(format!("duplicate symbol {name}")));
            }
            symbols.push(SymbolState {
                name,
                index,
                buffers: Mutex::new(SymbolBuffers::with_capacity(capacity)),
                stats: SymbolStats::default(),
            });
        }

        Ok(Self { symbols, publish: PublishStats::default() })
    }

    /// Resolve a feed symbol to its state (case-insensitive).
    pub fn resolve(&self, symbol: &str) -> Option<&SymbolState> {
        self.symbols.iter().find(|s| s.name.eq_ignore_ascii_case(symbol))
    }

    pub fn symbols(&self) -> &[SymbolState] {
        &self.symbols
    }

    pub fn names(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
