//! Typed error definitions for the shared-memory distribution layer.
//!
//! Provides [`MdShmError`] for domain-specific errors. All variants implement
//! `std::error::Error` via `thiserror`, so they integrate with `anyhow::Result`
//! in the binaries.

use thiserror::Error;

/// Domain-specific errors for the mdshm system.
#[derive(Debug, Error)]
pub enum MdShmError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Shared memory creation, sizing, or mapping error.
    #[error("shm error: {0}")]
    Shm(String),

    /// The named segment does not exist (writer not running).
    #[error("shared memory segment {0} not found")]
    NotFound(String),

    /// The mapped header describes a layout that does not fit the mapping.
    #[error("layout error: {0}")]
    Layout(String),

    /// The requested symbol is not in the segment's symbol table.
    #[error("symbol {0} not found in shared memory")]
    UnknownSymbol(String),

    /// A slot's size field exceeds its byte budget.
    #[error("corrupt slot for {symbol}: declared {declared} bytes, budget is {budget}")]
    CorruptSlot { symbol: String, declared: u64, budget: usize },

    /// A fixed-width read or write would cross the end of its byte range.
    #[error("out of bounds: {needed} bytes at offset {offset}, {available} available")]
    OutOfBounds { offset: usize, needed: usize, available: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MdShmError>;
