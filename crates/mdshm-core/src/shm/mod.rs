//! Shared memory segment for distributing recent market data.
//!
//! One producer ([`ShmWriter`]) creates a fixed-size named segment and
//! periodically serializes every symbol's ring buffers into it. Any number of
//! unrelated processes attach read-only ([`ShmReader`]) and decode one
//! symbol's slot on demand.
//!
//! # Memory layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ Header (256 B): write_counter, last_update_time, data_offset,        │
//! │                 slot_size, symbol_count, symbol_names[10][16]        │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │ Slot[0]: size u64 | trade pairs (oldest→newest) | kline pairs (...)  │
//! │ Slot[1]                                                              │
//! │ ...                                                                  │
//! │ Slot[MAX_SYMBOLS-1]                                                  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A pair is an [`Envelope`](crate::types::Envelope) followed by its record.
//!
//! # Consistency
//!
//! `write_counter` is bumped once per tick, after all slots are rewritten. It
//! is not a per-slot version: a reader that scans a slot while the writer is
//! rewriting it sees a torn mix of old and new bytes. Readers accept this and
//! rely on envelope validation to resynchronise or stop early.

pub mod layout;
pub mod reader;
mod segment;
pub mod writer;

pub use layout::{DEFAULT_SHM_NAME, DEFAULT_SHM_SIZE, HEADER_SIZE, MAX_SYMBOLS, SegmentLayout};
pub use reader::{DecodeSummary, DecodedRecord, ShmReader, SlotRecords, StopReason};
pub use segment::normalize_name;
pub use writer::{ShmWriter, SlotPlan, TickOutcome, TickReport};
