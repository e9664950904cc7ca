//! # mdshm-feed
//!
//! Market data ingestion for the shared-memory collector.
//!
//! ## Architecture
//!
//! A single Binance combined-stream WebSocket ([`ws`]) delivers aggregate
//! trades and klines. Frames are parsed on the socket task
//! ([`binance::json_parser`]) and handed over a bounded crossbeam channel to
//! one ingest thread ([`ingest`]), which appends to the per-symbol disk logs
//! and ring buffers. [`pipeline::Collector`] wires this together with the
//! periodic shared-memory publisher and the [`stats`] reporter.

pub mod binance;
pub mod event;
pub mod ingest;
pub mod json_util;
pub mod pipeline;
pub mod stats;
pub mod ws;

pub use event::{FeedEvent, FeedPayload};
pub use pipeline::Collector;
