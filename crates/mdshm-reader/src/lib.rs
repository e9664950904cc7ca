//! # mdshm-reader
//!
//! Consumer-side tools: a viewer for the shared memory segment published by
//! `mdshm-collector` and a dumper for its on-disk record logs.

pub mod display;
pub mod dump;
