//! Core data types: fixed-width records, the envelope that precedes each
//! record in shared memory, and fixed-size symbol helpers.
//!
//! Records encode to a packed little-endian layout with no padding, so the
//! same bytes serve both the shared segment and the on-disk logs.

pub mod envelope;
pub mod record;
pub mod symbol;

pub use envelope::*;
pub use record::*;
pub use symbol::*;
