//! Byte layout of the segment header and slot geometry.
//!
//! | offset | width | field |
//! |---|---|---|
//! | 0   | 8   | `write_counter` (atomic) |
//! | 8   | 8   | `last_update_time` (atomic, unix seconds) |
//! | 16  | 8   | `data_offset` |
//! | 24  | 8   | `slot_size` |
//! | 32  | 8   | `symbol_count` |
//! | 40  | 160 | `symbol_names[MAX_SYMBOLS][16]` |
//! | 200 | 56  | reserved |

use std::ops::Range;
use std::sync::atomic::AtomicU64;

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{MdShmError, Result};
use crate::types::{SYMBOL_LEN, symbol_from_bytes, symbol_to_bytes};

/// Number of slots in every segment, whatever the configured symbol count.
pub const MAX_SYMBOLS: usize = 10;

/// Header size, padded to a multiple of 64 bytes.
pub const HEADER_SIZE: usize = 256;

/// Width of the byte-count field at the start of each slot.
pub const SIZE_FIELD_LEN: usize = 8;

pub const DEFAULT_SHM_NAME: &str = "/binance_market_data";
pub const DEFAULT_SHM_SIZE: usize = 64 * 1024 * 1024;

pub(crate) const OFF_WRITE_COUNTER: usize = 0;
pub(crate) const OFF_LAST_UPDATE: usize = 8;
const OFF_DATA_OFFSET: usize = 16;
const OFF_SYMBOL_NAMES: usize = 40;

const _: () = assert!(OFF_SYMBOL_NAMES + MAX_SYMBOLS * SYMBOL_LEN <= HEADER_SIZE);
const _: () = assert!(HEADER_SIZE % 64 == 0);

/// Geometry of a segment: where the slots start and how big each one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub total_size: usize,
    pub data_offset: usize,
    pub slot_size: usize,
    pub symbol_count: usize,
}

impl SegmentLayout {
    /// Compute the layout for a new segment of `total_size` bytes.
    pub fn new(total_size: usize, symbol_count: usize) -> Result<Self> {
        if symbol_count > MAX_SYMBOLS {
            return Err(MdShmError::Config(format!(
                "{symbol_count} symbols requested, segment holds {MAX_SYMBOLS}"
            )));
        }
        let slot_size = total_size.saturating_sub(HEADER_SIZE) / MAX_SYMBOLS;
        if slot_size < SIZE_FIELD_LEN {
            return Err(MdShmError::Shm(format!(
                "segment size {total_size} too small for header and {MAX_SYMBOLS} slots"
            )));
        }
        Ok(Self { total_size, data_offset: HEADER_SIZE, slot_size, symbol_count })
    }

    /// Bytes available for envelope/record pairs in one slot.
    #[inline]
    pub fn payload_budget(&self) -> usize {
        self.slot_size - SIZE_FIELD_LEN
    }

    /// Byte range of slot `index`, or `None` if it would leave the segment.
    pub fn slot_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= MAX_SYMBOLS {
            return None;
        }
        let start = self.data_offset.checked_add(index.checked_mul(self.slot_size)?)?;
        let end = start.checked_add(self.slot_size)?;
        (end <= self.total_size).then_some(start..end)
    }

    /// Write the static header fields and the symbol table. The two atomic
    /// counters are left as they are.
    pub fn write_header(&self, buf: &mut [u8], names: &[String]) -> Result<()> {
        if names.len() != self.symbol_count {
            return Err(MdShmError::Config(format!(
                "layout expects {} symbols, got {}",
                self.symbol_count,
                names.len()
            )));
        }
        let buf_len = buf.len();
        let header = buf.get_mut(..HEADER_SIZE).ok_or_else(|| {
            MdShmError::Shm(format!("mapping of {buf_len} bytes cannot hold the header"))
        })?;
        let mut w = ByteWriter::new(&mut header[OFF_DATA_OFFSET..]);
        w.put_u64(self.data_offset as u64)?;
        w.put_u64(self.slot_size as u64)?;
        w.put_u64(self.symbol_count as u64)?;
        for i in 0..MAX_SYMBOLS {
            let name = names.get(i).map(String::as_str).unwrap_or("");
            w.put_bytes(&symbol_to_bytes(name))?;
        }
        Ok(())
    }

    /// Parse and validate the header of a mapped segment.
    ///
    /// Every field is checked against the mapping length, so a stale or
    /// foreign segment yields a [`MdShmError::Layout`] rather than out of
    /// range slot offsets later.
    pub fn read_header(buf: &[u8]) -> Result<(Self, Vec<String>)> {
        if buf.len() < HEADER_SIZE {
            return Err(MdShmError::Layout(format!(
                "segment is {} bytes, smaller than the {HEADER_SIZE} byte header",
                buf.len()
            )));
        }
        let mut r = ByteReader::new(&buf[..HEADER_SIZE]);
        r.seek(OFF_DATA_OFFSET);
        let data_offset = r.read_u64()? as usize;
        let slot_size = r.read_u64()? as usize;
        let symbol_count = r.read_u64()? as usize;

        if symbol_count > MAX_SYMBOLS {
            return Err(MdShmError::Layout(format!(
                "symbol_count {symbol_count} exceeds {MAX_SYMBOLS}"
            )));
        }
        if data_offset < HEADER_SIZE || slot_size < SIZE_FIELD_LEN {
            return Err(MdShmError::Layout(format!(
                "implausible geometry: data_offset={data_offset} slot_size={slot_size}"
            )));
        }
        slot_size
            .checked_mul(MAX_SYMBOLS)
            .and_then(|n| n.checked_add(data_offset))
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                MdShmError::Layout(format!(
                    "slots ({MAX_SYMBOLS} x {slot_size} at {data_offset}) \
                     exceed segment of {} bytes",
                    buf.len()
                ))
            })?;

        let mut names = Vec::with_capacity(symbol_count);
        for _ in 0..symbol_count {
            let raw: [u8; SYMBOL_LEN] = r.read_array()?;
            names.push(symbol_from_bytes(&raw).to_string());
        }

        Ok((Self { total_size: buf.len(), data_offset, slot_size, symbol_count }, names))
    }
}

/// View one of the header's atomic counters.
///
/// # Safety
/// `base` must be the start of a live mapping of at least [`HEADER_SIZE`]
/// bytes that is 8-byte aligned (mmap returns page-aligned addresses), and
/// the mapping must outlive the returned reference.
#[inline]
pub(crate) unsafe fn header_counter<'a>(base: *const u8, offset: usize) -> &'a AtomicU64 {
    debug_assert!(offset == OFF_WRITE_COUNTER || offset == OFF_LAST_UPDATE);
    unsafe { &*(base.add(offset) as *const AtomicU64) }
}
