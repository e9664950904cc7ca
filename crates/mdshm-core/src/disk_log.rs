//! Append-only per-symbol record logs.
//!
//! A log file is a raw concatenation of fixed-width records, no envelope and
//! no header. Files live at `<output>/<SYMBOL>/trades_<unix_secs>.bin` and
//! `<output>/<SYMBOL>/klines_<unix_secs>.bin`.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::codec::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::types::{KlineRecord, RecordKind, TradeRecord, WireRecord};

/// File name stem for a record kind.
pub fn file_stem(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Trade => "trades",
        RecordKind::Kline => "klines",
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Synchronously flushed append-only log of one record type.
#[derive(Debug)]
pub struct DiskLog<T: WireRecord> {
    path: PathBuf,
    file: File,
    scratch: Vec<u8>,
    written: u64,
    _record: PhantomData<T>,
}

impl<T: WireRecord> DiskLog<T> {
    /// Create `<dir>/<stem>_<started_secs>.bin`, appending if it exists.
    pub fn create(dir: &Path, started_secs: u64) -> Result<Self> {
        let path = dir.join(format!("{}_{started_secs}.bin", file_stem(T::KIND)));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, scratch: vec![0u8; T::WIRE_LEN], written: 0, _record: PhantomData })
    }

    /// Encode and append one record, then flush.
    pub fn append(&mut self, record: &T) -> Result<()> {
        record.encode(&mut ByteWriter::new(&mut self.scratch))?;
        self.file.write_all(&self.scratch)?;
        self.file.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn written(&self) -> u64 {
        self.written
    }
}

/// The two logs kept for one symbol.
#[derive(Debug)]
pub struct SymbolLogs {
    pub trades: DiskLog<TradeRecord>,
    pub klines: DiskLog<KlineRecord>,
}

impl SymbolLogs {
    /// Create `<output_dir>/<symbol>/` if needed and open both logs in it.
    pub fn open(output_dir: &Path, symbol: &str, started_secs: u64) -> Result<Self> {
        let dir = output_dir.join(symbol);
        std::fs::create_dir_all(&dir)?;
        let logs = Self {
            trades: DiskLog::create(&dir, started_secs)?,
            klines: DiskLog::create(&dir, started_secs)?,
        };
        info!(
            "[disk] {symbol}: {} and {}",
            logs.trades.path().display(),
            logs.klines.path().display()
        );
        Ok(logs)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Sequential reader over a log file. Yields whole records; a partial record
/// at the end of the file ends iteration and is reported by
/// [`LogReader::trailing_bytes`].
pub struct LogReader<T: WireRecord> {
    inner: BufReader<File>,
    buf: Vec<u8>,
    trailing: usize,
    done: bool,
    _record: PhantomData<T>,
}

impl<T: WireRecord> LogReader<T> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            inner: BufReader::new(file),
            buf: vec![0u8; T::WIRE_LEN],
            trailing: 0,
            done: false,
            _record: PhantomData,
        })
    }

    /// Size of the incomplete record at the end of the file, once reached.
    pub fn trailing_bytes(&self) -> usize {
        self.trailing
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<T: WireRecord> Iterator for LogReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }
        let filled = match self.fill() {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        if filled < self.buf.len() {
            self.done = true;
            self.trailing = filled;
            return None;
        }
        Some(T::decode(&mut ByteReader::new(&self.buf)))
    }
}

/// Number of whole records of type `T` in the file at `path`.
pub fn record_count<T: WireRecord>(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)?.len() / T::WIRE_LEN as u64)
}
