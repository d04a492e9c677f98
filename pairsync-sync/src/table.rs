//! CSV spreadsheet: reading rows and writing them back in place.
//!
//! ## Write protocol
//!
//! 1. Probe the destination with a non-blocking exclusive lock.
//! 2. Write the rendered bytes to `<path>.pairsync.tmp`.
//! 3. Rename over the destination.
//!
//! Any step that finds the file held by another program yields
//! [`SyncError::Locked`]; the caller decides whether to retry.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use indexmap::IndexSet;

use pairsync_core::Row;

use crate::error::{csv_err, io_err, SyncError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
#[cfg(windows)]
const BUSY_CODES: &[i32] = &[32, 33];
// EBUSY, ETXTBSY
#[cfg(not(windows))]
const BUSY_CODES: &[i32] = &[16, 26];

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header plus rows of one CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Header of the source file.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Read and parse `path`.
    pub async fn read(path: &Path) -> Result<Self, SyncError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| io_err(path, e))?;
        let table = Self::parse(&bytes).map_err(|e| csv_err(path, e))?;
        tracing::debug!("read {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    /// Parse CSV bytes with a header row. Short records are padded with
    /// empty cells; a leading byte-order mark is ignored.
    pub fn parse(data: &[u8]) -> Result<Self, csv::Error> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows: Vec<Row> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cells = record.iter().chain(std::iter::repeat(""));
            rows.push(columns.iter().map(String::as_str).zip(cells).collect());
        }
        Ok(Self { columns, rows })
    }

    /// Header to write: source columns, then columns added by the rows in
    /// first-seen order.
    pub fn header(&self) -> Vec<&str> {
        let mut seen: IndexSet<&str> = self.columns.iter().map(String::as_str).collect();
        for row in &self.rows {
            seen.extend(row.columns());
        }
        seen.into_iter().collect()
    }

    /// Render as CSV; cells a row does not have are left empty.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let header = self.header();
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&header)?;
        for row in &self.rows {
            writer.write_record(header.iter().map(|column| row.get(column).unwrap_or("")))?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Destination of the rewritten spreadsheet.
#[async_trait]
pub trait RowSink: Send + Sync {
    fn path(&self) -> &Path;

    /// Replace the destination with `contents`. Must return
    /// [`SyncError::Locked`] when another program holds the file.
    async fn write(&self, contents: &[u8]) -> Result<(), SyncError>;
}

/// A CSV file on disk, rewritten atomically.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RowSink for CsvFile {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, contents: &[u8]) -> Result<(), SyncError> {
        let path = self.path.clone();
        let contents = contents.to_vec();
        tokio::task::spawn_blocking(move || replace_file(&path, &contents))
            .await
            .map_err(|e| io_err(&self.path, std::io::Error::new(ErrorKind::Other, e)))?
    }
}

fn replace_file(path: &Path, contents: &[u8]) -> Result<(), SyncError> {
    probe_lock(path)?;

    let tmp = PathBuf::from(format!("{}.pairsync.tmp", path.display()));
    std::fs::write(&tmp, contents).map_err(|e| classify(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(classify(path, e));
    }
    tracing::debug!("replaced {}", path.display());
    Ok(())
}

/// Fail with [`SyncError::Locked`] if another handle holds `path`.
fn probe_lock(path: &Path) -> Result<(), SyncError> {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(classify(path, e)),
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            Ok(())
        }
        Err(e) if is_contended(&e) => Err(SyncError::Locked {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(classify(path, e)),
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn classify(path: &Path, err: std::io::Error) -> SyncError {
    match err.raw_os_error() {
        Some(code) if BUSY_CODES.contains(&code) => SyncError::Locked {
            path: path.to_path_buf(),
        },
        _ => io_err(path, err),
    }
}
