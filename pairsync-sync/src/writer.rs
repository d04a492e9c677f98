//! Write the enriched rows back over the source spreadsheet.
//!
//! ```text
//! disconnect store ─▶ attempt write ─┬─ ok ──────▶ done
//!                        ▲           ├─ locked ──▶ wait for operator ─┐
//!                        └───────────┼────────────────── retry ◀──────┘
//!                                    └─ other ───▶ fatal
//! ```

use std::path::PathBuf;

use pairsync_core::RecordStore;

use crate::error::{csv_err, SyncError};
use crate::reporter::{SyncEvent, SyncReporter};
use crate::retry::{RetryDecision, RetryStrategy};
use crate::table::{RowSink, Table};

/// Outcome of the write-back step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// The file was replaced after `attempts` tries.
    Written { path: PathBuf, attempts: u32 },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &std::path::Path {
        match self {
            WriteResult::Written { path, .. } | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// Disconnect `store`, then write `table` to `sink`, waiting on `retry`
/// for as long as the destination stays locked.
///
/// A failed disconnect is only logged: every record is already committed.
pub async fn write_back<S, K>(
    table: &Table,
    store: &S,
    sink: &K,
    retry: &mut dyn RetryStrategy,
    reporter: &dyn SyncReporter,
) -> Result<WriteResult, SyncError>
where
    S: RecordStore + ?Sized,
    K: RowSink + ?Sized,
{
    if let Err(err) = store.disconnect().await {
        tracing::warn!("could not disconnect from store: {err}");
    }

    let contents = table.to_csv().map_err(|e| csv_err(sink.path(), e))?;
    let mut attempt = 1;
    loop {
        match sink.write(&contents).await {
            Ok(()) => {
                let path = sink.path().to_path_buf();
                reporter.report(SyncEvent::Written {
                    path: path.clone(),
                    rows: table.rows.len(),
                });
                return Ok(WriteResult::Written {
                    path,
                    attempts: attempt,
                });
            }
            Err(SyncError::Locked { path }) => {
                reporter.report(SyncEvent::WriteLocked {
                    path: path.clone(),
                    attempt,
                });
                match retry.wait(&path, attempt).await {
                    RetryDecision::Retry => attempt += 1,
                    RetryDecision::Abort => return Err(SyncError::Aborted { path }),
                }
            }
            Err(err) => return Err(err),
        }
    }
}
