//! Error types for pairsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use pairsync_core::{Role, StoreError, TemplateError};

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the record store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error from the pair template.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// More than one record answers to the same path.
    #[error("{count} {role} records match {query}; expected at most one")]
    Ambiguous {
        role: Role,
        query: String,
        count: usize,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet could not be read or written as CSV.
    #[error("CSV error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The destination file is held by another process.
    #[error("{path} is locked by another process")]
    Locked { path: PathBuf },

    /// The operator gave up while the destination was locked.
    #[error("write to {path} aborted by operator")]
    Aborted { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Csv`].
pub(crate) fn csv_err(path: impl Into<PathBuf>, source: csv::Error) -> SyncError {
    SyncError::Csv {
        path: path.into(),
        source,
    }
}
