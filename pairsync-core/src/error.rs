//! Error types for pairsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordId;

/// All errors a [`RecordStore`](crate::store::RecordStore) can raise.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure on a file-backed store, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a valid document collection.
    #[error("failed to parse store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (save path).
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection string names a backend this build does not provide.
    #[error("unsupported store uri '{uri}'; expected 'memory:', 'file:<path>' or a .json path")]
    UnsupportedUri { uri: String },

    /// `find_one_and_replace` was given an identity no record carries.
    #[error("no record with _id {id}")]
    NotFound { id: RecordId },

    /// `create` was given a body whose `_id` is already taken.
    #[error("a record with _id {id} already exists")]
    DuplicateId { id: RecordId },

    /// Operation attempted after `disconnect`.
    #[error("store is disconnected")]
    Disconnected,

    /// Backend refused the write for a reason of its own.
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Errors raised by a [`PairTemplate`](crate::template::PairTemplate).
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template expression failed to render.
    #[error("template '{name}' failed to render: {message}")]
    Render { name: String, message: String },

    /// A rendered value does not have the shape the contract requires.
    #[error("template field '{field}' must be {expected}")]
    Shape {
        field: String,
        expected: &'static str,
    },

    /// Any other failure inside a template hook.
    #[error("{0}")]
    Hook(String),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
