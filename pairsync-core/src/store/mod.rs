//! Record store contract and the bundled backends.
//!
//! | URI                         | Backend           |
//! |-----------------------------|-------------------|
//! | `memory:`                   | [`MemoryStore`]   |
//! | `file:<path>` / `*.json`    | [`JsonFileStore`] |

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Document, Query, RecordId};

mod collection;
mod json_file;
mod memory;

pub use json_file::{JsonFileStore, StoreFile};
pub use memory::MemoryStore;

/// Document store operations the synchronizer relies on.
///
/// Implementations must preserve identity: `find_one_and_replace` never
/// assigns a new `_id`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Prepare lookup indexes. Called once, right after connecting.
    async fn initialize_indexes(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// All records matching `query`, in insertion order.
    async fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Persist a new record and return it with its assigned `_id`.
    async fn create(&self, body: Document) -> Result<Document, StoreError>;

    /// Replace the record identified by `id` with `body`, returning the
    /// stored version.
    async fn find_one_and_replace(
        &self,
        id: &RecordId,
        body: Document,
    ) -> Result<Document, StoreError>;

    /// Flush and release the connection. Later calls fail with
    /// [`StoreError::Disconnected`].
    async fn disconnect(&self) -> Result<(), StoreError>;
}

/// Open the store named by `uri`.
pub async fn connect(uri: &str) -> Result<Box<dyn RecordStore>, StoreError> {
    let uri = uri.trim();
    if uri == "memory:" || uri == "memory://" {
        tracing::debug!("connecting to in-memory store");
        return Ok(Box::new(MemoryStore::new()));
    }
    let file = uri
        .strip_prefix("file://")
        .or_else(|| uri.strip_prefix("file:"))
        .map(PathBuf::from)
        .or_else(|| uri.ends_with(".json").then(|| PathBuf::from(uri)));
    match file {
        Some(path) if !path.as_os_str().is_empty() => {
            tracing::debug!("connecting to JSON store at {}", path.display());
            Ok(Box::new(JsonFileStore::open(path).await?))
        }
        _ => Err(StoreError::UnsupportedUri {
            uri: uri.to_string(),
        }),
    }
}
