//! JSON-file document store.
//!
//! Persists a [`StoreFile`] document at the configured path. Every write
//! rewrites the whole file using the `.tmp` + rename pattern, so a crash
//! never leaves a half-written collection behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{io_err, StoreError};
use crate::store::collection::DocumentSet;
use crate::store::RecordStore;
use crate::types::{Document, Query, RecordId};

/// On-disk store payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreFile {
    pub saved_at: DateTime<Utc>,
    pub records: Vec<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoreFileCompat {
    Structured(StoreFile),
    /// A bare array of records, e.g. a collection export.
    Bare(Vec<Document>),
}

/// Store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    set: DocumentSet,
    disconnected: bool,
}

impl JsonFileStore {
    /// Load the store at `path`. A missing file is an empty store; it is
    /// created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<StoreFileCompat>(&contents)
                .map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })? {
                StoreFileCompat::Structured(file) => file.records,
                StoreFileCompat::Bare(records) => records,
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(io_err(&path, err)),
        };
        tracing::debug!("loaded {} record(s) from {}", records.len(), path.display());
        Ok(Self {
            path,
            state: Mutex::new(State {
                set: DocumentSet::from_documents(records)?,
                disconnected: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, set: &DocumentSet) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_err(dir, e))?;
        }
        let payload = StoreFile {
            saved_at: Utc::now(),
            records: set.documents().to_vec(),
        };
        let json = serde_json::to_string_pretty(&payload)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn initialize_indexes(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.live()?;
        state.set.build_index();
        Ok(())
    }

    async fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let state = self.state.lock().await;
        state.live()?;
        Ok(state.set.find(query))
    }

    async fn create(&self, body: Document) -> Result<Document, StoreError> {
        let mut state = self.state.lock().await;
        state.live()?;
        let mut next = state.set.clone();
        let stored = next.insert(body)?;
        self.save(&next).await?;
        state.set = next;
        Ok(stored)
    }

    async fn find_one_and_replace(
        &self,
        id: &RecordId,
        body: Document,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.lock().await;
        state.live()?;
        let mut next = state.set.clone();
        let stored = next.replace(id, body)?;
        self.save(&next).await?;
        state.set = next;
        Ok(stored)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.disconnected {
            state.disconnected = true;
            tracing::debug!("disconnected from {}", self.path.display());
        }
        Ok(())
    }
}

impl State {
    fn live(&self) -> Result<(), StoreError> {
        if self.disconnected {
            Err(StoreError::Disconnected)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let created = store.create(doc(json!({"path": "/mayor"}))).await.unwrap();
        store.disconnect().await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let found = reopened.find(&Query::path("/mayor")).await.unwrap();
        assert_eq!(found, vec![created]);
    }

    #[tokio::test]
    async fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.create(doc(json!({"path": "/a"}))).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn bare_array_export_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        std::fs::write(&path, r#"[{"_id":"abc","path":"/a"}]"#).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let found = store.find(&Query::path("/a")).await.unwrap();
        assert_eq!(RecordId::of(&found[0]), Some(RecordId::from("abc")));
    }

    #[tokio::test]
    async fn corrupt_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[tokio::test]
    async fn failed_replace_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.create(doc(json!({"path": "/a"}))).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store
            .find_one_and_replace(&RecordId::from("nope"), doc(json!({"path": "/b"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
