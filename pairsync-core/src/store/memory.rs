use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::collection::DocumentSet;
use crate::store::RecordStore;
use crate::types::{Document, Query, RecordId};

/// Process-local store. Everything is lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    set: DocumentSet,
    disconnected: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `documents` (those without `_id` get one).
    pub fn with_documents(documents: Vec<Document>) -> Result<Self, StoreError> {
        Ok(Self {
            state: Mutex::new(State {
                set: DocumentSet::from_documents(documents)?,
                disconnected: false,
            }),
        })
    }

    /// Snapshot of every stored record, in insertion order.
    pub async fn documents(&self) -> Vec<Document> {
        self.state.lock().await.set.documents().to_vec()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
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
        state.set.insert(body)
    }

    async fn find_one_and_replace(
        &self,
        id: &RecordId,
        body: Document,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.lock().await;
        state.live()?;
        state.set.replace(id, body)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.state.lock().await.disconnected = true;
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

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn replace_preserves_identity() {
        let store = MemoryStore::new();
        let created = store.create(doc(json!({"path": "/a", "v": 1}))).await.unwrap();
        let id = RecordId::of(&created).unwrap();

        let replaced = store
            .find_one_and_replace(&id, doc(json!({"path": "/a", "v": 2})))
            .await
            .unwrap();
        assert_eq!(RecordId::of(&replaced), Some(id));
        assert_eq!(store.documents().await.len(), 1);
    }

    #[tokio::test]
    async fn replace_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .find_one_and_replace(&RecordId::from("missing"), Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn operations_fail_after_disconnect() {
        let store = MemoryStore::new();
        store.disconnect().await.unwrap();
        let err = store.find(&Query::path("/a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Disconnected));
    }
}
