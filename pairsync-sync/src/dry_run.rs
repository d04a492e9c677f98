//! Store wrapper that reads through and keeps writes in memory.

use async_trait::async_trait;
use tokio::sync::Mutex;

use pairsync_core::{Document, Query, RecordId, RecordStore, StoreError};

/// Reads hit the wrapped store; creates and replaces are only simulated.
///
/// Simulated records get fresh identities and are visible to later reads,
/// so a dry run follows the same create/update path as a real one.
pub struct DryRunStore<'a, S: ?Sized> {
    inner: &'a S,
    pending: Mutex<Vec<Document>>,
}

impl<'a, S: RecordStore + ?Sized> DryRunStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Records that would have been written, latest version of each.
    pub async fn pending(&self) -> Vec<Document> {
        self.pending.lock().await.clone()
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for DryRunStore<'_, S> {
    async fn initialize_indexes(&self) -> Result<(), StoreError> {
        self.inner.initialize_indexes().await
    }

    async fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let stored = self.inner.find(query).await?;
        let pending = self.pending.lock().await;
        let shadowed = |doc: &Document| {
            RecordId::of(doc).and_then(|id| {
                pending
                    .iter()
                    .find(|p| RecordId::of(p).as_ref() == Some(&id))
            })
        };

        let mut found: Vec<Document> = stored
            .iter()
            .filter_map(|doc| match shadowed(doc) {
                Some(newer) => query.matches(newer).then(|| newer.clone()),
                None => Some(doc.clone()),
            })
            .collect();
        for doc in pending.iter().filter(|doc| query.matches(doc)) {
            let id = RecordId::of(doc);
            if !found.iter().any(|f| RecordId::of(f) == id) {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn create(&self, mut body: Document) -> Result<Document, StoreError> {
        let id = match RecordId::of(&body) {
            Some(id) => id,
            None => {
                let id = RecordId::generate();
                id.stamp(&mut body);
                id
            }
        };
        tracing::debug!("[dry-run] would create {id}");
        self.pending.lock().await.push(body.clone());
        Ok(body)
    }

    async fn find_one_and_replace(
        &self,
        id: &RecordId,
        mut body: Document,
    ) -> Result<Document, StoreError> {
        id.stamp(&mut body);
        tracing::debug!("[dry-run] would replace {id}");
        let mut pending = self.pending.lock().await;
        match pending.iter_mut().find(|p| RecordId::of(p).as_ref() == Some(id)) {
            Some(slot) => *slot = body.clone(),
            None => pending.push(body.clone()),
        }
        Ok(body)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.inner.disconnect().await
    }
}
