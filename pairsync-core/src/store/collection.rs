//! In-memory document set shared by the bundled store backends.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::types::{path_of, Document, Query, RecordId, ID_FIELD};

/// Ordered documents plus an optional `path` index.
///
/// The index is only built by [`DocumentSet::build_index`] (the
/// `initialize_indexes` hook); until then lookups scan.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocumentSet {
    documents: Vec<Document>,
    by_path: Option<HashMap<String, Vec<usize>>>,
}

impl DocumentSet {
    pub(crate) fn from_documents(documents: Vec<Document>) -> Result<Self, StoreError> {
        let mut set = Self::default();
        for doc in documents {
            set.insert(doc)?;
        }
        Ok(set)
    }

    pub(crate) fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub(crate) fn build_index(&mut self) {
        let mut by_path: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, doc) in self.documents.iter().enumerate() {
            if let Some(path) = path_of(doc) {
                by_path.entry(path.to_string()).or_default().push(pos);
            }
        }
        self.by_path = Some(by_path);
    }

    pub(crate) fn find(&self, query: &Query) -> Vec<Document> {
        if let (Some(path), Some(index)) = (query.as_path(), self.by_path.as_ref()) {
            return index
                .get(path)
                .map(|positions| positions.iter().map(|&p| self.documents[p].clone()).collect())
                .unwrap_or_default();
        }
        self.documents
            .iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect()
    }

    /// Insert `doc`, assigning an `_id` when it has none.
    pub(crate) fn insert(&mut self, mut doc: Document) -> Result<Document, StoreError> {
        match RecordId::of(&doc) {
            Some(id) if self.position(&id).is_some() => {
                return Err(StoreError::DuplicateId { id });
            }
            Some(_) => {}
            None => RecordId::generate().stamp(&mut doc),
        }
        let pos = self.documents.len();
        if let (Some(index), Some(path)) = (self.by_path.as_mut(), path_of(&doc)) {
            index.entry(path.to_string()).or_default().push(pos);
        }
        self.documents.push(doc.clone());
        Ok(doc)
    }

    /// Replace the record carrying `id`; the stored `_id` value is kept as is.
    pub(crate) fn replace(
        &mut self,
        id: &RecordId,
        mut doc: Document,
    ) -> Result<Document, StoreError> {
        let pos = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        match self.documents[pos].get(ID_FIELD) {
            Some(stored) => {
                doc.insert(ID_FIELD.to_string(), stored.clone());
            }
            None => id.stamp(&mut doc),
        }
        let path_changed = path_of(&self.documents[pos]) != path_of(&doc);
        self.documents[pos] = doc.clone();
        if path_changed && self.by_path.is_some() {
            self.build_index();
        }
        Ok(doc)
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| RecordId::of(doc).as_ref() == Some(id))
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

    #[test]
    fn insert_assigns_identity() {
        let mut set = DocumentSet::default();
        let stored = set.insert(doc(json!({"path": "/a"}))).unwrap();
        assert!(RecordId::of(&stored).is_some());
    }

    #[test]
    fn insert_rejects_duplicate_identity() {
        let mut set = DocumentSet::default();
        set.insert(doc(json!({"_id": "1"}))).unwrap();
        let err = set.insert(doc(json!({"_id": "1"}))).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[test]
    fn indexed_and_scanned_lookups_agree() {
        let mut set = DocumentSet::default();
        set.insert(doc(json!({"path": "/a"}))).unwrap();
        set.insert(doc(json!({"path": "/b"}))).unwrap();
        let scanned = set.find(&Query::path("/b"));
        set.build_index();
        set.insert(doc(json!({"path": "/b", "n": 2}))).unwrap();
        let indexed = set.find(&Query::path("/b"));
        assert_eq!(scanned.len(), 1);
        assert_eq!(indexed.len(), 2);
        assert_eq!(indexed[0], scanned[0]);
    }

    #[test]
    fn replace_moves_index_entry_when_path_changes() {
        let mut set = DocumentSet::default();
        let stored = set.insert(doc(json!({"path": "/old"}))).unwrap();
        set.build_index();
        let id = RecordId::of(&stored).unwrap();
        set.replace(&id, doc(json!({"path": "/new"}))).unwrap();
        assert!(set.find(&Query::path("/old")).is_empty());
        assert_eq!(set.find(&Query::path("/new")).len(), 1);
    }

    #[test]
    fn replace_keeps_numeric_identity() {
        let seeded = vec![doc(json!({"_id": 7, "path": "/v"}))];
        let mut set = DocumentSet::from_documents(seeded).unwrap();
        let replaced = set
            .replace(&RecordId::from("7"), doc(json!({"_id": "7", "path": "/v", "n": 1})))
            .unwrap();
        assert_eq!(replaced["_id"], json!(7));
        assert_eq!(set.documents()[0]["_id"], json!(7));
        assert_eq!(set.documents()[0]["n"], json!(1));

        let without_id = set.replace(&RecordId::from("7"), doc(json!({"path": "/v"}))).unwrap();
        assert_eq!(without_id["_id"], json!(7));
    }
}
