//! Domain types shared by every pairsync crate.
//!
//! Records are schemaless JSON objects ([`Document`]). Two fields are
//! reserved: `_id` (the store-assigned identity) and `path` (the identity
//! key a template derives from a row). Rows are ordered string maps read
//! from the spreadsheet.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the store-assigned identity of a record.
pub const ID_FIELD: &str = "_id";

/// Field holding the lookup key of a record.
pub const PATH_FIELD: &str = "path";

/// Human-readable label most templates put on a record.
pub const SUBJECT_FIELD: &str = "subject";

/// A persisted (or about to be persisted) record body.
pub type Document = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed record identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Fresh random identity, as assigned by the stores on create.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Read the identity of `doc`, if it has one.
    pub fn of(doc: &Document) -> Option<Self> {
        match doc.get(ID_FIELD)? {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Stamp this identity onto `doc`, replacing any different `_id`.
    ///
    /// An `_id` that already reads as this identity (e.g. the number `7`
    /// for `"7"`) is left untouched.
    pub fn stamp(&self, doc: &mut Document) {
        if Self::of(doc).as_ref() == Some(self) {
            return;
        }
        doc.insert(ID_FIELD.to_string(), Value::String(self.0.clone()));
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// `path` field of `doc` when it is a string.
pub fn path_of(doc: &Document) -> Option<&str> {
    doc.get(PATH_FIELD).and_then(Value::as_str)
}

/// `subject` field of `doc` when it is a string.
pub fn subject_of(doc: &Document) -> Option<&str> {
    doc.get(SUBJECT_FIELD).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which half of a pair a record plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Recorder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Viewer => write!(f, "viewer"),
            Role::Recorder => write!(f, "recorder"),
        }
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One spreadsheet row: column name → cell text, in column order.
///
/// Columns added with [`Row::set`] are appended after the existing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Set `column` to `value`, returning the previous cell text.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(column.into(), value.into())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Field-equality filter, the subset of a document-store query the
/// synchronizer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Document);

impl Query {
    /// `{ path: <path> }`
    pub fn path(path: impl Into<String>) -> Self {
        let mut filter = Document::new();
        filter.insert(PATH_FIELD.to_string(), Value::String(path.into()));
        Self(filter)
    }

    /// `{ _id: <id> }`
    pub fn id(id: &RecordId) -> Self {
        let mut filter = Document::new();
        filter.insert(ID_FIELD.to_string(), Value::String(id.0.clone()));
        Self(filter)
    }

    /// Add an equality clause.
    pub fn and(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    /// The `path` clause, when this query has one and nothing else.
    pub fn as_path(&self) -> Option<&str> {
        if self.0.len() != 1 {
            return None;
        }
        self.0.get(PATH_FIELD).and_then(Value::as_str)
    }

    /// `true` if every clause equals the corresponding field of `doc`.
    ///
    /// `_id` clauses compare identities, so `7` and `"7"` match.
    pub fn matches(&self, doc: &Document) -> bool {
        self.0.iter().all(|(field, want)| {
            if field == ID_FIELD {
                let mut clause = Document::new();
                clause.insert(ID_FIELD.to_string(), want.clone());
                let want = RecordId::of(&clause);
                return want.is_some() && want == RecordId::of(doc);
            }
            doc.get(field) == Some(want)
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
