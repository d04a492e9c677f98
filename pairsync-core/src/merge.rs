//! Verbose deep merge of template bodies onto stored records.
//!
//! The incoming value wins at every leaf. Objects merge key by key and
//! arrays merge index by index; when the two sides have different shapes
//! the incoming value replaces the existing one wholesale. Every scalar
//! leaf that actually changes is reported as a [`MergeDiff`]. Reporting
//! never changes the merge result.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::types::Document;

/// One scalar field changed by a merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeDiff {
    /// Dotted field path, arrays as `items[2]`.
    pub field: String,
    /// Value before the merge; `None` if the field did not exist.
    pub old: Option<Value>,
    pub new: Value,
}

impl fmt::Display for MergeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old {
            Some(old) => write!(f, "{}: {} -> {}", self.field, old, self.new),
            None => write!(f, "{}: <absent> -> {}", self.field, self.new),
        }
    }
}

/// Merge `incoming` onto `target` in place, returning the scalar changes.
pub fn merge_with_verbose(target: &mut Document, incoming: &Document) -> Vec<MergeDiff> {
    let mut diffs = Vec::new();
    merge_object(target, incoming, "", &mut diffs);
    diffs
}

fn merge_object(
    target: &mut Document,
    incoming: &Document,
    prefix: &str,
    diffs: &mut Vec<MergeDiff>,
) {
    for (key, value) in incoming {
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match target.get_mut(key) {
            Some(existing) => merge_value(existing, value, &field, diffs),
            None => {
                if !is_container(value) {
                    diffs.push(MergeDiff {
                        field,
                        old: None,
                        new: value.clone(),
                    });
                }
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value, field: &str, diffs: &mut Vec<MergeDiff>) {
    match (existing, incoming) {
        (Value::Object(target), Value::Object(source)) => {
            merge_object(target, source, field, diffs)
        }
        (Value::Array(target), Value::Array(source)) => {
            for (i, item) in source.iter().enumerate() {
                let slot = format!("{field}[{i}]");
                if i < target.len() {
                    merge_value(&mut target[i], item, &slot, diffs);
                } else {
                    if !is_container(item) {
                        diffs.push(MergeDiff {
                            field: slot,
                            old: None,
                            new: item.clone(),
                        });
                    }
                    target.push(item.clone());
                }
            }
        }
        (existing, incoming) => {
            if !is_container(existing) && !is_container(incoming) && existing != incoming {
                diffs.push(MergeDiff {
                    field: field.to_string(),
                    old: Some(existing.clone()),
                    new: incoming.clone(),
                });
            }
            *existing = incoming.clone();
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
