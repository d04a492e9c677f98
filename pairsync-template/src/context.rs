//! Rendering payload built from a row and whatever has been resolved so far.

use serde::Serialize;

use pairsync_core::{Document, Row};

use crate::error::RenderError;

/// Variables visible to every template expression.
///
/// `viewer` / `recorder` are only present once the corresponding record
/// has been persisted (override and row-update expressions); referencing
/// them earlier is a render error.
#[derive(Debug, Clone, Serialize)]
pub struct RowContext<'a> {
    /// The spreadsheet row, addressable as `row.Column` or `row["Two Words"]`.
    pub row: &'a Row,
    /// Rows enriched so far in this run.
    pub sequence: usize,
    /// Rows in the sheet sharing this row's viewer path.
    pub occurrences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<&'a Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorder: Option<&'a Document>,
}

impl<'a> RowContext<'a> {
    pub fn new(row: &'a Row, sequence: usize) -> Self {
        Self {
            row,
            sequence,
            occurrences: 0,
            viewer_path: None,
            recorder_path: None,
            viewer: None,
            recorder: None,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(|e| RenderError::tera("context", e))
    }
}
