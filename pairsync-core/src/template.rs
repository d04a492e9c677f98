//! The pair template contract.
//!
//! A template decides how one spreadsheet row maps onto a viewer/recorder
//! pair. The synchronizer only ever calls it; it never inspects a row
//! itself.

use crate::error::TemplateError;
use crate::types::{Document, Row};

/// Caller-supplied mapping from rows to paired records.
///
/// Path and body derivations must be pure: the synchronizer may call them
/// more than once per row. Hooks that keep cross-row bookkeeping take
/// `&mut self`; the driver holds the only mutable borrow for the whole run,
/// so no two rows ever see the template at the same time.
pub trait PairTemplate {
    /// Lookup key of the viewer record for `row`.
    fn viewer_path(&self, row: &Row) -> Result<String, TemplateError>;

    /// Lookup key of the recorder record for `row`.
    fn recorder_path(&self, row: &Row) -> Result<String, TemplateError>;

    /// Canonical viewer body derived from `row`.
    fn viewer(&self, row: &Row) -> Result<Document, TemplateError>;

    /// Canonical recorder body derived from `row`.
    fn recorder(&self, row: &Row) -> Result<Document, TemplateError>;

    /// Enrich a viewer body in place just before it is persisted.
    fn overwrite_viewer_info(
        &self,
        _viewer: &mut Document,
        _row: &Row,
    ) -> Result<(), TemplateError> {
        Ok(())
    }

    /// Enrich a recorder body in place just before it is persisted.
    ///
    /// `viewer` is the already-persisted viewer of the same row, so the
    /// recorder can reference its identity.
    fn overwrite_recorder_info(
        &self,
        _recorder: &mut Document,
        _viewer: &Document,
        _row: &Row,
    ) -> Result<(), TemplateError> {
        Ok(())
    }

    /// Write derived values back onto `row` once its pair is resolved.
    fn update_properties(
        &mut self,
        row: &mut Row,
        viewer: &Document,
        recorder: &Document,
    ) -> Result<(), TemplateError>;

    /// One-time pass over every row before the first one is synchronized.
    fn setup(&mut self, _rows: &[Row]) -> Result<(), TemplateError> {
        Ok(())
    }
}
