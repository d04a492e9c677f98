//! Resolve one row into a persisted viewer/recorder pair.

use serde_json::Value;
use thiserror::Error;

use pairsync_core::types::{subject_of, PATH_FIELD};
use pairsync_core::{
    merge_with_verbose, Document, PairTemplate, Query, RecordId, RecordStore, Role, Row,
    StoreError, TemplateError,
};

use crate::error::SyncError;
use crate::report::{FailureStage, FieldChange, RecordChange};
use crate::reporter::{SyncEvent, SyncReporter};

/// The two persisted records of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub viewer: Document,
    pub recorder: Document,
}

/// A resolved row.
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub pair: Pair,
    pub viewer: RecordChange,
    pub recorder: RecordChange,
    /// Scalar changes applied to existing records, viewer first.
    pub changes: Vec<FieldChange>,
}

/// A row that could not be resolved.
#[derive(Debug, Error)]
pub enum PairError {
    /// Nothing was written for the row.
    #[error("viewer: {source}")]
    Viewer {
        path: Option<String>,
        #[source]
        source: SyncError,
    },

    /// The viewer write stands; the recorder is missing or stale.
    #[error("recorder: {source}")]
    Recorder {
        path: Option<String>,
        /// Changes already applied to the viewer.
        changes: Vec<FieldChange>,
        #[source]
        source: SyncError,
    },
}

impl PairError {
    pub fn stage(&self) -> FailureStage {
        match self {
            PairError::Viewer { .. } => FailureStage::Viewer,
            PairError::Recorder { .. } => FailureStage::Recorder,
        }
    }

    /// Path of the record that failed, when it could be derived.
    pub fn path(&self) -> Option<&str> {
        match self {
            PairError::Viewer { path, .. } | PairError::Recorder { path, .. } => path.as_deref(),
        }
    }
}

/// Find or create the viewer of `row`, then its recorder.
///
/// The recorder path is derived from the same, unmodified row. A recorder
/// failure leaves the viewer as written.
pub async fn sync_pair<T, S>(
    index: usize,
    row: &Row,
    template: &T,
    store: &S,
    reporter: &dyn SyncReporter,
) -> Result<PairOutcome, PairError>
where
    T: PairTemplate + ?Sized,
    S: RecordStore + ?Sized,
{
    let mut changes = Vec::new();

    let viewer_path = template.viewer_path(row).map_err(|e| PairError::Viewer {
        path: None,
        source: e.into(),
    })?;
    let (viewer, viewer_change) = Upsert {
        index,
        role: Role::Viewer,
        path: &viewer_path,
        reporter,
    }
    .run(
        store,
        || template.viewer(row),
        |doc| template.overwrite_viewer_info(doc, row),
        &mut changes,
    )
    .await
    .map_err(|source| PairError::Viewer {
        path: Some(viewer_path.clone()),
        source,
    })?;

    let recorder_path = match template.recorder_path(row) {
        Ok(path) => path,
        Err(e) => {
            return Err(PairError::Recorder {
                path: None,
                changes,
                source: e.into(),
            })
        }
    };
    let upsert = Upsert {
        index,
        role: Role::Recorder,
        path: &recorder_path,
        reporter,
    };
    let build = || template.recorder(row);
    let enrich = |doc: &mut Document| template.overwrite_recorder_info(doc, &viewer, row);
    // A new viewer always gets a new recorder; stale recorders are left alone.
    let recorder = if viewer_change == RecordChange::Created {
        upsert.create(store, build, enrich).await
    } else {
        upsert.run(store, build, enrich, &mut changes).await
    };

    match recorder {
        Ok((recorder, recorder_change)) => Ok(PairOutcome {
            pair: Pair { viewer, recorder },
            viewer: viewer_change,
            recorder: recorder_change,
            changes,
        }),
        Err(source) => Err(PairError::Recorder {
            path: Some(recorder_path),
            changes,
            source,
        }),
    }
}

/// The single record stored at `path`, if any.
pub(crate) async fn find_one<S: RecordStore + ?Sized>(
    store: &S,
    role: Role,
    path: &str,
) -> Result<Option<Document>, SyncError> {
    let query = Query::path(path);
    let mut found = store.find(&query).await?;
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(SyncError::Ambiguous {
            role,
            query: query.to_string(),
            count,
        }),
    }
}

struct Upsert<'a> {
    index: usize,
    role: Role,
    path: &'a str,
    reporter: &'a dyn SyncReporter,
}

impl Upsert<'_> {
    async fn run<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        build: impl FnOnce() -> Result<Document, TemplateError>,
        enrich: impl FnOnce(&mut Document) -> Result<(), TemplateError>,
        changes: &mut Vec<FieldChange>,
    ) -> Result<(Document, RecordChange), SyncError> {
        let Some(stored) = find_one(store, self.role, self.path).await? else {
            return self.create(store, build, enrich).await;
        };
        let body = build()?;

        let id = RecordId::of(&stored).ok_or_else(|| {
            StoreError::Rejected(format!("{} at {} has no identity", self.role, self.path))
        })?;
        let mut merged = stored.clone();
        let diffs = merge_with_verbose(&mut merged, &body);
        enrich(&mut merged)?;

        if merged == stored {
            self.reporter.report(SyncEvent::Unchanged {
                row: self.index,
                role: self.role,
                path: self.path.to_string(),
            });
            return Ok((stored, RecordChange::Unchanged));
        }

        let replaced = store.find_one_and_replace(&id, merged).await?;
        for diff in diffs {
            self.reporter.report(SyncEvent::FieldChanged {
                row: self.index,
                role: self.role,
                diff: diff.clone(),
            });
            changes.push(FieldChange {
                role: self.role,
                diff,
            });
        }
        self.reporter.report(SyncEvent::Updated {
            row: self.index,
            role: self.role,
            path: self.path.to_string(),
            subject: subject_of(&replaced).map(str::to_string),
        });
        Ok((replaced, RecordChange::Updated))
    }

    /// Create a new record at `path` without looking for an existing one.
    async fn create<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        build: impl FnOnce() -> Result<Document, TemplateError>,
        enrich: impl FnOnce(&mut Document) -> Result<(), TemplateError>,
    ) -> Result<(Document, RecordChange), SyncError> {
        let mut body = build()?;
        body.entry(PATH_FIELD)
            .or_insert_with(|| Value::String(self.path.to_string()));
        enrich(&mut body)?;
        let created = store.create(body).await?;
        self.reporter.report(SyncEvent::Created {
            row: self.index,
            role: self.role,
            path: self.path.to_string(),
            subject: subject_of(&created).map(str::to_string),
        });
        Ok((created, RecordChange::Created))
    }
}
