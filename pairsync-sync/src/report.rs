//! Per-row outcomes of a sync run.

use std::fmt;

use serde::Serialize;

use pairsync_core::{MergeDiff, Role};

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordChange {
    /// No record existed for the path; one was created.
    Created,
    /// The stored record was replaced with merged content.
    Updated,
    /// The merged content equalled the stored record; nothing was written.
    Unchanged,
}

impl fmt::Display for RecordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordChange::Created => write!(f, "created"),
            RecordChange::Updated => write!(f, "updated"),
            RecordChange::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Where a row stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Viewer lookup, build or write failed; nothing was written.
    Viewer,
    /// Recorder lookup, build or write failed; the viewer write stands.
    Recorder,
    /// Both records are written but the row could not be enriched.
    Enrich,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Viewer => write!(f, "viewer"),
            FailureStage::Recorder => write!(f, "recorder"),
            FailureStage::Enrich => write!(f, "enrich"),
        }
    }
}

/// Final state of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowStatus {
    Synced {
        viewer: RecordChange,
        recorder: RecordChange,
    },
    Failed {
        stage: FailureStage,
        error: String,
    },
}

/// A [`MergeDiff`] tagged with the record it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub role: Role,
    #[serde(flatten)]
    pub diff: MergeDiff,
}

/// Outcome of one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowReport {
    /// Zero-based position in the sheet (header excluded).
    pub index: usize,
    pub viewer_path: Option<String>,
    pub recorder_path: Option<String>,
    #[serde(flatten)]
    pub status: RowStatus,
    pub changes: Vec<FieldChange>,
}

impl RowReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, RowStatus::Failed { .. })
    }
}

/// Outcome of every row, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub rows: Vec<RowReport>,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_failed()).count()
    }

    pub fn synced(&self) -> usize {
        self.rows.len() - self.failed()
    }

    /// Records of any role with the given change.
    pub fn count(&self, change: RecordChange) -> usize {
        self.rows
            .iter()
            .map(|r| match &r.status {
                RowStatus::Synced { viewer, recorder } => {
                    usize::from(*viewer == change) + usize::from(*recorder == change)
                }
                RowStatus::Failed { .. } => 0,
            })
            .sum()
    }

    /// Every scalar field change across the run.
    pub fn changes(&self) -> impl Iterator<Item = &FieldChange> {
        self.rows.iter().flat_map(|r| r.changes.iter())
    }
}
