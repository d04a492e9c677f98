//! Progress events and the sinks that receive them.
//!
//! The synchronizer, driver and writer never log directly; they hand a
//! [`SyncEvent`] to whatever [`SyncReporter`] the caller injected.

use std::path::PathBuf;
use std::sync::Mutex;

use pairsync_core::{MergeDiff, Role};

use crate::report::FailureStage;

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A record did not exist and was created.
    Created {
        row: usize,
        role: Role,
        path: String,
        subject: Option<String>,
    },
    /// An existing record was replaced with merged content.
    Updated {
        row: usize,
        role: Role,
        path: String,
        subject: Option<String>,
    },
    /// An existing record already matched the template.
    Unchanged { row: usize, role: Role, path: String },
    /// One scalar field changed while merging.
    FieldChanged {
        row: usize,
        role: Role,
        diff: MergeDiff,
    },
    /// A row stopped early.
    RowFailed {
        row: usize,
        stage: FailureStage,
        path: Option<String>,
        error: String,
    },
    /// The destination file is held by another process.
    WriteLocked { path: PathBuf, attempt: u32 },
    /// The rows were written back.
    Written { path: PathBuf, rows: usize },
}

/// Receiver of [`SyncEvent`]s.
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// Emits every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::Created {
                row,
                role,
                path,
                subject,
            } => {
                tracing::info!(
                    row,
                    "created {role} '{}' at {path}",
                    subject.as_deref().unwrap_or("")
                );
            }
            SyncEvent::Updated {
                row,
                role,
                path,
                subject,
            } => {
                tracing::info!(
                    row,
                    "updated {role} '{}' at {path}",
                    subject.as_deref().unwrap_or("")
                );
            }
            SyncEvent::Unchanged { row, role, path } => {
                tracing::debug!(row, "{role} at {path} unchanged");
            }
            SyncEvent::FieldChanged { row, role, diff } => {
                tracing::info!(row, "{role} {diff}");
            }
            SyncEvent::RowFailed {
                row,
                stage,
                path,
                error,
            } => {
                tracing::error!(
                    row,
                    "{stage} stage failed for {}: {error}",
                    path.as_deref().unwrap_or("<unresolved path>")
                );
            }
            SyncEvent::WriteLocked { path, attempt } => {
                tracing::warn!(
                    attempt,
                    "{} is in use by another program; close it to continue",
                    path.display()
                );
            }
            SyncEvent::Written { path, rows } => {
                tracing::info!("wrote {rows} rows to {}", path.display());
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of lock notifications, i.e. operator prompts.
    pub fn lock_prompts(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SyncEvent::WriteLocked { .. }))
            .count()
    }
}

impl SyncReporter for CollectingReporter {
    fn report(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::new();
        reporter.report(SyncEvent::WriteLocked {
            path: "races.csv".into(),
            attempt: 1,
        });
        reporter.report(SyncEvent::Written {
            path: "races.csv".into(),
            rows: 3,
        });
        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], SyncEvent::Written { rows: 3, .. }));
        assert_eq!(reporter.lock_prompts(), 1);
    }

    #[test]
    fn tracing_reporter_accepts_every_event() {
        let reporter = TracingReporter;
        reporter.report(SyncEvent::Unchanged {
            row: 0,
            role: Role::Viewer,
            path: "/race/1".into(),
        });
        reporter.report(SyncEvent::RowFailed {
            row: 1,
            stage: FailureStage::Recorder,
            path: None,
            error: "rejected".into(),
        });
    }
}
