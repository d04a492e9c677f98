//! Sequential row driver.

use pairsync_core::{PairTemplate, RecordStore, Row};

use crate::error::SyncError;
use crate::pair::{sync_pair, PairError};
use crate::report::{FailureStage, RowReport, RowStatus, SyncReport};
use crate::reporter::{SyncEvent, SyncReporter};

/// Synchronize every row in order, enriching each in place.
///
/// `template.setup` runs once before the first row and is the only fatal
/// step; afterwards every failure is confined to its row. Rows are handled
/// strictly one after another.
pub async fn sync_rows<T, S>(
    rows: &mut [Row],
    template: &mut T,
    store: &S,
    reporter: &dyn SyncReporter,
) -> Result<SyncReport, SyncError>
where
    T: PairTemplate + ?Sized,
    S: RecordStore + ?Sized,
{
    template.setup(rows)?;
    tracing::debug!("template setup done for {} rows", rows.len());

    let mut report = SyncReport::default();
    for (index, row) in rows.iter_mut().enumerate() {
        let viewer_path = template.viewer_path(row).ok();
        let recorder_path = template.recorder_path(row).ok();
        let mut entry = RowReport {
            index,
            viewer_path,
            recorder_path,
            status: RowStatus::Failed {
                stage: FailureStage::Viewer,
                error: String::new(),
            },
            changes: Vec::new(),
        };

        match sync_pair(index, row, &*template, store, reporter).await {
            Ok(outcome) => {
                entry.changes = outcome.changes;
                entry.status = match template.update_properties(
                    row,
                    &outcome.pair.viewer,
                    &outcome.pair.recorder,
                ) {
                    Ok(()) => RowStatus::Synced {
                        viewer: outcome.viewer,
                        recorder: outcome.recorder,
                    },
                    Err(err) => {
                        let error = SyncError::from(err).to_string();
                        reporter.report(SyncEvent::RowFailed {
                            row: index,
                            stage: FailureStage::Enrich,
                            path: entry.viewer_path.clone(),
                            error: error.clone(),
                        });
                        RowStatus::Failed {
                            stage: FailureStage::Enrich,
                            error,
                        }
                    }
                };
            }
            Err(err) => {
                let stage = err.stage();
                let path = err.path().map(str::to_string);
                let error = err.to_string();
                if let PairError::Recorder { changes, .. } = err {
                    entry.changes = changes;
                }
                reporter.report(SyncEvent::RowFailed {
                    row: index,
                    stage,
                    path,
                    error: error.clone(),
                });
                entry.status = RowStatus::Failed { stage, error };
            }
        }
        report.rows.push(entry);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairsync_core::{Document, MemoryStore, TemplateError};
    use serde_json::{json, Value};

    use crate::report::RecordChange;
    use crate::reporter::CollectingReporter;

    /// Numbers rows as they are enriched and records the order hooks ran in.
    #[derive(Default)]
    struct Counter {
        seen_in_setup: usize,
        next: usize,
        fail_enrich_on: Option<usize>,
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    impl PairTemplate for Counter {
        fn viewer_path(&self, row: &Row) -> Result<String, TemplateError> {
            match row.get("Id") {
                Some(id) if !id.is_empty() => Ok(format!("/c/{id}")),
                _ => Err(TemplateError::Hook("row has no Id".into())),
            }
        }

        fn recorder_path(&self, row: &Row) -> Result<String, TemplateError> {
            Ok(format!("{}/rec", self.viewer_path(row)?))
        }

        fn viewer(&self, row: &Row) -> Result<Document, TemplateError> {
            Ok(doc(json!({"subject": row.get("Id")})))
        }

        fn recorder(&self, _row: &Row) -> Result<Document, TemplateError> {
            Ok(Document::new())
        }

        fn update_properties(
            &mut self,
            row: &mut Row,
            viewer: &Document,
            _recorder: &Document,
        ) -> Result<(), TemplateError> {
            if self.fail_enrich_on == Some(self.next) {
                self.next += 1;
                return Err(TemplateError::Hook("enrich refused".into()));
            }
            row.set("Seq", self.next.to_string());
            row.set("Link", viewer["_id"].as_str().unwrap_or_default());
            self.next += 1;
            Ok(())
        }

        fn setup(&mut self, rows: &[Row]) -> Result<(), TemplateError> {
            self.seen_in_setup = rows.len();
            self.next = 0;
            Ok(())
        }
    }

    fn rows(ids: &[&str]) -> Vec<Row> {
        ids.iter().map(|id| [("Id", *id)].into_iter().collect()).collect()
    }

    #[tokio::test]
    async fn counters_advance_in_row_order() {
        let store = MemoryStore::new();
        let mut template = Counter::default();
        let mut rows = rows(&["a", "b", "c"]);
        let report = sync_rows(&mut rows, &mut template, &store, &CollectingReporter::new())
            .await
            .unwrap();
        assert_eq!(template.seen_in_setup, 3);
        let seqs: Vec<_> = rows.iter().map(|r| r.get("Seq").unwrap().to_string()).collect();
        assert_eq!(seqs, vec!["0", "1", "2"]);
        assert_eq!(report.synced(), 3);
        assert_eq!(report.count(RecordChange::Created), 6);
    }

    #[tokio::test]
    async fn viewer_failure_skips_row_and_continues() {
        let store = MemoryStore::new();
        let mut template = Counter::default();
        let mut rows = rows(&["a", "", "c"]);
        let reporter = CollectingReporter::new();
        let report = sync_rows(&mut rows, &mut template, &store, &reporter)
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.rows[1].status,
            RowStatus::Failed { stage: FailureStage::Viewer, .. }
        ));
        assert_eq!(rows[1].get("Seq"), None);
        assert_eq!(rows[2].get("Seq"), Some("1"));
        assert_eq!(store.documents().await.len(), 4);
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, SyncEvent::RowFailed { row: 1, .. })));
    }

    #[tokio::test]
    async fn enrich_failure_keeps_records() {
        let store = MemoryStore::new();
        let mut template = Counter {
            fail_enrich_on: Some(0),
            ..Counter::default()
        };
        let mut rows = rows(&["a", "b"]);
        let report = sync_rows(&mut rows, &mut template, &store, &CollectingReporter::new())
            .await
            .unwrap();
        assert!(matches!(
            report.rows[0].status,
            RowStatus::Failed { stage: FailureStage::Enrich, .. }
        ));
        assert_eq!(rows[0].get("Link"), None);
        assert_eq!(rows[1].get("Seq"), Some("1"));
        assert_eq!(store.documents().await.len(), 4);
    }

    struct BrokenSetup;

    impl PairTemplate for BrokenSetup {
        fn viewer_path(&self, _: &Row) -> Result<String, TemplateError> {
            Ok("/x".into())
        }
        fn recorder_path(&self, _: &Row) -> Result<String, TemplateError> {
            Ok("/x/rec".into())
        }
        fn viewer(&self, _: &Row) -> Result<Document, TemplateError> {
            Ok(Document::new())
        }
        fn recorder(&self, _: &Row) -> Result<Document, TemplateError> {
            Ok(Document::new())
        }
        fn update_properties(
            &mut self,
            _: &mut Row,
            _: &Document,
            _: &Document,
        ) -> Result<(), TemplateError> {
            Ok(())
        }
        fn setup(&mut self, _: &[Row]) -> Result<(), TemplateError> {
            Err(TemplateError::Hook("no lookup table".into()))
        }
    }

    #[tokio::test]
    async fn setup_failure_is_fatal_before_any_write() {
        let store = MemoryStore::new();
        let mut rows = rows(&["a"]);
        let err = sync_rows(&mut rows, &mut BrokenSetup, &store, &CollectingReporter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Template(_)));
        assert!(store.documents().await.is_empty());
    }
}
