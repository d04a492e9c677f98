//! # pairsync-sync
//!
//! Row-by-row synchronization of a spreadsheet with paired records, and the
//! write-back of the enriched spreadsheet.
//!
//! Call [`run`] for the whole pipeline, or compose [`sync_rows`] and
//! [`write_back`] directly with your own store, sink and retry strategy.

pub mod diff;
pub mod driver;
pub mod dry_run;
pub mod error;
pub mod pair;
pub mod pipeline;
pub mod report;
pub mod reporter;
pub mod retry;
pub mod table;
pub mod writer;

pub use diff::{diff_sheet, SheetDiff};
pub use driver::sync_rows;
pub use dry_run::DryRunStore;
pub use error::SyncError;
pub use pair::{sync_pair, Pair, PairError, PairOutcome};
pub use pipeline::{preview, run, SyncOptions, SyncRun};
pub use report::{FailureStage, FieldChange, RecordChange, RowReport, RowStatus, SyncReport};
pub use reporter::{CollectingReporter, SyncEvent, SyncReporter, TracingReporter};
pub use retry::{BackoffRetry, KeypressRetry, RetryDecision, RetryStrategy, ScriptedRetry};
pub use table::{CsvFile, RowSink, Table};
pub use writer::{write_back, WriteResult};
