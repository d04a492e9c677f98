//! Shared sync pipeline entrypoint used by `pairsync sync` and `pairsync diff`.

use std::path::PathBuf;

use pairsync_core::{connect, PairTemplate, RecordStore};

use crate::driver::sync_rows;
use crate::dry_run::DryRunStore;
use crate::error::SyncError;
use crate::report::SyncReport;
use crate::reporter::SyncReporter;
use crate::retry::RetryStrategy;
use crate::table::{CsvFile, Table};
use crate::writer::{write_back, WriteResult};

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Spreadsheet read at the start and rewritten at the end.
    pub src: PathBuf,
    /// Store URI, see [`pairsync_core::connect`].
    pub db: String,
    /// Simulate store writes and leave the spreadsheet untouched.
    pub dry_run: bool,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRun {
    pub report: SyncReport,
    pub write: WriteResult,
    /// The enriched rows, as written (or as they would be).
    pub table: Table,
}

/// Read, connect, sync every row, then write the spreadsheet back.
///
/// Unsupported store URIs and unreadable spreadsheets fail before anything
/// is written.
pub async fn run<T: PairTemplate + ?Sized>(
    options: &SyncOptions,
    template: &mut T,
    retry: &mut dyn RetryStrategy,
    reporter: &dyn SyncReporter,
) -> Result<SyncRun, SyncError> {
    if options.dry_run {
        let (table, report) = preview(options, template, reporter).await?;
        tracing::info!("[dry-run] would write: {}", options.src.display());
        return Ok(SyncRun {
            report,
            write: WriteResult::WouldWrite {
                path: options.src.clone(),
            },
            table,
        });
    }

    let (mut table, store) = open(options).await?;
    let report = sync_rows(&mut table.rows, template, &*store, reporter).await?;
    tracing::info!(
        "synced {} rows ({} failed)",
        report.rows.len(),
        report.failed()
    );
    let sink = CsvFile::new(&options.src);
    let write = write_back(&table, &*store, &sink, retry, reporter).await?;
    Ok(SyncRun {
        report,
        write,
        table,
    })
}

/// Run the sync against a [`DryRunStore`] and return the rows it would
/// write. Neither the store nor the spreadsheet is modified.
pub async fn preview<T: PairTemplate + ?Sized>(
    options: &SyncOptions,
    template: &mut T,
    reporter: &dyn SyncReporter,
) -> Result<(Table, SyncReport), SyncError> {
    let (mut table, store) = open(options).await?;
    let report = {
        let dry = DryRunStore::new(&*store);
        sync_rows(&mut table.rows, template, &dry, reporter).await?
    };
    if let Err(err) = store.disconnect().await {
        tracing::warn!("could not disconnect from store: {err}");
    }
    Ok((table, report))
}

async fn open(options: &SyncOptions) -> Result<(Table, Box<dyn RecordStore>), SyncError> {
    let table = Table::read(&options.src).await?;
    let store = connect(&options.db).await?;
    store.initialize_indexes().await?;
    Ok((table, store))
}
