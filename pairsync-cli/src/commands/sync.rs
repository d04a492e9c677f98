//! `pairsync sync` — sync every row and write the spreadsheet back.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pairsync_sync::{
    pipeline::{self, SyncOptions},
    BackoffRetry, KeypressRetry, RecordChange, RetryStrategy, RowReport, RowStatus, SyncReport,
    SyncRun, TracingReporter, WriteResult,
};
use pairsync_template::DeclarativeTemplate;

/// Inputs shared by `sync` and `diff`.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// CSV spreadsheet to read and rewrite.
    #[arg(long, value_name = "CSV")]
    pub src: PathBuf,

    /// Record store: `memory:`, `file:<path>` or a path ending in `.json`.
    #[arg(long, value_name = "URI", env = "PAIRSYNC_DB")]
    pub db: String,

    /// YAML pair template.
    #[arg(long, value_name = "TEMPLATE")]
    pub pair: PathBuf,
}

impl SourceArgs {
    pub fn options(&self, dry_run: bool) -> SyncOptions {
        SyncOptions {
            src: self.src.clone(),
            db: self.db.clone(),
            dry_run,
        }
    }

    pub fn template(&self) -> Result<DeclarativeTemplate> {
        DeclarativeTemplate::load(&self.pair)
            .with_context(|| format!("failed to load pair template {}", self.pair.display()))
    }
}

/// How to wait while the spreadsheet is open elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RetryMode {
    /// Ask on the terminal and retry on Enter.
    Key,
    /// Retry after a fixed delay.
    Backoff,
}

/// Arguments for `pairsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Resolve every row but write neither records nor the spreadsheet.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON report.
    #[arg(long)]
    pub json: bool,

    /// Behaviour while the spreadsheet is locked.
    #[arg(long, value_enum, default_value_t = RetryMode::Key)]
    pub retry: RetryMode,

    /// Delay between attempts with `--retry backoff`.
    #[arg(long, value_name = "N", default_value_t = 2000)]
    pub retry_delay_ms: u64,
}

impl SyncArgs {
    pub async fn run(self) -> Result<()> {
        let mut template = self.source.template()?;
        let mut retry: Box<dyn RetryStrategy> = match self.retry {
            RetryMode::Key => Box::new(KeypressRetry::new()),
            RetryMode::Backoff => Box::new(BackoffRetry::new(Duration::from_millis(
                self.retry_delay_ms,
            ))),
        };

        let outcome = pipeline::run(
            &self.source.options(self.dry_run),
            &mut template,
            retry.as_mut(),
            &TracingReporter,
        )
        .await
        .with_context(|| format!("sync failed for {}", self.source.src.display()))?;

        if self.json {
            print_json(&outcome)?;
        } else {
            print_summary(&outcome);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SyncJson<'a> {
    summary: SummaryJson,
    written: Option<String>,
    rows: &'a [RowReport],
}

#[derive(Serialize)]
struct SummaryJson {
    rows: usize,
    synced: usize,
    failed: usize,
    created: usize,
    updated: usize,
    unchanged: usize,
    changes: usize,
    dry_run: bool,
}

fn summary(report: &SyncReport, write: &WriteResult) -> SummaryJson {
    SummaryJson {
        rows: report.rows.len(),
        synced: report.synced(),
        failed: report.failed(),
        created: report.count(RecordChange::Created),
        updated: report.count(RecordChange::Updated),
        unchanged: report.count(RecordChange::Unchanged),
        changes: report.changes().count(),
        dry_run: matches!(write, WriteResult::WouldWrite { .. }),
    }
}

fn print_json(outcome: &SyncRun) -> Result<()> {
    let payload = SyncJson {
        summary: summary(&outcome.report, &outcome.write),
        written: match &outcome.write {
            WriteResult::Written { path, .. } => Some(path.display().to_string()),
            WriteResult::WouldWrite { .. } => None,
        },
        rows: &outcome.report.rows,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync report")?
    );
    Ok(())
}

#[derive(Tabled)]
struct RowTableRow {
    #[tabled(rename = "row")]
    row: usize,
    #[tabled(rename = "viewer")]
    viewer: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
}

/// One line per sheet row; failures carry the error text.
pub(crate) fn report_table(report: &SyncReport) -> String {
    let rows: Vec<RowTableRow> = report
        .rows
        .iter()
        .map(|row| {
            let (status, detail) = match &row.status {
                RowStatus::Synced { viewer, recorder } => (
                    status_label(*viewer, *recorder),
                    format!("viewer {viewer}, recorder {recorder}"),
                ),
                RowStatus::Failed { stage, error } => ("FAILED", format!("{stage}: {error}")),
            };
            RowTableRow {
                row: row.index + 1,
                viewer: row.viewer_path.clone().unwrap_or_else(|| "-".to_string()),
                status: status.to_string(),
                detail,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

fn status_label(viewer: RecordChange, recorder: RecordChange) -> &'static str {
    match (viewer, recorder) {
        (RecordChange::Unchanged, RecordChange::Unchanged) => "UNCHANGED",
        (RecordChange::Created, _) | (_, RecordChange::Created) => "CREATED",
        _ => "UPDATED",
    }
}

fn print_summary(outcome: &SyncRun) {
    let s = summary(&outcome.report, &outcome.write);
    let prefix = if s.dry_run { "[dry-run] " } else { "" };
    let mark = if s.failed == 0 {
        "✓".green().to_string()
    } else {
        "!".red().bold().to_string()
    };
    println!(
        "{prefix}{mark} {} rows: {} created, {} updated, {} unchanged, {} failed",
        s.rows,
        s.created,
        s.updated,
        s.unchanged,
        s.failed
    );
    if !outcome.report.rows.is_empty() {
        println!("{}", report_table(&outcome.report));
    }
    for change in outcome.report.changes() {
        println!("  ✎  {} {}", change.role, change.diff);
    }
    match &outcome.write {
        WriteResult::Written { path, attempts } if *attempts > 1 => {
            println!("wrote {} after {attempts} attempts", path.display())
        }
        WriteResult::Written { path, .. } => println!("wrote {}", path.display()),
        WriteResult::WouldWrite { path } => println!("{prefix}would write {}", path.display()),
    }
}
