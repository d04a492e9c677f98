//! `pairsync diff` — show the spreadsheet a sync would write.

use anyhow::{Context, Result};
use clap::Args;

use pairsync_sync::{diff_sheet, TracingReporter};

use super::sync::SourceArgs;

/// Arguments for `pairsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl DiffArgs {
    pub async fn run(self) -> Result<()> {
        let mut template = self.source.template()?;
        let result = diff_sheet(&self.source.options(true), &mut template, &TracingReporter)
            .await
            .with_context(|| format!("diff failed for {}", self.source.src.display()))?;

        let Some(diff) = result.unified_diff else {
            println!("No differences for {}.", result.path.display());
            return Ok(());
        };
        print!("{diff}");
        if !diff.ends_with('\n') {
            println!();
        }
        if result.report.failed() > 0 {
            eprintln!("{} rows would fail; see the log above.", result.report.failed());
        }
        Ok(())
    }
}
