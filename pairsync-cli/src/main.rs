//! pairsync — keep spreadsheet rows and their viewer/recorder records in step.
//!
//! # Usage
//!
//! ```text
//! pairsync sync --src <csv> --db <uri> --pair <template.yaml> [--dry-run] [--json]
//!               [--retry key|backoff] [--retry-delay-ms N]
//! pairsync diff --src <csv> --db <uri> --pair <template.yaml>
//! pairsync src <csv> db <uri> pair <template.yaml>
//! ```

mod args;
mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pairsync",
    version,
    about = "Synchronize spreadsheet rows with paired viewer/recorder records",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync every row, then rewrite the spreadsheet with the enriched rows.
    Sync(SyncArgs),

    /// Show a unified diff of the spreadsheet a sync would write.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let normalized = args::normalize(std::env::args());
    let cli = Cli::parse_from(normalized.args);
    init_tracing(cli.verbose);
    for arg in &normalized.dropped {
        tracing::warn!("ignoring unrecognized argument '{arg}'");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Sync(args) => args.run().await,
            Commands::Diff(args) => args.run().await,
        }
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
