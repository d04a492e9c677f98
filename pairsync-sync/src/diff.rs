//! Dry-run unified diff support for `pairsync diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use pairsync_core::PairTemplate;

use crate::error::{csv_err, io_err, SyncError};
use crate::pipeline::{preview, SyncOptions};
use crate::report::SyncReport;
use crate::reporter::SyncReporter;

/// What a sync would do to the spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetDiff {
    pub path: PathBuf,
    /// `None` when the rewritten file would be identical.
    pub unified_diff: Option<String>,
    pub report: SyncReport,
}

/// Dry-run the sync and compare the CSV it would write with the current file.
///
/// No records and no files are written.
pub async fn diff_sheet<T: PairTemplate + ?Sized>(
    options: &SyncOptions,
    template: &mut T,
    reporter: &dyn SyncReporter,
) -> Result<SheetDiff, SyncError> {
    let (table, report) = preview(options, template, reporter).await?;
    let rendered = table.to_csv().map_err(|e| csv_err(&options.src, e))?;
    let rendered = normalize_line_endings(&String::from_utf8_lossy(&rendered));
    let existing = read_existing_or_empty(&options.src).await?;

    Ok(SheetDiff {
        path: options.src.clone(),
        unified_diff: unified_diff(&options.src, &existing, &rendered),
        report,
    })
}

/// Unified diff of two CSV texts, `None` if they are equal.
pub fn unified_diff(path: &Path, existing: &str, rendered: &str) -> Option<String> {
    if existing == rendered {
        return None;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    Some(
        TextDiff::from_lines(existing, rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
    )
}

async fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
            Ok(normalize_line_endings(&String::from_utf8_lossy(bytes)))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sheets_have_no_diff() {
        assert_eq!(unified_diff(Path::new("races.csv"), "a\n", "a\n"), None);
    }

    #[test]
    fn added_column_shows_in_diff() {
        let diff = unified_diff(
            Path::new("/tmp/sheets/races.csv"),
            "Race\nMayor\n",
            "Race,Link\nMayor,/race/mayor\n",
        )
        .unwrap();
        assert!(diff.contains("--- a/races.csv"));
        assert!(diff.contains("+++ b/races.csv"));
        assert!(diff.contains("-Race\n"));
        assert!(diff.contains("+Race,Link\n"));
        assert!(diff.contains("@@"));
    }

    #[test]
    fn crlf_files_compare_equal_to_lf_output() {
        assert_eq!(normalize_line_endings("a,b\r\n1,2\r\n"), "a,b\n1,2\n");
    }
}
