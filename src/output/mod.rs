//! Output sink: CSV tables and a Markdown summary.
//!
//! Each run writes three files into the output directory:
//!
//! - `literature_results_<timestamp>.csv` - the run's records
//! - `literature_results.csv` - the same records, overwritten every run
//! - `literature_summary_<timestamp>.md` - a human-readable table

use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Record;

/// CSV header, in [`Record::to_row`] column order
pub const CSV_HEADER: [&str; 8] = [
    "source",
    "keyword",
    "title",
    "authors",
    "doi",
    "publication_date",
    "journal",
    "abstract",
];

pub const LATEST_CSV_NAME: &str = "literature_results.csv";

/// Paths written by [`write_outputs`]
#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub csv: PathBuf,
    pub latest_csv: PathBuf,
    pub summary: PathBuf,
}

/// UTC run timestamp used in output file names
pub fn run_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write the timestamped CSV, the latest CSV and the Markdown summary
pub fn write_outputs(
    records: &[Record],
    dir: &Path,
    timestamp: &str,
    title: &str,
) -> Result<OutputFiles> {
    let (csv, latest_csv) = write_csv(records, dir, timestamp)?;
    let summary = write_markdown_summary(records, dir, timestamp, title)?;

    Ok(OutputFiles {
        csv,
        latest_csv,
        summary,
    })
}

/// Write `literature_results_<timestamp>.csv` and refresh `literature_results.csv`.
///
/// Returns both paths, timestamped first.
pub fn write_csv(records: &[Record], dir: &Path, timestamp: &str) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let dated = dir.join(format!("literature_results_{timestamp}.csv"));
    let latest = dir.join(LATEST_CSV_NAME);

    for path in [&dated, &latest] {
        write_csv_file(records, path)?;
    }

    tracing::info!("Saved {} records to {}", records.len(), dated.display());
    Ok((dated, latest))
}

fn write_csv_file(records: &[Record], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Write `literature_summary_<timestamp>.md`
pub fn write_markdown_summary(
    records: &[Record],
    dir: &Path,
    timestamp: &str,
    title: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("literature_summary_{timestamp}.md"));
    fs::write(&path, render_markdown(records, timestamp, title))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Markdown summary saved to {}", path.display());
    Ok(path)
}

/// Render the Markdown summary document
pub fn render_markdown(records: &[Record], timestamp: &str, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {title} ({timestamp})\n");
    out.push_str("| Source | Keyword | Title | Authors | Journal | Publication Date | DOI |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");

    for record in records {
        let doi = if record.doi().is_empty() {
            String::new()
        } else {
            format!("https://doi.org/{}", record.doi())
        };
        let cells = [
            record.source().name().to_string(),
            record.keyword().to_string(),
            record.title().to_string(),
            record.authors_joined(),
            record.journal().to_string(),
            record.publication_date().to_string(),
            doi,
        ];
        let row: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }

    out
}

/// Make a value safe for a single Markdown table cell
fn escape_cell(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}
