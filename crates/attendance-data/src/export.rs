//! Writes an [`AnalysisResult`] as a directory of CSV tables.
//!
//! Every table is written into a hidden sibling staging directory first and
//! the directory is renamed into place once all of them succeeded, so a
//! failed export never leaves a half-written result behind.

use std::fs;
use std::path::{Path, PathBuf};

use attendance_core::{AttendanceError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisResult;

pub const CONSTITUENCY_MONTHLY_FILE: &str = "Constituency_Monthly.csv";
pub const BRANCH_MONTHLY_FILE: &str = "Branch_Monthly.csv";
pub const TOP_PERFORMERS_FILE: &str = "Top_Performers.csv";
pub const LOW_PERFORMERS_FILE: &str = "Low_Performers.csv";
pub const ORIGINAL_DATA_FILE: &str = "Original_Data.csv";
pub const METADATA_FILE: &str = "Analysis_Metadata.json";

const BRANCH_COLUMNS: [&str; 7] = [
    "Year",
    "Month",
    "Constituency",
    "Branch",
    "Monthly_Attendance_Avg",
    "Target",
    "Attendance_Rate",
];

const CONSTITUENCY_COLUMNS: [&str; 10] = [
    "Year",
    "Month",
    "Constituency",
    "Reports_Count",
    "Total_Attendance",
    "Unique_Branches",
    "Total_Target",
    "Monthly_Attendance_Avg",
    "Target",
    "Attendance_Rate",
];

const PERFORMER_COLUMNS: [&str; 6] = [
    "Year",
    "Month",
    "Constituency",
    "Branch",
    "Monthly_Attendance_Avg",
    "Attendance_Rate",
];

const RECORD_COLUMNS: [&str; 9] = [
    "Constituency",
    "Branch",
    "Pastor",
    "Attendance",
    "Target",
    "Attendance_Rate",
    "Month",
    "Week",
    "Year",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Export all tables of `result` into `dir`, replacing a previous export.
///
/// Returns the final directory path.
pub fn export_workbook(dir: &Path, result: &AnalysisResult) -> Result<PathBuf> {
    let staging = sibling(dir, "staging")?;
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|source| export_error(&staging, source))?;
    }

    if let Err(err) = write_tables(&staging, result) {
        if staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        return Err(err);
    }

    finalize(&staging, dir)?;
    info!("Analysis exported to {}", dir.display());
    Ok(dir.to_path_buf())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn export_error(path: &Path, source: std::io::Error) -> AttendanceError {
    AttendanceError::Export {
        path: path.to_path_buf(),
        source,
    }
}

/// `parent/.name.suffix` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        AttendanceError::Config(format!("invalid output directory: {}", dir.display()))
    })?;
    Ok(dir.with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
}

fn write_tables(staging: &Path, result: &AnalysisResult) -> Result<()> {
    fs::create_dir_all(staging).map_err(|source| export_error(staging, source))?;

    write_table(
        &staging.join(CONSTITUENCY_MONTHLY_FILE),
        &CONSTITUENCY_COLUMNS,
        &result.constituency_monthly,
    )?;
    write_table(
        &staging.join(BRANCH_MONTHLY_FILE),
        &BRANCH_COLUMNS,
        &result.branch_monthly,
    )?;
    write_table(
        &staging.join(TOP_PERFORMERS_FILE),
        &PERFORMER_COLUMNS,
        &result.top_performers,
    )?;
    write_table(
        &staging.join(LOW_PERFORMERS_FILE),
        &PERFORMER_COLUMNS,
        &result.low_performers,
    )?;
    write_table(
        &staging.join(ORIGINAL_DATA_FILE),
        &RECORD_COLUMNS,
        &result.records,
    )?;

    let metadata_path = staging.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(&result.metadata)?;
    fs::write(&metadata_path, json).map_err(|source| export_error(&metadata_path, source))?;

    Ok(())
}

/// Write `rows` under a fixed header, so empty tables still carry columns.
fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .map_err(|source| export_error(path, source))?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Move `staging` to `dir`, keeping the previous export until the move
/// succeeded.
fn finalize(staging: &Path, dir: &Path) -> Result<()> {
    let previous = sibling(dir, "previous")?;
    let had_previous = dir.exists();

    if had_previous {
        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|source| export_error(&previous, source))?;
        }
        fs::rename(dir, &previous).map_err(|source| export_error(dir, source))?;
    }

    if let Err(source) = fs::rename(staging, dir) {
        if had_previous {
            restore_previous(&previous, dir);
        }
        if let Err(e) = fs::remove_dir_all(staging) {
            warn!("Could not remove staging directory {}: {}", staging.display(), e);
        }
        return Err(export_error(dir, source));
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!("Could not remove previous export {}: {}", previous.display(), e);
        }
    }
    Ok(())
}

/// Put the previous export back at `dir`. Returns whether it was restored.
fn restore_previous(previous: &Path, dir: &Path) -> bool {
    match fs::rename(previous, dir) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Could not restore previous export {} to {}: {}",
                previous.display(),
                dir.display(),
                e
            );
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
