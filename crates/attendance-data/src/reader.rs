//! Attendance dataset loading and appending.
//!
//! A dataset is a table with one row per branch-week. CSV files go through
//! the `csv` crate; spreadsheets (`.xlsx`, `.xls`, `.ods`) through `calamine`,
//! reading the first worksheet. Both are reduced to rows of optional text
//! cells before records are built, so cleaning is identical for every format.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use attendance_core::models::{AttendanceRecord, ReportContext};
use attendance_core::{AttendanceError, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use tracing::{debug, info, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// Records loaded from a dataset file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub path: PathBuf,
    /// Cleaned records, in file order.
    pub records: Vec<AttendanceRecord>,
    /// Rows discarded for a missing constituency, branch or attendance.
    pub dropped_rows: usize,
}

// ── Columns ───────────────────────────────────────────────────────────────────

const REQUIRED_COLUMNS: [&str; 7] = [
    "Year",
    "Month",
    "Constituency",
    "Branch",
    "Attendance",
    "Target",
    "Week",
];

/// Header comparison key: lowercase, without underscores and spaces.
fn column_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Positions of the dataset columns within a header row.
#[derive(Debug)]
struct ColumnMap {
    year: usize,
    month: usize,
    constituency: usize,
    branch: usize,
    attendance: usize,
    target: usize,
    week: usize,
    reporter: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[Option<String>], path: &Path) -> Result<Self> {
        let positions: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.as_deref().map(|name| (column_key(name), idx)))
            .collect();

        let find = |column: &str| -> Result<usize> {
            positions
                .get(&column_key(column))
                .copied()
                .ok_or_else(|| AttendanceError::MissingColumn {
                    column: column.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let [year, month, constituency, branch, attendance, target, week] = REQUIRED_COLUMNS;
        Ok(Self {
            year: find(year)?,
            month: find(month)?,
            constituency: find(constituency)?,
            branch: find(branch)?,
            attendance: find(attendance)?,
            target: find(target)?,
            week: find(week)?,
            reporter: find("Pastor").or_else(|_| find("Reporter")).ok(),
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a dataset, choosing the reader from the file extension.
///
/// Returns [`AttendanceError::MissingInput`] when `path` does not exist.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(AttendanceError::MissingInput(path.to_path_buf()));
    }

    let rows = match extension(path).as_deref() {
        Some("csv") => read_csv_rows(path)?,
        Some("xlsx" | "xlsm" | "xls" | "ods") => read_workbook_rows(path)?,
        _ => return Err(AttendanceError::UnsupportedFormat(path.to_path_buf())),
    };

    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let columns = ColumnMap::from_header(&header, path)?;

    let mut records = Vec::new();
    let mut dropped_rows = 0usize;
    for (idx, row) in rows.enumerate() {
        if row.iter().all(Option::is_none) {
            continue;
        }
        match build_record(&row, &columns) {
            Some(record) => records.push(record),
            None => {
                // +2: 1-based, after the header row.
                debug!("Dropping row {} of {}", idx + 2, path.display());
                dropped_rows += 1;
            }
        }
    }

    if dropped_rows > 0 {
        warn!(
            "Dropped {} rows without constituency, branch or attendance from {}",
            dropped_rows,
            path.display()
        );
    }
    info!("Loaded {} records from {}", records.len(), path.display());

    Ok(Dataset {
        path: path.to_path_buf(),
        records,
        dropped_rows,
    })
}

/// Append `records` to the CSV dataset at `path`, creating it if needed.
///
/// The header row is written only when the file is new or empty. Returns the
/// number of records written.
pub fn append_records(path: &Path, records: &[AttendanceRecord]) -> Result<usize> {
    if extension(path).as_deref() != Some("csv") {
        return Err(AttendanceError::UnsupportedFormat(path.to_path_buf()));
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AttendanceError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_empty)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Appended {} records to {}", records.len(), path.display());
    Ok(records.len())
}

// ── Row sources ───────────────────────────────────────────────────────────────

type Row = Vec<Option<String>>;

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn text_cell(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn read_csv_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(text_cell).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Row>> {
    let workbook_error = |message: String| AttendanceError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_error("workbook has no worksheets".to_string()))?
        .map_err(|e| workbook_error(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect())
}

fn workbook_cell(cell: &DataType) -> Option<String> {
    match cell {
        DataType::Empty | DataType::Error(_) => None,
        DataType::String(s) => text_cell(s),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{f:.0}")),
        DataType::Float(f) => Some(f.to_string()),
        other => text_cell(&other.to_string()),
    }
}

// ── Cleaning ──────────────────────────────────────────────────────────────────

/// Headcount from a cell: whole numbers, or decimals rounded to the nearest.
fn headcount(value: &str) -> Option<u32> {
    if let Ok(n) = value.parse::<u32>() {
        return Some(n);
    }
    let f: f64 = value.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX)).then(|| f.round() as u32)
}

/// Period labels such as `2025.0` exported by spreadsheets become `2025`.
fn period_label(value: Option<&String>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match value.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() && !value.contains(|c: char| c.is_alphabetic()) => {
            format!("{f:.0}")
        }
        _ => value.clone(),
    }
}

fn build_record(row: &[Option<String>], columns: &ColumnMap) -> Option<AttendanceRecord> {
    let cell = |idx: usize| row.get(idx).and_then(Option::as_ref);

    let constituency = cell(columns.constituency)?;
    let branch = cell(columns.branch)?;
    let attendance = headcount(cell(columns.attendance)?)?;
    let target = cell(columns.target).and_then(|v| headcount(v)).unwrap_or(0);

    let context = ReportContext::new(
        columns
            .reporter
            .and_then(cell)
            .cloned()
            .unwrap_or_default(),
        cell(columns.month).cloned().unwrap_or_default(),
        period_label(cell(columns.week)),
        period_label(cell(columns.year)),
    );

    Some(AttendanceRecord::new(
        constituency.as_str(),
        branch.as_str(),
        &context,
        attendance,
        target,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
