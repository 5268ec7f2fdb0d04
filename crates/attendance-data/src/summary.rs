//! Quick summaries: one for a freshly parsed report, one for a whole dataset.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use attendance_core::calculations::{attendance_rate, mean, round_to};
use attendance_core::models::AttendanceRecord;

/// Descending by rate, undefined rates last.
fn by_rate_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── ReportSummary ─────────────────────────────────────────────────────────────

/// Totals of one constituency within a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstituencyTotals {
    pub constituency: String,
    pub attendance: u64,
    pub target: u64,
    /// Number of branch lines reported.
    pub branch_count: usize,
    pub rate: Option<f64>,
}

/// Overview of the records parsed out of a single report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSummary {
    pub total_records: usize,
    pub total_attendance: u64,
    pub total_target: u64,
    pub overall_rate: Option<f64>,
    /// Sorted by rate, best first; constituencies without a rate last.
    pub constituencies: Vec<ConstituencyTotals>,
    /// Best records by rate.
    pub top_records: Vec<AttendanceRecord>,
    /// Worst records by rate, worst first.
    pub lowest_records: Vec<AttendanceRecord>,
}

impl ReportSummary {
    pub fn from_records(records: &[AttendanceRecord], top_n: usize) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total_attendance: u64 = records.iter().map(|r| u64::from(r.attendance)).sum();
        let total_target: u64 = records.iter().map(|r| u64::from(r.target)).sum();

        // First-appearance order, then a stable sort by rate.
        let mut constituencies: Vec<ConstituencyTotals> = Vec::new();
        for record in records {
            let idx = match constituencies
                .iter()
                .position(|c| c.constituency == record.constituency)
            {
                Some(idx) => idx,
                None => {
                    constituencies.push(ConstituencyTotals {
                        constituency: record.constituency.clone(),
                        attendance: 0,
                        target: 0,
                        branch_count: 0,
                        rate: None,
                    });
                    constituencies.len() - 1
                }
            };
            let totals = &mut constituencies[idx];
            totals.attendance += u64::from(record.attendance);
            totals.target += u64::from(record.target);
            totals.branch_count += 1;
        }
        for totals in &mut constituencies {
            totals.rate = attendance_rate(totals.attendance as f64, totals.target as f64);
        }
        constituencies.sort_by(|a, b| by_rate_desc(a.rate, b.rate));

        let mut rated: Vec<&AttendanceRecord> =
            records.iter().filter(|r| r.rate.is_some()).collect();
        rated.sort_by(|a, b| by_rate_desc(a.rate, b.rate));
        let top_records = rated.iter().take(top_n).map(|r| (*r).clone()).collect();

        rated.sort_by(|a, b| by_rate_desc(b.rate, a.rate));
        let lowest_records = rated.iter().take(top_n).map(|r| (*r).clone()).collect();

        Self {
            total_records: records.len(),
            total_attendance,
            total_target,
            overall_rate: attendance_rate(total_attendance as f64, total_target as f64),
            constituencies,
            top_records,
            lowest_records,
        }
    }
}

// ── DatasetOverview ───────────────────────────────────────────────────────────

/// A branch and its mean weekly attendance over the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchAverage {
    pub branch: String,
    pub avg_attendance: f64,
}

/// Headline figures for a loaded dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetOverview {
    pub record_count: usize,
    pub constituency_count: usize,
    /// Distinct branch names.
    pub branch_count: usize,
    /// Mean attendance per record, 2 decimals.
    pub avg_attendance: f64,
    pub total_attendance: u64,
    /// Month label of the first record in dataset order.
    pub first_month: Option<String>,
    /// Month label of the last record in dataset order.
    pub last_month: Option<String>,
    /// Year label of the first record.
    pub year: Option<String>,
    /// Branches with the highest mean attendance, best first.
    pub top_branches: Vec<BranchAverage>,
}

impl DatasetOverview {
    pub fn from_records(records: &[AttendanceRecord], top_n: usize) -> Self {
        let attendances: Vec<f64> = records.iter().map(|r| f64::from(r.attendance)).collect();

        let constituencies: BTreeSet<&str> =
            records.iter().map(|r| r.constituency.as_str()).collect();

        let mut per_branch: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in records {
            per_branch
                .entry(record.branch.as_str())
                .or_default()
                .push(f64::from(record.attendance));
        }
        let branch_count = per_branch.len();

        let mut top_branches: Vec<BranchAverage> = per_branch
            .into_iter()
            .filter_map(|(branch, values)| {
                Some(BranchAverage {
                    branch: branch.to_string(),
                    avg_attendance: round_to(mean(&values)?, 2),
                })
            })
            .collect();
        top_branches.sort_by(|a, b| b.avg_attendance.total_cmp(&a.avg_attendance));
        top_branches.truncate(top_n);

        Self {
            record_count: records.len(),
            constituency_count: constituencies.len(),
            branch_count,
            avg_attendance: mean(&attendances).map(|m| round_to(m, 2)).unwrap_or(0.0),
            total_attendance: records.iter().map(|r| u64::from(r.attendance)).sum(),
            first_month: records.first().map(|r| r.month.clone()),
            last_month: records.last().map(|r| r.month.clone()),
            year: records.first().map(|r| r.year.clone()),
            top_branches,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
