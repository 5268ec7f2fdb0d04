use serde::{Deserialize, Serialize};

use crate::calculations::attendance_rate;

/// Who filed a report and for which period.
///
/// Every record parsed out of one report text is stamped with the same
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportContext {
    /// Reporter (pastor) name.
    pub reporter: String,
    /// Month label, usually a full English month name such as `"July"`.
    pub month: String,
    /// Week-of-month label, e.g. `"5"`.
    pub week: String,
    /// Year label, e.g. `"2025"`.
    pub year: String,
}

impl ReportContext {
    pub fn new(
        reporter: impl Into<String>,
        month: impl Into<String>,
        week: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            reporter: reporter.into(),
            month: month.into(),
            week: week.into(),
            year: year.into(),
        }
    }
}

/// One branch's attendance for one week.
///
/// Field order and column names match the dataset layout, so the same struct
/// is (de)serialised straight from and to CSV rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "Constituency")]
    pub constituency: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    /// Reporter (pastor) the record was filed by.
    #[serde(rename = "Pastor", default)]
    pub reporter: String,
    #[serde(rename = "Attendance")]
    pub attendance: u32,
    /// Expected headcount; `0` means missing.
    #[serde(rename = "Target")]
    pub target: u32,
    /// `attendance / target * 100`, 2 decimals; `None` when target is 0.
    #[serde(rename = "Attendance_Rate")]
    pub rate: Option<f64>,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Week")]
    pub week: String,
    #[serde(rename = "Year")]
    pub year: String,
}

impl AttendanceRecord {
    /// Build a record, computing its rate immediately.
    pub fn new(
        constituency: impl Into<String>,
        branch: impl Into<String>,
        context: &ReportContext,
        attendance: u32,
        target: u32,
    ) -> Self {
        Self {
            constituency: constituency.into(),
            branch: branch.into(),
            reporter: context.reporter.clone(),
            attendance,
            target,
            rate: attendance_rate(attendance as f64, target as f64),
            month: context.month.clone(),
            week: context.week.clone(),
            year: context.year.clone(),
        }
    }
}

/// Monthly rollup for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMonthly {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Constituency")]
    pub constituency: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    /// Mean weekly attendance, 2 decimals.
    #[serde(rename = "Monthly_Attendance_Avg")]
    pub avg_attendance: f64,
    /// Largest weekly target seen for the branch in the month.
    #[serde(rename = "Target")]
    pub target: u32,
    #[serde(rename = "Attendance_Rate")]
    pub rate: Option<f64>,
}

/// Monthly rollup for one constituency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituencyMonthly {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Constituency")]
    pub constituency: String,
    /// Number of branch-week records in the group.
    #[serde(rename = "Reports_Count")]
    pub report_count: usize,
    #[serde(rename = "Total_Attendance")]
    pub total_attendance: u64,
    /// Informational only; not used by any derived field.
    #[serde(rename = "Unique_Branches")]
    pub unique_branches: usize,
    #[serde(rename = "Total_Target")]
    pub total_target: u64,
    /// `total_attendance / report_count`, 2 decimals.
    #[serde(rename = "Monthly_Attendance_Avg")]
    pub avg_attendance: f64,
    /// `total_target / report_count` rounded to a whole number.
    #[serde(rename = "Target")]
    pub target: u64,
    #[serde(rename = "Attendance_Rate")]
    pub rate: Option<f64>,
}

/// A branch-month row selected by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Constituency")]
    pub constituency: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Monthly_Attendance_Avg")]
    pub avg_attendance: f64,
    #[serde(rename = "Attendance_Rate")]
    pub rate: Option<f64>,
}

impl From<&BranchMonthly> for Performer {
    fn from(row: &BranchMonthly) -> Self {
        Self {
            year: row.year.clone(),
            month: row.month.clone(),
            constituency: row.constituency.clone(),
            branch: row.branch.clone(),
            avg_attendance: row.avg_attendance,
            rate: row.rate,
        }
    }
}

/// A branch whose weekly target changed within one month.
///
/// The branch rollup keeps the largest target; this records what was
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetVariation {
    pub year: String,
    pub month: String,
    pub constituency: String,
    pub branch: String,
    pub min_target: u32,
    pub max_target: u32,
    /// Number of different target values reported.
    pub distinct_targets: usize,
}
