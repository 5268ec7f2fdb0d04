//! Monthly rollups over attendance records.
//!
//! Two levels: per branch (mean weekly attendance against the largest weekly
//! target) and per constituency (totals over every branch-week, with the mean
//! target). Rows come out ordered by year, calendar month, constituency and
//! branch.

use std::collections::{BTreeMap, BTreeSet};

use attendance_core::calculations::{attendance_rate, round_to};
use attendance_core::models::{
    AttendanceRecord, BranchMonthly, ConstituencyMonthly, TargetVariation,
};
use attendance_core::months::month_sort_key;

// ── Group keys ────────────────────────────────────────────────────────────────

/// Ordering key for a month group. Field order is the output order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PeriodKey {
    year: String,
    month_order: (u32, String),
    month: String,
    constituency: String,
}

impl PeriodKey {
    fn of(record: &AttendanceRecord) -> Self {
        Self {
            year: record.year.clone(),
            month_order: month_sort_key(&record.month),
            month: record.month.clone(),
            constituency: record.constituency.clone(),
        }
    }
}

type BranchKey = (PeriodKey, String);

fn branch_key(record: &AttendanceRecord) -> BranchKey {
    (PeriodKey::of(record), record.branch.clone())
}

// ── Accumulators ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BranchStats {
    total_attendance: u64,
    weeks: u64,
    max_target: u32,
}

impl BranchStats {
    fn add(&mut self, record: &AttendanceRecord) {
        self.total_attendance += u64::from(record.attendance);
        self.weeks += 1;
        self.max_target = self.max_target.max(record.target);
    }
}

#[derive(Debug, Default)]
struct ConstituencyStats {
    reports: usize,
    total_attendance: u64,
    total_target: u64,
    branches: BTreeSet<String>,
}

impl ConstituencyStats {
    fn add(&mut self, record: &AttendanceRecord) {
        self.reports += 1;
        self.total_attendance += u64::from(record.attendance);
        self.total_target += u64::from(record.target);
        self.branches.insert(record.branch.clone());
    }
}

// ── AttendanceAggregator ──────────────────────────────────────────────────────

/// Stateless helper that rolls weekly records up to monthly tables.
pub struct AttendanceAggregator;

impl AttendanceAggregator {
    /// One row per (year, month, constituency, branch).
    ///
    /// The average is rounded to 2 decimals before the rate is derived from
    /// it; the target is the largest weekly target of the month.
    pub fn branch_monthly(records: &[AttendanceRecord]) -> Vec<BranchMonthly> {
        let mut groups: BTreeMap<BranchKey, BranchStats> = BTreeMap::new();
        for record in records {
            groups.entry(branch_key(record)).or_default().add(record);
        }

        groups
            .into_iter()
            .map(|((period, branch), stats)| {
                let avg_attendance =
                    round_to(stats.total_attendance as f64 / stats.weeks as f64, 2);
                BranchMonthly {
                    year: period.year,
                    month: period.month,
                    constituency: period.constituency,
                    branch,
                    avg_attendance,
                    target: stats.max_target,
                    rate: attendance_rate(avg_attendance, f64::from(stats.max_target)),
                }
            })
            .collect()
    }

    /// One row per (year, month, constituency).
    ///
    /// `report_count` counts branch-week records. The target is the mean
    /// reported target rounded to a whole number.
    pub fn constituency_monthly(records: &[AttendanceRecord]) -> Vec<ConstituencyMonthly> {
        let mut groups: BTreeMap<PeriodKey, ConstituencyStats> = BTreeMap::new();
        for record in records {
            groups.entry(PeriodKey::of(record)).or_default().add(record);
        }

        groups
            .into_iter()
            .map(|(period, stats)| {
                let count = stats.reports as f64;
                let avg_attendance = round_to(stats.total_attendance as f64 / count, 2);
                let target = round_to(stats.total_target as f64 / count, 0) as u64;
                ConstituencyMonthly {
                    year: period.year,
                    month: period.month,
                    constituency: period.constituency,
                    report_count: stats.reports,
                    total_attendance: stats.total_attendance,
                    unique_branches: stats.branches.len(),
                    total_target: stats.total_target,
                    avg_attendance,
                    target,
                    rate: attendance_rate(avg_attendance, target as f64),
                }
            })
            .collect()
    }

    /// Branch-months whose weekly targets were not all the same.
    pub fn target_variations(records: &[AttendanceRecord]) -> Vec<TargetVariation> {
        let mut groups: BTreeMap<BranchKey, BTreeSet<u32>> = BTreeMap::new();
        for record in records {
            groups
                .entry(branch_key(record))
                .or_default()
                .insert(record.target);
        }

        groups
            .into_iter()
            .filter(|(_, targets)| targets.len() > 1)
            .filter_map(|((period, branch), targets)| {
                Some(TargetVariation {
                    year: period.year,
                    month: period.month,
                    constituency: period.constituency,
                    branch,
                    min_target: *targets.first()?,
                    max_target: *targets.last()?,
                    distinct_targets: targets.len(),
                })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::models::ReportContext;

    fn rec(
        month: &str,
        week: &str,
        constituency: &str,
        branch: &str,
        attendance: u32,
        target: u32,
    ) -> AttendanceRecord {
        let ctx = ReportContext::new("NA", month, week, "2025");
        AttendanceRecord::new(constituency, branch, &ctx, attendance, target)
    }

    // ── branch_monthly ────────────────────────────────────────────────────────

    #[test]
    fn test_branch_mean_attendance_and_max_target() {
        let records = vec![
            rec("July", "1", "A", "B", 4, 10),
            rec("July", "2", "A", "B", 6, 10),
            rec("July", "3", "A", "B", 8, 12),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_attendance, 6.0);
        assert_eq!(rows[0].target, 12);
        assert_eq!(rows[0].rate, Some(50.0));
    }

    #[test]
    fn test_branch_rate_uses_rounded_average() {
        // 10/3 = 3.333.. -> 3.33; 3.33 / 7 = 47.571.. -> 47.57
        let records = vec![
            rec("July", "1", "A", "B", 3, 7),
            rec("July", "2", "A", "B", 3, 7),
            rec("July", "3", "A", "B", 4, 7),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);
        assert_eq!(rows[0].avg_attendance, 3.33);
        assert_eq!(rows[0].rate, Some(47.57));
    }

    #[test]
    fn test_branch_zero_target_has_no_rate() {
        let records = vec![
            rec("July", "1", "A", "B", 4, 0),
            rec("July", "2", "A", "B", 6, 0),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);
        assert_eq!(rows[0].target, 0);
        assert_eq!(rows[0].rate, None);
    }

    #[test]
    fn test_branch_groups_by_constituency_and_branch() {
        let records = vec![
            rec("July", "1", "A", "B1", 4, 10),
            rec("July", "1", "A", "B2", 5, 10),
            rec("July", "1", "C", "B1", 6, 10),
            rec("July", "2", "A", "B1", 6, 10),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);
        let keys: Vec<(&str, &str, f64)> = rows
            .iter()
            .map(|r| (r.constituency.as_str(), r.branch.as_str(), r.avg_attendance))
            .collect();
        assert_eq!(keys, vec![("A", "B1", 5.0), ("A", "B2", 5.0), ("C", "B1", 6.0)]);
    }

    #[test]
    fn test_branch_months_in_calendar_order() {
        let records = vec![
            rec("September", "1", "A", "B", 1, 2),
            rec("July", "1", "A", "B", 1, 2),
            rec("August", "1", "A", "B", 1, 2),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);
        let months: Vec<&str> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["July", "August", "September"]);
    }

    #[test]
    fn test_years_sort_before_months() {
        let ctx_2024 = ReportContext::new("NA", "December", "1", "2024");
        let records = vec![
            rec("January", "1", "A", "B", 1, 2),
            AttendanceRecord::new("A", "B", &ctx_2024, 1, 2),
        ];
        let rows = AttendanceAggregator::branch_monthly(&records);
        let periods: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.year.as_str(), r.month.as_str()))
            .collect();
        assert_eq!(periods, vec![("2024", "December"), ("2025", "January")]);
    }

    #[test]
    fn test_branch_empty_input() {
        assert!(AttendanceAggregator::branch_monthly(&[]).is_empty());
    }

    // ── constituency_monthly ──────────────────────────────────────────────────

    #[test]
    fn test_constituency_totals_and_mean_target() {
        let records = vec![
            rec("July", "1", "A", "B1", 4, 10),
            rec("July", "1", "A", "B2", 6, 12),
        ];
        let rows = AttendanceAggregator::constituency_monthly(&records);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.report_count, 2);
        assert_eq!(row.total_attendance, 10);
        assert_eq!(row.total_target, 22);
        assert_eq!(row.unique_branches, 2);
        assert_eq!(row.avg_attendance, 5.0);
        assert_eq!(row.target, 11);
        assert_eq!(row.rate, Some(45.45));
    }

    #[test]
    fn test_constituency_counts_records_not_branches() {
        let records = vec![
            rec("July", "1", "A", "B1", 4, 10),
            rec("July", "2", "A", "B1", 6, 10),
            rec("July", "3", "A", "B1", 8, 10),
            rec("July", "1", "A", "B2", 2, 10),
        ];
        let rows = AttendanceAggregator::constituency_monthly(&records);
        assert_eq!(rows[0].report_count, 4);
        assert_eq!(rows[0].unique_branches, 2);
        assert_eq!(rows[0].avg_attendance, 5.0);
    }

    #[test]
    fn test_constituency_target_rounds_half_to_even() {
        let records = vec![
            rec("July", "1", "A", "B1", 5, 10),
            rec("July", "1", "A", "B2", 5, 11),
        ];
        let rows = AttendanceAggregator::constituency_monthly(&records);
        assert_eq!(rows[0].target, 10);
        assert_eq!(rows[0].rate, Some(50.0));
    }

    #[test]
    fn test_constituency_zero_target_has_no_rate() {
        let records = vec![rec("July", "1", "A", "B1", 5, 0)];
        let rows = AttendanceAggregator::constituency_monthly(&records);
        assert_eq!(rows[0].target, 0);
        assert_eq!(rows[0].rate, None);
    }

    #[test]
    fn test_constituency_order() {
        let records = vec![
            rec("August", "1", "Zion", "B", 1, 2),
            rec("July", "1", "Zion", "B", 1, 2),
            rec("July", "1", "Abba", "B", 1, 2),
        ];
        let rows = AttendanceAggregator::constituency_monthly(&records);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.month.as_str(), r.constituency.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("July", "Abba"), ("July", "Zion"), ("August", "Zion")]
        );
    }

    // ── target_variations ─────────────────────────────────────────────────────

    #[test]
    fn test_target_variation_detected() {
        let records = vec![
            rec("July", "1", "A", "B", 4, 10),
            rec("July", "2", "A", "B", 6, 10),
            rec("July", "3", "A", "B", 8, 12),
            rec("July", "1", "A", "Steady", 8, 12),
            rec("July", "2", "A", "Steady", 9, 12),
        ];
        let variations = AttendanceAggregator::target_variations(&records);

        assert_eq!(variations.len(), 1);
        assert_eq!(variations[0].branch, "B");
        assert_eq!(variations[0].min_target, 10);
        assert_eq!(variations[0].max_target, 12);
        assert_eq!(variations[0].distinct_targets, 2);
    }

    #[test]
    fn test_target_variation_none_when_constant() {
        let records = vec![
            rec("July", "1", "A", "B", 4, 10),
            rec("July", "2", "A", "B", 6, 10),
        ];
        assert!(AttendanceAggregator::target_variations(&records).is_empty());
    }
}
