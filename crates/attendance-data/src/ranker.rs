//! Top and bottom branches per reporting month.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use attendance_core::models::{BranchMonthly, Performer};
use attendance_core::months::month_sort_key;

/// Number of branches kept at each end when not configured.
pub const DEFAULT_TOP_N: usize = 5;

/// Value branches are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMetric {
    /// Mean weekly attendance.
    #[default]
    AverageAttendance,
    /// Attendance rate. Rows without a rate are left out.
    Rate,
}

impl RankMetric {
    fn value(self, row: &BranchMonthly) -> Option<f64> {
        match self {
            RankMetric::AverageAttendance => Some(row.avg_attendance),
            RankMetric::Rate => row.rate,
        }
    }
}

impl std::str::FromStr for RankMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "attendance" | "avg" | "average" => Ok(RankMetric::AverageAttendance),
            "rate" => Ok(RankMetric::Rate),
            other => Err(format!("unknown rank metric: {other}")),
        }
    }
}

/// Picks the N highest and N lowest branch rows of every month.
///
/// Months are grouped by their label alone, so branches from every
/// constituency (and every year sharing the label) compete together.
/// Equal values keep their incoming order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranker {
    top_n: usize,
    metric: RankMetric,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl Ranker {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            metric: RankMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: RankMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn metric(&self) -> RankMetric {
        self.metric
    }

    /// Highest `top_n` rows per month, best first.
    pub fn top_performers(&self, rows: &[BranchMonthly]) -> Vec<Performer> {
        self.select(rows, |a, b| b.total_cmp(&a))
    }

    /// Lowest `top_n` rows per month, worst first.
    pub fn bottom_performers(&self, rows: &[BranchMonthly]) -> Vec<Performer> {
        self.select(rows, |a, b| a.total_cmp(&b))
    }

    fn select(&self, rows: &[BranchMonthly], order: impl Fn(f64, f64) -> Ordering) -> Vec<Performer> {
        let mut by_month: BTreeMap<((u32, String), &str), Vec<(f64, &BranchMonthly)>> =
            BTreeMap::new();
        for row in rows {
            if let Some(value) = self.metric.value(row) {
                by_month
                    .entry((month_sort_key(&row.month), row.month.as_str()))
                    .or_default()
                    .push((value, row));
            }
        }

        by_month
            .into_values()
            .flat_map(|mut group| {
                // sort_by is stable: ties keep input order.
                group.sort_by(|(a, _), (b, _)| order(*a, *b));
                group
                    .into_iter()
                    .take(self.top_n)
                    .map(|(_, row)| Performer::from(row))
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: &str, constituency: &str, branch: &str, avg: f64, rate: Option<f64>) -> BranchMonthly {
        BranchMonthly {
            year: "2025".to_string(),
            month: month.to_string(),
            constituency: constituency.to_string(),
            branch: branch.to_string(),
            avg_attendance: avg,
            target: 10,
            rate,
        }
    }

    fn six_rows() -> Vec<BranchMonthly> {
        vec![
            row("July", "A", "B1", 12.0, Some(120.0)),
            row("July", "A", "B2", 3.0, Some(30.0)),
            row("July", "C", "B3", 8.5, Some(85.0)),
            row("July", "C", "B4", 20.0, Some(200.0)),
            row("July", "D", "B5", 1.0, Some(10.0)),
            row("July", "D", "B6", 5.0, Some(50.0)),
        ]
    }

    fn branches(performers: &[Performer]) -> Vec<&str> {
        performers.iter().map(|p| p.branch.as_str()).collect()
    }

    #[test]
    fn test_top_and_bottom_are_complementary() {
        let ranker = Ranker::new(3);
        let rows = six_rows();
        let top = ranker.top_performers(&rows);
        let bottom = ranker.bottom_performers(&rows);

        assert_eq!(branches(&top), vec!["B4", "B1", "B3"]);
        assert_eq!(branches(&bottom), vec!["B5", "B2", "B6"]);

        let mut all: Vec<&str> = branches(&top);
        all.extend(branches(&bottom));
        all.sort();
        assert_eq!(all, vec!["B1", "B2", "B3", "B4", "B5", "B6"]);
    }

    #[test]
    fn test_ranking_spans_constituencies() {
        let top = Ranker::new(2).top_performers(&six_rows());
        let constituencies: Vec<&str> = top.iter().map(|p| p.constituency.as_str()).collect();
        assert_eq!(constituencies, vec!["C", "A"]);
    }

    #[test]
    fn test_default_keeps_five() {
        let ranker = Ranker::default();
        assert_eq!(ranker.top_n(), DEFAULT_TOP_N);
        assert_eq!(ranker.metric(), RankMetric::AverageAttendance);
        assert_eq!(ranker.top_performers(&six_rows()).len(), 5);
    }

    #[test]
    fn test_fewer_rows_than_n() {
        let rows = vec![row("July", "A", "B1", 4.0, None)];
        assert_eq!(Ranker::new(5).top_performers(&rows).len(), 1);
        assert_eq!(Ranker::new(5).bottom_performers(&rows).len(), 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let rows = vec![
            row("July", "A", "First", 7.0, None),
            row("July", "A", "Second", 7.0, None),
            row("July", "A", "Third", 7.0, None),
        ];
        let ranker = Ranker::new(2);
        assert_eq!(branches(&ranker.top_performers(&rows)), vec!["First", "Second"]);
        assert_eq!(branches(&ranker.bottom_performers(&rows)), vec!["First", "Second"]);
    }

    #[test]
    fn test_each_month_ranked_separately_in_calendar_order() {
        let rows = vec![
            row("August", "A", "Aug-low", 1.0, None),
            row("August", "A", "Aug-high", 9.0, None),
            row("July", "A", "Jul-low", 2.0, None),
            row("July", "A", "Jul-high", 8.0, None),
        ];
        let top = Ranker::new(1).top_performers(&rows);
        assert_eq!(branches(&top), vec!["Jul-high", "Aug-high"]);
        let bottom = Ranker::new(1).bottom_performers(&rows);
        assert_eq!(branches(&bottom), vec!["Jul-low", "Aug-low"]);
    }

    #[test]
    fn test_rank_by_rate_skips_undefined() {
        let rows = vec![
            row("July", "A", "Big", 50.0, None),
            row("July", "A", "Small", 5.0, Some(100.0)),
            row("July", "A", "Mid", 8.0, Some(40.0)),
        ];
        let ranker = Ranker::new(5).with_metric(RankMetric::Rate);
        assert_eq!(branches(&ranker.top_performers(&rows)), vec!["Small", "Mid"]);
        assert_eq!(branches(&ranker.bottom_performers(&rows)), vec!["Mid", "Small"]);
    }

    #[test]
    fn test_rank_metric_from_str() {
        assert_eq!("rate".parse::<RankMetric>(), Ok(RankMetric::Rate));
        assert_eq!(
            "attendance".parse::<RankMetric>(),
            Ok(RankMetric::AverageAttendance)
        );
        assert!("volume".parse::<RankMetric>().is_err());
    }

    #[test]
    fn test_empty_rows() {
        assert!(Ranker::default().top_performers(&[]).is_empty());
    }
}
