//! Dataset analysis pipeline.
//!
//! Loads a dataset, builds both monthly rollups, ranks branches per month and
//! collects the overview, returning an [`AnalysisResult`] ready for export and
//! for the viewer.

use std::path::Path;
use std::time::Instant;

use attendance_core::models::{
    AttendanceRecord, BranchMonthly, ConstituencyMonthly, Performer, TargetVariation,
};
use attendance_core::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::aggregator::AttendanceAggregator;
use crate::ranker::{RankMetric, Ranker, DEFAULT_TOP_N};
use crate::reader::load_dataset;
use crate::summary::DatasetOverview;

// ── Public types ──────────────────────────────────────────────────────────────

/// Knobs of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Branches kept at each end of the monthly ranking.
    pub top_n: usize,
    pub metric: RankMetric,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            metric: RankMetric::default(),
        }
    }
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Dataset file, when the records came from one.
    pub source: Option<String>,
    pub records_processed: usize,
    /// Dataset rows dropped for missing keys.
    pub rows_dropped: usize,
    pub branch_rows: usize,
    pub constituency_rows: usize,
    pub target_variations: usize,
    pub top_n: usize,
    pub rank_metric: String,
    /// Wall-clock seconds spent reading the dataset.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent aggregating and ranking.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_records`] / [`analyze_dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Cleaned input records.
    pub records: Vec<AttendanceRecord>,
    pub branch_monthly: Vec<BranchMonthly>,
    pub constituency_monthly: Vec<ConstituencyMonthly>,
    pub top_performers: Vec<Performer>,
    pub low_performers: Vec<Performer>,
    pub target_variations: Vec<TargetVariation>,
    pub overview: DatasetOverview,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run aggregation and ranking over already-cleaned records.
pub fn analyze_records(
    records: Vec<AttendanceRecord>,
    dropped_rows: usize,
    options: &AnalysisOptions,
) -> AnalysisResult {
    let start = Instant::now();

    // ── Step 1: Rollups ───────────────────────────────────────────────────────
    let branch_monthly = AttendanceAggregator::branch_monthly(&records);
    let constituency_monthly = AttendanceAggregator::constituency_monthly(&records);
    info!(
        "Aggregated {} records into {} branch rows and {} constituency rows",
        records.len(),
        branch_monthly.len(),
        constituency_monthly.len()
    );

    // ── Step 2: Target checks ─────────────────────────────────────────────────
    let target_variations = AttendanceAggregator::target_variations(&records);
    for v in &target_variations {
        warn!(
            "Target for {} / {} changed during {} {}: {} to {} ({} values); using {}",
            v.constituency,
            v.branch,
            v.month,
            v.year,
            v.min_target,
            v.max_target,
            v.distinct_targets,
            v.max_target
        );
    }

    // ── Step 3: Ranking ───────────────────────────────────────────────────────
    let ranker = Ranker::new(options.top_n).with_metric(options.metric);
    let top_performers = ranker.top_performers(&branch_monthly);
    let low_performers = ranker.bottom_performers(&branch_monthly);

    // ── Step 4: Overview ──────────────────────────────────────────────────────
    let overview = DatasetOverview::from_records(&records, options.top_n);

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        source: None,
        records_processed: records.len(),
        rows_dropped: dropped_rows,
        branch_rows: branch_monthly.len(),
        constituency_rows: constituency_monthly.len(),
        target_variations: target_variations.len(),
        top_n: options.top_n,
        rank_metric: format!("{:?}", options.metric),
        load_time_seconds: 0.0,
        aggregate_time_seconds: start.elapsed().as_secs_f64(),
    };

    AnalysisResult {
        records,
        branch_monthly,
        constituency_monthly,
        top_performers,
        low_performers,
        target_variations,
        overview,
        metadata,
    }
}

/// Load the dataset at `path` and analyze it.
pub fn analyze_dataset(path: &Path, options: &AnalysisOptions) -> Result<AnalysisResult> {
    let load_start = Instant::now();
    let dataset = load_dataset(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut result = analyze_records(dataset.records, dataset.dropped_rows, options);
    result.metadata.source = Some(path.display().to_string());
    result.metadata.load_time_seconds = load_time;
    Ok(result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::models::ReportContext;
    use attendance_core::AttendanceError;
    use tempfile::TempDir;

    fn records() -> Vec<AttendanceRecord> {
        let week = |w: &str| ReportContext::new("NA", "July", w, "2025");
        vec![
            AttendanceRecord::new("A", "B1", &week("1"), 4, 10),
            AttendanceRecord::new("A", "B1", &week("2"), 6, 10),
            AttendanceRecord::new("A", "B1", &week("3"), 8, 12),
            AttendanceRecord::new("A", "B2", &week("1"), 20, 20),
            AttendanceRecord::new("C", "C1", &week("1"), 1, 0),
        ]
    }

    #[test]
    fn test_analyze_records_builds_all_tables() {
        let result = analyze_records(records(), 2, &AnalysisOptions::default());

        assert_eq!(result.branch_monthly.len(), 3);
        assert_eq!(result.constituency_monthly.len(), 2);
        assert_eq!(result.top_performers.len(), 3);
        assert_eq!(result.low_performers.len(), 3);
        assert_eq!(result.target_variations.len(), 1);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.overview.record_count, 5);
    }

    #[test]
    fn test_analyze_records_metadata() {
        let options = AnalysisOptions {
            top_n: 2,
            metric: RankMetric::Rate,
        };
        let result = analyze_records(records(), 2, &options);
        let meta = &result.metadata;

        assert_eq!(meta.records_processed, 5);
        assert_eq!(meta.rows_dropped, 2);
        assert_eq!(meta.branch_rows, 3);
        assert_eq!(meta.constituency_rows, 2);
        assert_eq!(meta.target_variations, 1);
        assert_eq!(meta.top_n, 2);
        assert_eq!(meta.rank_metric, "Rate");
        assert!(meta.source.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.generated_at).is_ok());
    }

    #[test]
    fn test_analyze_records_ranking_options() {
        let options = AnalysisOptions {
            top_n: 1,
            metric: RankMetric::Rate,
        };
        let result = analyze_records(records(), 0, &options);
        // C1 has no target and so no rate; B2 is at 100%.
        assert_eq!(result.top_performers.len(), 1);
        assert_eq!(result.top_performers[0].branch, "B2");
        assert_eq!(result.low_performers[0].branch, "B1");
    }

    #[test]
    fn test_analyze_records_empty() {
        let result = analyze_records(Vec::new(), 0, &AnalysisOptions::default());
        assert!(result.branch_monthly.is_empty());
        assert!(result.top_performers.is_empty());
        assert_eq!(result.metadata.records_processed, 0);
    }

    #[test]
    fn test_analyze_dataset_from_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "Year,Month,Week,Constituency,Branch,Attendance,Target\n\
             2025,July,1,A,B1,4,10\n\
             2025,July,2,A,B1,6,10\n\
             2025,July,2,,B9,6,10\n",
        )
        .unwrap();

        let result = analyze_dataset(&path, &AnalysisOptions::default()).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.metadata.rows_dropped, 1);
        assert_eq!(result.metadata.source, Some(path.display().to_string()));
        assert_eq!(result.branch_monthly[0].avg_attendance, 5.0);
    }

    #[test]
    fn test_analyze_dataset_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = analyze_dataset(&dir.path().join("nope.csv"), &AnalysisOptions::default())
            .unwrap_err();
        assert!(matches!(err, AttendanceError::MissingInput(_)));
    }
}
