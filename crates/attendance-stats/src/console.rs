//! Plain-text output for the `parse` and `analyze` modes.

use std::fmt::Write;

use attendance_core::formatting::{format_average, format_count, format_rate};
use attendance_core::models::{AttendanceRecord, Performer};
use attendance_data::parser::{SkipReason, SkippedLine};
use attendance_data::summary::{DatasetOverview, ReportSummary};

/// Parsed records, one line each, grouped under their constituency.
pub fn records_table(records: &[AttendanceRecord]) -> String {
    let mut out = String::new();
    let width = records
        .iter()
        .map(|r| r.branch.chars().count())
        .max()
        .unwrap_or(0)
        .max("Branch".len());

    let mut current: Option<&str> = None;
    for record in records {
        if current != Some(record.constituency.as_str()) {
            let _ = writeln!(out, "{}", record.constituency);
            current = Some(record.constituency.as_str());
        }
        let _ = writeln!(
            out,
            "  {:<width$}  {:>6} / {:<6} {:>8}",
            record.branch,
            record.attendance,
            record.target,
            format_rate(record.rate),
        );
    }
    out
}

pub fn report_summary(summary: &ReportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Records:     {}", format_count(summary.total_records as u64));
    let _ = writeln!(out, "Attendance:  {}", format_count(summary.total_attendance));
    let _ = writeln!(out, "Target:      {}", format_count(summary.total_target));
    let _ = writeln!(out, "Rate:        {}", format_rate(summary.overall_rate));

    if !summary.constituencies.is_empty() {
        let _ = writeln!(out, "\nBy constituency:");
        for c in &summary.constituencies {
            let _ = writeln!(
                out,
                "  {:<20} {:>6} / {:<6} {:>8}  ({} branches)",
                c.constituency,
                format_count(c.attendance),
                format_count(c.target),
                format_rate(c.rate),
                c.branch_count,
            );
        }
    }

    for (title, rows) in [
        ("Highest rates", &summary.top_records),
        ("Lowest rates", &summary.lowest_records),
    ] {
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for r in rows {
            let _ = writeln!(
                out,
                "  {} / {}: {}",
                r.constituency,
                r.branch,
                format_rate(r.rate)
            );
        }
    }
    out
}

pub fn skipped_lines(skipped: &[SkippedLine]) -> String {
    let mut out = String::new();
    for line in skipped {
        let reason = match line.reason {
            SkipReason::Malformed => "malformed",
            SkipReason::Orphan => "no constituency",
        };
        let _ = writeln!(out, "  line {:>4} ({reason}): {}", line.line_number, line.text);
    }
    out
}

pub fn overview(overview: &DatasetOverview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Records:         {}", format_count(overview.record_count as u64));
    let _ = writeln!(out, "Constituencies:  {}", overview.constituency_count);
    let _ = writeln!(out, "Branches:        {}", overview.branch_count);
    let _ = writeln!(out, "Avg attendance:  {}", format_average(overview.avg_attendance));
    let _ = writeln!(out, "Total:           {}", format_count(overview.total_attendance));
    if let (Some(first), Some(last)) = (&overview.first_month, &overview.last_month) {
        let year = overview.year.as_deref().unwrap_or("");
        let _ = writeln!(out, "Period:          {first} to {last} {year}");
    }
    if !overview.top_branches.is_empty() {
        let _ = writeln!(out, "\nTop branches:");
        for b in &overview.top_branches {
            let _ = writeln!(out, "  {:<24} {}", b.branch, format_average(b.avg_attendance));
        }
    }
    out
}

/// Performers grouped by month with a per-month rank.
pub fn performers(title: &str, rows: &[Performer]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}:");
    let mut month: Option<(&str, &str)> = None;
    let mut rank = 0;
    for row in rows {
        let key = (row.year.as_str(), row.month.as_str());
        if month != Some(key) {
            let _ = writeln!(out, "  {} {}", row.month, row.year);
            month = Some(key);
            rank = 0;
        }
        rank += 1;
        let _ = writeln!(
            out,
            "    {rank:>2}. {:<20} {:<20} {:>8} {:>8}",
            row.branch,
            row.constituency,
            format_average(row.avg_attendance),
            format_rate(row.rate),
        );
    }
    if rows.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
