//! Weekly report text to [`AttendanceRecord`]s.
//!
//! A report is a loose chat message: constituency header lines wrapped in a
//! delimiter (`*CENTRAL*`) followed by one marker-prefixed line per branch
//! (`👉🏾Branch 1 - 10/15`). Anything else is chatter and is ignored.

use std::sync::OnceLock;

use attendance_core::models::{AttendanceRecord, ReportContext};
use regex::Regex;
use tracing::debug;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Line grammar of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Character wrapping a constituency header on both ends.
    pub header_delimiter: char,
    /// Token a branch record line starts with.
    pub record_marker: String,
    /// Characters accepted between attendance and target.
    pub separators: [char; 2],
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_delimiter: '*',
            record_marker: "👉🏾".to_string(),
            separators: ['/', '|'],
        }
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why a record line produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The line did not match `<name> - <attendance><sep><target>`.
    Malformed,
    /// The line came before any constituency header.
    Orphan,
}

/// A record line the parser dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the report text.
    pub line_number: usize,
    /// The trimmed line.
    pub text: String,
    pub reason: SkipReason,
}

/// Records plus the lines that were dropped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<AttendanceRecord>,
    pub skipped: Vec<SkippedLine>,
}

// ── Scanner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    NoConstituency,
    InConstituency(String),
}

/// Fold accumulator threaded through the line scan.
struct Scan {
    state: ScanState,
    outcome: ParseOutcome,
}

/// Converts report text into attendance records in one forward pass.
#[derive(Debug, Clone, Default)]
pub struct ReportParser {
    config: ParserConfig,
}

impl ReportParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse `text`, silently dropping record lines that yield no record.
    pub fn parse(&self, text: &str, context: &ReportContext) -> Vec<AttendanceRecord> {
        self.parse_with_diagnostics(text, context).records
    }

    /// Parse `text` and also report every dropped record line.
    pub fn parse_with_diagnostics(&self, text: &str, context: &ReportContext) -> ParseOutcome {
        let initial = Scan {
            state: ScanState::NoConstituency,
            outcome: ParseOutcome::default(),
        };

        let scan = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .fold(initial, |scan, (line_number, line)| {
                self.step(scan, line_number, line, context)
            });

        debug!(
            "Parsed {} records, skipped {} lines",
            scan.outcome.records.len(),
            scan.outcome.skipped.len()
        );
        scan.outcome
    }

    fn step(&self, mut scan: Scan, line_number: usize, line: &str, context: &ReportContext) -> Scan {
        if let Some(name) = header_name(line, self.config.header_delimiter) {
            debug!("line {line_number}: constituency header {name:?}");
            scan.state = if name.is_empty() {
                ScanState::NoConstituency
            } else {
                ScanState::InConstituency(name.to_string())
            };
            return scan;
        }

        if !line.starts_with(self.config.record_marker.as_str()) {
            return scan;
        }

        let reason = match &scan.state {
            ScanState::NoConstituency => Some(SkipReason::Orphan),
            ScanState::InConstituency(constituency) => {
                match parse_record_line(line, constituency, context, &self.config) {
                    Some(record) => {
                        scan.outcome.records.push(record);
                        None
                    }
                    None => Some(SkipReason::Malformed),
                }
            }
        };
        let Some(reason) = reason else {
            return scan;
        };

        debug!("line {line_number}: dropped ({reason:?}) {line:?}");
        scan.outcome.skipped.push(SkippedLine {
            line_number,
            text: line.to_string(),
            reason,
        });
        scan
    }
}

// ── Line grammar ──────────────────────────────────────────────────────────────

fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)\s*-\s*(\d+)\s*([^\s\d])\s*(\d+)$").expect("regex is valid")
    })
}

/// Constituency name of a header line, if `line` is one.
///
/// A line made only of delimiters is a header with an empty name; it closes
/// the current constituency.
fn header_name(line: &str, delimiter: char) -> Option<&str> {
    if !line.starts_with(delimiter) || !line.ends_with(delimiter) {
        return None;
    }
    Some(line.trim_matches(delimiter).trim())
}

/// Extract one record from a branch line under `constituency`.
///
/// The record marker is stripped when present. Returns `None` when the rest
/// of the line is not `<name> - <attendance><sep><target>` with `<sep>` one
/// of the configured separators.
pub fn parse_record_line(
    line: &str,
    constituency: &str,
    context: &ReportContext,
    config: &ParserConfig,
) -> Option<AttendanceRecord> {
    let body = line
        .trim()
        .strip_prefix(config.record_marker.as_str())
        .unwrap_or(line)
        .trim();

    let caps = record_pattern().captures(body)?;

    let separator = caps[3].chars().next()?;
    if !config.separators.contains(&separator) {
        return None;
    }

    let branch = caps[1].trim();
    if branch.is_empty() {
        return None;
    }
    let attendance: u32 = caps[2].parse().ok()?;
    let target: u32 = caps[4].parse().ok()?;

    Some(AttendanceRecord::new(
        constituency,
        branch,
        context,
        attendance,
        target,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
