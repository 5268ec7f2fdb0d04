use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::months;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Monthly attendance statistics from weekly branch reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "attendance-stats",
    about = "Monthly attendance statistics from weekly branch reports",
    version
)]
pub struct Settings {
    /// What to run: parse a report, analyze a dataset, or analyze and view it
    #[arg(long, default_value = "analyze", value_parser = ["parse", "analyze", "view"])]
    pub mode: String,

    /// Attendance dataset (.csv, .xlsx, .xls or .ods)
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Weekly report text file to parse
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Append parsed records to the --dataset CSV file
    #[arg(long)]
    pub append: bool,

    /// Print the lines the parser skipped
    #[arg(long)]
    pub diagnostics: bool,

    /// Directory the analysis tables are written to
    #[arg(long, default_value = "attendance_analysis")]
    pub output: PathBuf,

    /// Reporter (pastor) the parsed report is filed under
    #[arg(long, default_value = "NA")]
    pub reporter: String,

    /// Report month (current month if "auto")
    #[arg(long, default_value = "auto")]
    pub month: String,

    /// Report week of the month (current week if "auto")
    #[arg(long, default_value = "auto")]
    pub week: String,

    /// Report year (current year if "auto")
    #[arg(long, default_value = "auto")]
    pub year: String,

    /// Number of top and bottom branches kept per month (1-100)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_n: u32,

    /// Metric branches are ranked by
    #[arg(long, default_value = "attendance", value_parser = ["attendance", "rate"])]
    pub rank_by: String,

    /// Character wrapping constituency header lines
    #[arg(long, default_value = "*")]
    pub header_delimiter: char,

    /// Token that starts a branch record line
    #[arg(long, default_value = "👉🏾")]
    pub record_marker: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.attendance-stats/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".attendance-stats").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring unreadable {}: {e}", path.display());
            Self::default()
        })
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the default config file if it exists.
    pub fn clear() -> Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument list
    /// and config path, so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            match LastUsedParams::clear_at(config_path) {
                Ok(()) => debug!("Cleared last-used params at {}", config_path.display()),
                Err(e) => warn!("Could not clear {}: {e}", config_path.display()),
            }
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap keys args by field name, not flag spelling.
        if !is_arg_explicitly_set(&matches, "dataset") && settings.dataset.is_none() {
            settings.dataset = last.dataset;
        }
        if !is_arg_explicitly_set(&matches, "output") {
            if let Some(v) = last.output {
                settings.output = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "reporter") {
            if let Some(v) = last.reporter {
                settings.reporter = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_n") {
            if let Some(v) = last.top_n {
                settings.top_n = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "rank_by") {
            if let Some(v) = last.rank_by {
                settings.rank_by = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            warn!("Could not save last-used params to {}: {e}", config_path.display());
        }

        settings
    }

    /// Resolve `"auto"` period labels and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        let (month, week, year) = months::current_period();
        if settings.month == "auto" {
            settings.month = month;
        }
        if settings.week == "auto" {
            settings.week = week;
        }
        if settings.year == "auto" {
            settings.year = year;
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            dataset: s.dataset.clone(),
            output: Some(s.output.clone()),
            reporter: Some(s.reporter.clone()),
            top_n: Some(s.top_n),
            rank_by: Some(s.rank_by.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
