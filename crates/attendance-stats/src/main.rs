mod bootstrap;
mod console;

use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use attendance_core::models::ReportContext;
use attendance_core::settings::Settings;
use attendance_data::analysis::{analyze_dataset, AnalysisOptions, AnalysisResult};
use attendance_data::export::export_workbook;
use attendance_data::parser::{ParserConfig, ReportParser};
use attendance_data::ranker::RankMetric;
use attendance_data::reader::append_records;
use attendance_data::summary::ReportSummary;
use attendance_ui::app::App;

fn main() -> ExitCode {
    let settings = Settings::load_with_last_used();

    if let Err(e) = bootstrap::ensure_directories() {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Attendance Stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Period: {} week {} {}, Theme: {}",
        settings.mode,
        settings.month,
        settings.week,
        settings.year,
        settings.theme
    );

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> Result<()> {
    match settings.mode.as_str() {
        "parse" => run_parse(settings),
        "analyze" => {
            let result = analyze(settings)?;
            print_analysis(&result);
            Ok(())
        }
        "view" => {
            let result = analyze(settings)?;
            App::new(&settings.theme, result)
                .run()
                .context("running the viewer")
        }
        unknown => Err(anyhow!("unknown mode: {unknown}")),
    }
}

// ── parse ─────────────────────────────────────────────────────────────────────

fn run_parse(settings: &Settings) -> Result<()> {
    let report = settings
        .report
        .as_deref()
        .ok_or_else(|| anyhow!("--report is required in parse mode"))?;
    let text = std::fs::read_to_string(report)
        .with_context(|| format!("reading report {}", report.display()))?;

    let parser = ReportParser::new(ParserConfig {
        header_delimiter: settings.header_delimiter,
        record_marker: settings.record_marker.clone(),
        ..ParserConfig::default()
    });
    let context = ReportContext::new(
        settings.reporter.as_str(),
        settings.month.as_str(),
        settings.week.as_str(),
        settings.year.as_str(),
    );
    let outcome = parser.parse_with_diagnostics(&text, &context);
    tracing::info!(
        "Parsed {} records from {} ({} lines skipped)",
        outcome.records.len(),
        report.display(),
        outcome.skipped.len()
    );

    print!("{}", console::records_table(&outcome.records));
    println!();
    let summary = ReportSummary::from_records(&outcome.records, settings.top_n as usize);
    print!("{}", console::report_summary(&summary));

    if settings.diagnostics && !outcome.skipped.is_empty() {
        println!("\nSkipped lines:");
        print!("{}", console::skipped_lines(&outcome.skipped));
    }

    if settings.append {
        let dataset = settings
            .dataset
            .as_deref()
            .ok_or_else(|| anyhow!("--append needs --dataset"))?;
        let written = append_records(dataset, &outcome.records)
            .with_context(|| format!("appending to {}", dataset.display()))?;
        println!("\nAppended {written} records to {}", dataset.display());
    }

    Ok(())
}

// ── analyze / view ────────────────────────────────────────────────────────────

fn analyze(settings: &Settings) -> Result<AnalysisResult> {
    let dataset = settings
        .dataset
        .as_deref()
        .ok_or_else(|| anyhow!("--dataset is required in {} mode", settings.mode))?;
    let metric: RankMetric = settings.rank_by.parse().map_err(|e: String| anyhow!(e))?;
    let options = AnalysisOptions {
        top_n: settings.top_n as usize,
        metric,
    };

    let result = analyze_dataset(dataset, &options)
        .with_context(|| format!("analyzing {}", dataset.display()))?;
    let written = export_workbook(&settings.output, &result)
        .with_context(|| format!("exporting to {}", settings.output.display()))?;
    tracing::info!("Results written to {}", written.display());

    Ok(result)
}

fn print_analysis(result: &AnalysisResult) {
    print!("{}", console::overview(&result.overview));
    println!();
    print!("{}", console::performers("Top performers", &result.top_performers));
    println!();
    print!("{}", console::performers("Low performers", &result.low_performers));
    if !result.target_variations.is_empty() {
        println!(
            "\n{} branch-months report more than one weekly target (see log).",
            result.target_variations.len()
        );
    }
}
