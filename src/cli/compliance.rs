//! Summary and compliance command handlers.
//!
//! `summary` prints status counts for a results file; `compliance` checks the
//! counts against a threshold spec and turns the verdict into an exit code.

use crate::compliance::{evaluate, summarize, ClauseOutcome, SummaryReport, ThresholdSpec};
use crate::config::AppConfig;
use crate::parsers::InspecParser;
use crate::pipeline::{exit_codes, read_profile, write_output, OutputTarget, ReadOptions};
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Rendering of the `summary` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Aligned text table
    #[default]
    Text,
    /// Full report as JSON
    Json,
}

fn summarize_file(input: &Path, config: &AppConfig) -> Result<SummaryReport> {
    let parser = InspecParser::new().with_duplicate_policy(config.duplicate_policy());
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet: config.behavior.quiet,
    };
    let profile = read_profile(input, &parser, read)?;
    Ok(summarize(&profile))
}

/// Run the summary command
pub fn run_summary(
    input: &Path,
    format: SummaryFormat,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> Result<()> {
    let report = summarize_file(input, config)?;
    let content = match format {
        SummaryFormat::Json => report.to_json().context("Failed to serialize summary")?,
        SummaryFormat::Text => format_summary_text(&report),
    };
    write_output(&content, &OutputTarget::from_option(output), config.behavior.quiet)
}

/// Where the threshold spec comes from
#[derive(Debug, Clone)]
pub enum ThresholdSource {
    File(PathBuf),
    Inline(String),
}

/// Run the compliance command, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
pub fn run_compliance(
    input: &Path,
    source: Option<ThresholdSource>,
    config: &AppConfig,
) -> Result<i32> {
    let Some(source) = source else {
        tracing::error!("Please provide a threshold with --threshold-file or --threshold-inline");
        return Ok(exit_codes::THRESHOLD_NOT_MET);
    };
    let spec = match &source {
        ThresholdSource::File(path) => ThresholdSpec::from_file(path)
            .with_context(|| format!("Failed to load threshold {}", path.display()))?,
        ThresholdSource::Inline(text) => {
            ThresholdSpec::from_yaml_str(text).context("Failed to parse inline threshold")?
        }
    };

    let report = summarize_file(input, config)?;
    let outcomes = evaluate(&report, &spec);
    let met = outcomes.iter().all(|o| o.met);

    if !config.behavior.quiet {
        for outcome in &outcomes {
            log_outcome(outcome, config.behavior.verbose);
        }
        tracing::info!(
            "Compliance {:.2}%: threshold {}",
            report.compliance,
            if met { "met" } else { "NOT met" }
        );
    }

    Ok(if met {
        exit_codes::SUCCESS
    } else {
        exit_codes::THRESHOLD_NOT_MET
    })
}

fn log_outcome(outcome: &ClauseOutcome, verbose: bool) {
    let actual = outcome
        .actual
        .map_or_else(|| "absent".to_string(), |v| format!("{v:.2}"));
    if !outcome.met {
        tracing::warn!("Threshold not met: {} (actual {})", outcome.clause, actual);
    } else if verbose {
        tracing::info!("Threshold met: {} (actual {})", outcome.clause, actual);
    }
}

fn format_summary_text(report: &SummaryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profile: {}", report.name);
    let _ = writeln!(
        out,
        "Controls: {} ({} scored, {} not run, {} no impact)",
        report.total_controls, report.scored, report.not_run, report.no_impact
    );
    let _ = writeln!(out, "Compliance: {:.2}%", report.compliance);
    out.push('\n');

    let severities: Vec<&String> = report.severity_totals.keys().collect();
    let _ = write!(out, "{:<10}{:>7}", "status", "total");
    for severity in &severities {
        let _ = write!(out, "{severity:>10}");
    }
    out.push('\n');

    for (status, breakdown) in &report.statuses {
        let _ = write!(out, "{status:<10}{:>7}", breakdown.total);
        for severity in &severities {
            let count = breakdown.by_severity.get(*severity).copied().unwrap_or(0);
            let _ = write!(out, "{count:>10}");
        }
        out.push('\n');
    }
    out
}
