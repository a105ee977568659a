//! CSV command handlers.
//!
//! Implements `csv2inspec` and `inspec2csv`.

use crate::config::{AppConfig, DEFAULT_DESC_WIDTH};
use crate::mapping::{CsvExportMapping, CsvMapping, MULTI_VALUE_DELIMITER};
use crate::model::inject_profile_metadata;
use crate::parsers::{CsvParser, InspecParser};
use crate::pipeline::{
    load_profile_metadata, read_profile, write_output, write_profile, OutputTarget,
    ProfileOutput, ReadOptions,
};
use crate::reports::{render_csv_string, CsvWriter, ProfileFormat};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Options for `csv2inspec`
#[derive(Debug, Clone)]
pub struct CsvImportOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Column mapping; falls back to `csv.mapping`, then the STIG Viewer layout
    pub mapping: Option<PathBuf>,
    pub format: Option<ProfileFormat>,
    pub single_file: bool,
    /// Tag renames applied after column resolution
    pub replace_tags: Vec<String>,
    pub metadata: Option<PathBuf>,
}

/// Run the csv2inspec command
#[allow(clippy::needless_pass_by_value)]
pub fn run_csv2inspec(options: CsvImportOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    let mapping = import_mapping(options.mapping.as_deref(), config)?;
    let mapper = super::xccdf::build_tag_mapper(config, None, &options.replace_tags)?;

    let source_name = options
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| crate::config::DEFAULT_PROFILE_NAME.to_string());

    let parser = CsvParser::new(mapping)
        .with_source_name(source_name)
        .with_tag_mapper(mapper)
        .with_duplicate_policy(config.duplicate_policy())
        .verbose(config.behavior.verbose);
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet,
    };
    let mut profile = read_profile(&options.input, &parser, read)?;

    if let Some(record) = load_profile_metadata(options.metadata.as_deref())? {
        profile = inject_profile_metadata(profile, &record);
    }

    let output = ProfileOutput {
        format: options.format.unwrap_or(config.output.format),
        separate_files: config.output.separate_files && !options.single_file,
        destination: options.output,
    };
    write_profile(&profile, &output, quiet)?;
    Ok(())
}

fn import_mapping(explicit: Option<&Path>, config: &AppConfig) -> Result<CsvMapping> {
    let path = explicit.or(config.csv.mapping.as_deref());
    let mut mapping = match path {
        Some(path) => CsvMapping::from_file(path)
            .with_context(|| format!("Failed to load CSV mapping {}", path.display()))?,
        None => {
            tracing::debug!("No CSV mapping given, using the STIG Viewer column layout");
            CsvMapping::default()
        }
    };
    if config.csv.width != DEFAULT_DESC_WIDTH {
        mapping.width = config.csv.width;
    }
    Ok(mapping)
}

/// Options for `inspec2csv`
#[derive(Debug, Clone)]
pub struct CsvExportOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Export column mapping; falls back to `csv.export_mapping`
    pub export_mapping: Option<PathBuf>,
    /// Append a `Status` column with each control's final result
    pub with_status: bool,
}

/// Run the inspec2csv command
#[allow(clippy::needless_pass_by_value)]
pub fn run_inspec2csv(options: CsvExportOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    let parser = InspecParser::new().with_duplicate_policy(config.duplicate_policy());
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet,
    };
    let profile = read_profile(&options.input, &parser, read)?;

    let mut mapping = export_mapping(options.export_mapping.as_deref(), config)?;
    if options.with_status {
        mapping = mapping.with_status();
    }

    let rows = CsvWriter::new(mapping).rows(&profile);
    let content = render_csv_string(&rows).context("Failed to write CSV")?;
    write_output(&content, &OutputTarget::from_option(options.output), quiet)
}

fn export_mapping(explicit: Option<&Path>, config: &AppConfig) -> Result<CsvExportMapping> {
    let path = explicit.or(config.csv.export_mapping.as_deref());
    let mut mapping = match path {
        Some(path) => CsvExportMapping::from_file(path)
            .with_context(|| format!("Failed to load CSV export mapping {}", path.display()))?,
        None => CsvExportMapping::default(),
    };
    // A delimiter in the mapping file beats the config default.
    if mapping.delimiter == MULTI_VALUE_DELIMITER {
        mapping.delimiter.clone_from(&config.csv.delimiter);
    }
    Ok(mapping)
}
