//! Benchmark text command handler.
//!
//! Implements `pdf2inspec`. Text extraction from the PDF itself happens
//! outside this tool; the input is the extracted text, one line per row.

use crate::config::AppConfig;
use crate::model::{inject_profile_metadata, DuplicatePolicy};
use crate::parsers::PdfParser;
use crate::pipeline::{
    load_profile_metadata, read_profile, write_profile, ProfileOutput, ReadOptions,
};
use crate::reports::ProfileFormat;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Options for `pdf2inspec`
#[derive(Debug, Clone)]
pub struct PdfImportOptions {
    /// Extracted benchmark text
    pub input: PathBuf,
    pub output: PathBuf,
    /// Profile name; defaults to the input file stem
    pub name: Option<String>,
    pub format: Option<ProfileFormat>,
    pub single_file: bool,
    pub metadata: Option<PathBuf>,
}

/// Run the pdf2inspec command
#[allow(clippy::needless_pass_by_value)]
pub fn run_pdf2inspec(options: PdfImportOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    if options
        .input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    {
        bail!(
            "{} is a binary PDF; extract its text first (e.g. `pdftotext -layout`) and pass the .txt file",
            options.input.display()
        );
    }

    let name = options.name.clone().unwrap_or_else(|| {
        options
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::config::DEFAULT_PROFILE_NAME.to_string())
    });

    // Headings repeat across page breaks, so folding is the default here.
    let parser = PdfParser::new()
        .with_name(name)
        .with_duplicate_policy(DuplicatePolicy::Merge);
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet,
    };
    let mut profile = read_profile(&options.input, &parser, read)?;
    if profile.is_empty() {
        tracing::warn!(
            "No numbered recommendations found in {}",
            options.input.display()
        );
    }

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
