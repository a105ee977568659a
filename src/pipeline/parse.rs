//! Reading inputs: profiles through any parser, plus metadata files.

use crate::model::{HostMetadata, MetadataRecord, Profile, ProfileMetadataRecord};
use crate::parsers::ProfileParser;
use anyhow::{Context, Result};
use std::path::Path;

/// How loudly to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Log every diagnostic instead of a one-line count
    pub verbose: bool,
    /// Skip milestone logging
    pub quiet: bool,
}

/// Parse `path` with `parser`, logging diagnostics, and return the profile.
///
/// Record-level problems degrade the conversion but never fail it; they are
/// reported through `tracing` and the profile is returned as converted.
pub fn read_profile(path: &Path, parser: &dyn ProfileParser, options: ReadOptions) -> Result<Profile> {
    if !options.quiet {
        tracing::info!("Reading {} input: {}", parser.format_name(), path.display());
    }

    let outcome = parser
        .parse(path)
        .with_context(|| format!("Failed to convert {}", path.display()))?;
    outcome.log_diagnostics(options.verbose);

    if !options.quiet {
        tracing::info!("Converted {} controls", outcome.profile.len());
    }
    Ok(outcome.into_profile())
}

/// Host metadata for a checklist header, empty when no file is given.
pub fn load_host_metadata(path: Option<&Path>) -> Result<HostMetadata> {
    let Some(path) = path else {
        return Ok(HostMetadata::default());
    };
    let record = MetadataRecord::from_file(path)
        .with_context(|| format!("Failed to load metadata {}", path.display()))?;
    warn_unknown(&record, &crate::model::HOST_METADATA_KEYS, path);
    Ok(HostMetadata::from_record(&record))
}

/// Maintainer and licensing fields for `inspec.yml`, if a file is given.
pub fn load_profile_metadata(path: Option<&Path>) -> Result<Option<ProfileMetadataRecord>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let record = MetadataRecord::from_file(path)
        .with_context(|| format!("Failed to load metadata {}", path.display()))?;
    warn_unknown(&record, &crate::model::PROFILE_METADATA_KEYS, path);
    Ok(Some(ProfileMetadataRecord::from_record(&record)))
}

fn warn_unknown(record: &MetadataRecord, known: &[&str], path: &Path) {
    let unknown = record.unknown_keys(known);
    if !unknown.is_empty() {
        tracing::warn!(
            "Ignoring unknown metadata keys in {}: {}",
            path.display(),
            unknown.join(", ")
        );
    }
}
