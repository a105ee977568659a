//! Template generators.
//!
//! Implements `generate-map`, `generate-ckl-metadata` and
//! `generate-inspec-metadata`. All three are non-interactive: values come
//! from flags, and keys left unset are written empty so the file doubles as
//! a fill-in template.

use crate::mapping::CsvMapping;
use crate::model::{HOST_METADATA_KEYS, PROFILE_METADATA_KEYS};
use crate::pipeline::{write_output, OutputTarget};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Run the generate-map command
pub fn run_generate_map(output: Option<PathBuf>, quiet: bool) -> Result<()> {
    write_output(&CsvMapping::template_yaml(), &OutputTarget::from_option(output), quiet)
}

/// Run the generate-ckl-metadata command.
///
/// `values` are `(key, value)` pairs; keys must be host metadata keys.
pub fn run_generate_ckl_metadata(
    values: &[(&str, Option<String>)],
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let content = metadata_template(&HOST_METADATA_KEYS, values)?;
    write_output(&content, &OutputTarget::from_option(output), quiet)
}

/// Run the generate-inspec-metadata command
pub fn run_generate_inspec_metadata(
    values: &[(&str, Option<String>)],
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let content = metadata_template(&PROFILE_METADATA_KEYS, values)?;
    write_output(&content, &OutputTarget::from_option(output), quiet)
}

/// Pretty JSON object with every key of `keys`, in order.
fn metadata_template(keys: &[&str], values: &[(&str, Option<String>)]) -> Result<String> {
    let mut record: IndexMap<&str, String> =
        keys.iter().map(|key| (*key, String::new())).collect();
    for (key, value) in values {
        let Some(slot) = record.get_mut(key) else {
            anyhow::bail!("Unknown metadata key '{key}'");
        };
        if let Some(value) = value {
            slot.clone_from(value);
        }
    }
    serde_json::to_string_pretty(&record).context("Failed to serialize metadata")
}
