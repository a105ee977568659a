//! XCCDF command handlers.
//!
//! Implements `xccdf2inspec` and `inspec2xccdf`.

use crate::config::AppConfig;
use crate::mapping::{flatten_yaml, TagMapper};
use crate::model::inject_profile_metadata;
use crate::parsers::{InspecParser, XccdfParser};
use crate::pipeline::{
    load_profile_metadata, read_profile, write_attributes, write_output, write_profile,
    OutputTarget, ProfileOutput, ReadOptions,
};
use crate::reports::{ProfileFormat, XccdfWriter};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Options for `xccdf2inspec`
#[derive(Debug, Clone)]
pub struct XccdfImportOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Overrides `output.format` from the config file
    pub format: Option<ProfileFormat>,
    /// Write everything into one control file
    pub single_file: bool,
    /// `old=new` tag renames
    pub replace_tags: Vec<String>,
    /// YAML/JSON file of tag renames
    pub replace_tags_file: Option<PathBuf>,
    /// Where to write the benchmark attributes
    pub attributes: Option<PathBuf>,
    /// Profile metadata (maintainer, license...) to inject
    pub metadata: Option<PathBuf>,
}

/// Tag renames from config, then file, then command line; later wins.
pub(crate) fn build_tag_mapper(
    config: &AppConfig,
    file: Option<&Path>,
    pairs: &[String],
) -> Result<TagMapper> {
    let mut mapper = TagMapper::from_pairs(config.xccdf.replace_tags.clone());
    if let Some(path) = file {
        let from_file = TagMapper::from_file(path)
            .with_context(|| format!("Failed to load tag renames {}", path.display()))?;
        mapper = mapper.extended_with(&from_file);
    }
    if !pairs.is_empty() {
        let from_cli = TagMapper::parse_pairs(pairs).context("Invalid --replace-tags value")?;
        mapper = mapper.extended_with(&from_cli);
    }
    if !mapper.is_identity() {
        tracing::debug!("Renaming {} tag(s) on import", mapper.len());
    }
    Ok(mapper)
}

/// Run the xccdf2inspec command
#[allow(clippy::needless_pass_by_value)]
pub fn run_xccdf2inspec(options: XccdfImportOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    let mapper = build_tag_mapper(
        config,
        options.replace_tags_file.as_deref(),
        &options.replace_tags,
    )?;

    let parser = XccdfParser::new()
        .with_tag_mapper(mapper)
        .with_duplicate_policy(config.duplicate_policy());
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

    if let Some(path) = options.attributes.or_else(|| config.xccdf.attributes.clone()) {
        write_attributes(&profile, &path, quiet)?;
    }
    Ok(())
}

/// Options for `inspec2xccdf`
#[derive(Debug, Clone)]
pub struct XccdfExportOptions {
    pub input: PathBuf,
    /// Benchmark attributes (flat or nested YAML)
    pub attributes: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Run the inspec2xccdf command
#[allow(clippy::needless_pass_by_value)]
pub fn run_inspec2xccdf(options: XccdfExportOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    let parser = InspecParser::new().with_duplicate_policy(config.duplicate_policy());
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet,
    };
    let profile = read_profile(&options.input, &parser, read)?;

    let attributes = match &options.attributes {
        Some(path) => load_attributes(path)?,
        None => IndexMap::new(),
    };
    let xml = XccdfWriter::new()
        .render_with(&profile, &attributes)
        .context("Failed to render XCCDF benchmark")?;

    write_output(&xml, &OutputTarget::from_option(options.output), quiet)
}

/// Read an attributes file into dotted keys with string values.
pub(crate) fn load_attributes(path: &Path) -> Result<IndexMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read attributes {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    let root: serde_yaml_ng::Value = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse attributes {}", path.display()))?;

    let mut attributes = IndexMap::new();
    for (key, value) in flatten_yaml(&root) {
        let text = match value {
            serde_yaml_ng::Value::String(s) => s,
            serde_yaml_ng::Value::Number(n) => n.to_string(),
            serde_yaml_ng::Value::Bool(b) => b.to_string(),
            serde_yaml_ng::Value::Null => String::new(),
            _ => {
                tracing::warn!("Ignoring non-scalar attribute '{}'", key);
                continue;
            }
        };
        attributes.insert(key, text);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tag_mapper_precedence() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tags.yml");
        std::fs::write(&file, "rid: rule_from_file\ngid: group_id\n").unwrap();

        let config = AppConfig::builder()
            .replace_tag("rid", "rule_from_config")
            .replace_tag("stig_id", "vuln_id")
            .build();
        let mapper =
            build_tag_mapper(&config, Some(&file), &["rid=rule_from_cli".to_string()]).unwrap();

        assert_eq!(mapper.resolve("rid"), "rule_from_cli");
        assert_eq!(mapper.resolve("gid"), "group_id");
        assert_eq!(mapper.resolve("stig_id"), "vuln_id");
        assert_eq!(mapper.resolve("cci"), "cci");
    }

    #[test]
    fn test_load_nested_attributes() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("attributes.yml");
        std::fs::write(
            &file,
            "benchmark:\n  title: RHEL 8\n  version: 2\nreference.href: https://cyber.mil\n",
        )
        .unwrap();
        let attributes = load_attributes(&file).unwrap();
        assert_eq!(attributes["benchmark.title"], "RHEL 8");
        assert_eq!(attributes["benchmark.version"], "2");
        assert_eq!(attributes["reference.href"], "https://cyber.mil");
    }

    #[test]
    fn test_load_empty_attributes() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("attributes.yml");
        std::fs::write(&file, "").unwrap();
        assert!(load_attributes(&file).unwrap().is_empty());
    }
}
