//! Configuration types for compliance-tools conversions.

use super::defaults::{DEFAULT_CKL_CLASSIFICATION, DEFAULT_DESC_WIDTH};
use crate::mapping::MULTI_VALUE_DELIMITER;
use crate::model::DuplicatePolicy;
use crate::reports::ProfileFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// CLI flags override file settings; see [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// How converted profiles are written
    pub output: OutputConfig,
    /// CSV import/export settings
    pub csv: CsvConfig,
    /// XCCDF import settings
    pub xccdf: XccdfConfig,
    /// Checklist generation settings
    pub ckl: CklConfig,
    /// Behavior flags
    pub behavior: BehaviorConfig,
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Duplicate-control handling implied by `behavior.merge_duplicates`.
    #[must_use]
    pub const fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.behavior.merge_duplicates {
            DuplicatePolicy::Merge
        } else {
            DuplicatePolicy::Reject
        }
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the profile output format.
    pub const fn profile_format(mut self, format: ProfileFormat) -> Self {
        self.config.output.format = format;
        self
    }

    /// Write one control file per control.
    pub const fn separate_files(mut self, separate: bool) -> Self {
        self.config.output.separate_files = separate;
        self
    }

    /// Set the default CSV import mapping file.
    pub fn csv_mapping(mut self, path: Option<PathBuf>) -> Self {
        self.config.csv.mapping = path;
        self
    }

    /// Set the multi-value delimiter for CSV export.
    pub fn csv_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.config.csv.delimiter = delimiter.into();
        self
    }

    /// Add an XCCDF tag rename.
    pub fn replace_tag(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.config.xccdf.replace_tags.insert(from.into(), to.into());
        self
    }

    /// Set the default checklist metadata file.
    pub fn ckl_metadata(mut self, path: Option<PathBuf>) -> Self {
        self.config.ckl.metadata = path;
        self
    }

    /// Fold repeated control ids instead of failing.
    pub const fn merge_duplicates(mut self, merge: bool) -> Self {
        self.config.behavior.merge_duplicates = merge;
        self
    }

    /// Enable quiet mode.
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.config.behavior.quiet = quiet;
        self
    }

    /// Build the `AppConfig`.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Output settings for converted profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// `ruby` (profile directory) or `json` (single hash)
    pub format: ProfileFormat,
    /// One `controls/<id>.rb` per control
    pub separate_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ProfileFormat::Ruby,
            separate_files: true,
        }
    }
}

/// CSV settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CsvConfig {
    /// Import mapping used when `--mapping` is not given
    pub mapping: Option<PathBuf>,
    /// Export column mapping used when `--export-mapping` is not given
    pub export_mapping: Option<PathBuf>,
    /// Joiner for multi-valued tags on export
    pub delimiter: String,
    /// Description wrap width on import (0 disables)
    pub width: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            mapping: None,
            export_mapping: None,
            delimiter: MULTI_VALUE_DELIMITER.to_string(),
            width: DEFAULT_DESC_WIDTH,
        }
    }
}

/// XCCDF import settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct XccdfConfig {
    /// Tag renames applied on import (`rid: rule_id`)
    pub replace_tags: BTreeMap<String, String>,
    /// Attributes file written next to converted profiles
    pub attributes: Option<PathBuf>,
}

/// Checklist generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CklConfig {
    /// Host metadata file used when `--metadata` is not given
    pub metadata: Option<PathBuf>,
    /// `STIG_INFO` classification marking
    pub classification: String,
}

impl Default for CklConfig {
    fn default() -> Self {
        Self {
            metadata: None,
            classification: DEFAULT_CKL_CLASSIFICATION.to_string(),
        }
    }
}

/// Behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Fold repeated control ids instead of failing
    pub merge_duplicates: bool,
    /// Print parse diagnostics
    pub verbose: bool,
    /// Suppress non-essential output
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.output.format, ProfileFormat::Ruby);
        assert!(config.output.separate_files);
        assert_eq!(config.csv.delimiter, ", ");
        assert_eq!(config.csv.width, 80);
        assert_eq!(config.ckl.classification, "UNCLASSIFIED");
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Reject);
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::builder()
            .profile_format(ProfileFormat::Json)
            .replace_tag("rid", "rule_id")
            .merge_duplicates(true)
            .build();
        assert_eq!(config.output.format, ProfileFormat::Json);
        assert_eq!(config.xccdf.replace_tags["rid"], "rule_id");
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Merge);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: AppConfig =
            serde_yaml_ng::from_str("csv:\n  delimiter: \"|\"\nunknown_section: 1\n").unwrap();
        assert_eq!(config.csv.delimiter, "|");
        assert_eq!(config.csv.width, 80);
        assert!(config.output.separate_files);
    }
}
