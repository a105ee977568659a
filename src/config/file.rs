//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::defaults::CONFIG_DIR_NAME;
use super::types::AppConfig;
use crate::error::ConvertError;
use crate::reports::ProfileFormat;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".compliance-tools.yaml",
    ".compliance-tools.yml",
    "compliance-tools.yaml",
    "compliance-tools.yml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/compliance-tools/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_in_dir(&cwd))
    {
        return Some(path);
    }

    if let Some(path) = find_git_root().and_then(|root| find_config_in_dir(&root)) {
        return Some(path);
    }

    if let Some(path) =
        dirs::config_dir().and_then(|dir| find_config_in_dir(&dir.join(CONFIG_DIR_NAME)))
    {
        return Some(path);
    }

    dirs::home_dir().and_then(|home| find_config_in_dir(&home))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();

    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// File not found
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parsing error
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    // An empty file is a valid, all-defaults config.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                (config, Some(path))
            }
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence.
    ///
    /// Only values that differ from the defaults count as set.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.output.format != ProfileFormat::Ruby {
            self.output.format = other.output.format;
        }
        if !other.output.separate_files {
            self.output.separate_files = false;
        }

        if other.csv.mapping.is_some() {
            self.csv.mapping.clone_from(&other.csv.mapping);
        }
        if other.csv.export_mapping.is_some() {
            self.csv.export_mapping.clone_from(&other.csv.export_mapping);
        }
        if other.csv.delimiter != defaults.csv.delimiter {
            self.csv.delimiter.clone_from(&other.csv.delimiter);
        }
        if other.csv.width != defaults.csv.width {
            self.csv.width = other.csv.width;
        }

        for (from, to) in &other.xccdf.replace_tags {
            self.xccdf.replace_tags.insert(from.clone(), to.clone());
        }
        if other.xccdf.attributes.is_some() {
            self.xccdf.attributes.clone_from(&other.xccdf.attributes);
        }

        if other.ckl.metadata.is_some() {
            self.ckl.metadata.clone_from(&other.ckl.metadata);
        }
        if other.ckl.classification != defaults.ckl.classification {
            self.ckl.classification.clone_from(&other.ckl.classification);
        }

        if other.behavior.merge_duplicates {
            self.behavior.merge_duplicates = true;
        }
        if other.behavior.verbose {
            self.behavior.verbose = true;
        }
        if other.behavior.quiet {
            self.behavior.quiet = true;
        }
    }

    /// Load from file and merge with CLI overrides.
    ///
    /// A file named explicitly must exist and parse. A discovered file that
    /// fails to load is skipped with a warning.
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> crate::error::Result<(Self, Option<PathBuf>)> {
        let (mut config, loaded_from) = match config_path {
            Some(path) => {
                let config = load_config_file(path).map_err(|e| ConvertError::config(e.to_string()))?;
                (config, Some(path.to_path_buf()))
            }
            None => load_or_default(None),
        };
        config.merge(cli_overrides);
        Ok((config, loaded_from))
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# compliance-tools configuration
# Place this file at .compliance-tools.yaml in your project root or ~/.config/compliance-tools/

{}",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_full_example_config() -> String {
    r"# compliance-tools Configuration File
# ====================================
#
# Place it at:
#   - .compliance-tools.yaml in your project root
#   - ~/.config/compliance-tools/compliance-tools.yaml for global config
#
# CLI arguments always override file settings.

# Converted profile output
output:
  # ruby (inspec.yml + controls/*.rb) or json
  format: ruby
  # One control file per control
  separate_files: true

# CSV import/export
csv:
  # Import column mapping (see `compliance-tools generate-map`)
  # mapping: ./mapping.yml
  # Export column mapping
  # export_mapping: ./export.yml
  # Joiner for multi-valued tags such as cci and nist
  delimiter: ', '
  # Description wrap width, 0 disables
  width: 80

# XCCDF import
xccdf:
  # Tag renames applied to every rule
  replace_tags: {}
  #   rid: rule_id
  # Write benchmark attributes here
  # attributes: ./attributes.yml

# Checklist generation
ckl:
  # Host metadata (see `compliance-tools generate-ckl-metadata`)
  # metadata: ./metadata.json
  classification: UNCLASSIFIED

# Behavior flags
behavior:
  # Fold repeated control ids instead of failing
  merge_duplicates: false
  # Print parse diagnostics
  verbose: false
  # Suppress non-essential output
  quiet: false
"
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".compliance-tools.yaml");
        std::fs::write(&config_path, "output:\n  format: json\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");

        let yaml = r"
output:
  format: json
  separate_files: false
xccdf:
  replace_tags:
    rid: rule_id
behavior:
  merge_duplicates: true
";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.output.format, ProfileFormat::Json);
        assert!(!config.output.separate_files);
        assert_eq!(config.xccdf.replace_tags["rid"], "rule_id");
        assert!(config.behavior.merge_duplicates);
    }

    #[test]
    fn test_load_empty_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("empty.yaml");
        std::fs::write(&config_path, "\n").unwrap();
        assert_eq!(load_config_file(&config_path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_load_config_file_bad_yaml() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("bad.yaml");
        std::fs::write(&config_path, "output: [unclosed").unwrap();
        assert!(matches!(
            load_config_file(&config_path),
            Err(ConfigFileError::Parse(_))
        ));
    }

    #[test]
    fn test_explicit_config_must_load() {
        let tmp = TempDir::new().unwrap();
        let overrides = AppConfig::default();

        let missing = tmp.path().join("absent.yaml");
        let err = AppConfig::from_file_with_overrides(Some(&missing), &overrides).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)), "{err}");
        assert!(err.to_string().contains("absent.yaml"));

        let broken = tmp.path().join("broken.yaml");
        std::fs::write(&broken, "output: [unclosed").unwrap();
        let err = AppConfig::from_file_with_overrides(Some(&broken), &overrides).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)), "{err}");

        let good = tmp.path().join("good.yaml");
        std::fs::write(&good, "csv:\n  delimiter: '|'\n").unwrap();
        let quiet = AppConfig::builder().quiet(true).build();
        let (config, loaded_from) = AppConfig::from_file_with_overrides(Some(&good), &quiet).unwrap();
        assert_eq!(loaded_from.as_deref(), Some(good.as_path()));
        assert_eq!(config.csv.delimiter, "|");
        assert!(config.behavior.quiet);
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig::builder()
            .csv_delimiter("|")
            .replace_tag("gid", "group_id")
            .build();
        let overrides = AppConfig::builder()
            .profile_format(ProfileFormat::Json)
            .replace_tag("rid", "rule_id")
            .merge_duplicates(true)
            .build();

        base.merge(&overrides);

        assert_eq!(base.output.format, ProfileFormat::Json);
        assert_eq!(base.csv.delimiter, "|");
        assert_eq!(base.xccdf.replace_tags.len(), 2);
        assert!(base.behavior.merge_duplicates);
    }

    #[test]
    fn test_generated_examples_parse() {
        let example = generate_example_config();
        assert!(example.contains("output:"));
        let parsed: AppConfig = serde_yaml_ng::from_str(&example).unwrap();
        assert_eq!(parsed, AppConfig::default());

        let full: AppConfig = serde_yaml_ng::from_str(&generate_full_example_config()).unwrap();
        assert_eq!(full, AppConfig::default());
    }

    #[test]
    fn test_discover_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom-config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "output:\n  format: json").unwrap();

        let discovered = discover_config_file(Some(&config_path));
        assert_eq!(discovered, Some(config_path));
    }
}
