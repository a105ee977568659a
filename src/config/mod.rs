//! Configuration module for compliance-tools.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use compliance_tools::config::AppConfig;
//!
//! // Use defaults
//! let config = AppConfig::default();
//!
//! // Use builder
//! let config = AppConfig::builder()
//!     .replace_tag("rid", "rule_id")
//!     .merge_duplicates(true)
//!     .build();
//!
//! // Load from file
//! use compliance_tools::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None);
//! ```
//!
//! # Configuration File
//!
//! Place a `.compliance-tools.yaml` file in your project root or
//! `~/.config/compliance-tools/`:
//!
//! ```yaml
//! output:
//!   format: ruby
//!   separate_files: true
//! xccdf:
//!   replace_tags:
//!     rid: rule_id
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    CONFIG_DIR_NAME, DEFAULT_CKL_CLASSIFICATION, DEFAULT_DESC_WIDTH, DEFAULT_PROFILE_NAME,
};
pub use types::{
    AppConfig, AppConfigBuilder, BehaviorConfig, CklConfig, CsvConfig, OutputConfig, XccdfConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, generate_full_example_config, load_config_file,
    load_or_default, ConfigFileError,
};

/// Generate a JSON Schema for the `.compliance-tools.yaml` format.
pub fn generate_json_schema() -> crate::error::Result<String> {
    let schema = schemars::schema_for!(AppConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
