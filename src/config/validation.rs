//! Configuration validation for compliance-tools.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{AppConfig, BehaviorConfig, CklConfig, CsvConfig, XccdfConfig};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.csv.validate());
        errors.extend(self.xccdf.validate());
        errors.extend(self.ckl.validate());
        errors.extend(self.behavior.validate());
        errors
    }
}

fn check_file(field: &str, path: Option<&std::path::Path>, errors: &mut Vec<ConfigError>) {
    if let Some(path) = path {
        if !path.is_file() {
            errors.push(ConfigError::new(
                field,
                format!("File does not exist: {}", path.display()),
            ));
        }
    }
}

impl Validatable for CsvConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.delimiter.is_empty() {
            errors.push(ConfigError::new("csv.delimiter", "Delimiter must not be empty"));
        }
        check_file("csv.mapping", self.mapping.as_deref(), &mut errors);
        check_file("csv.export_mapping", self.export_mapping.as_deref(), &mut errors);
        errors
    }
}

impl Validatable for XccdfConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (from, to) in &self.replace_tags {
            if from.trim().is_empty() || to.trim().is_empty() {
                errors.push(ConfigError::new(
                    "xccdf.replace_tags",
                    format!("Tag rename '{from}' -> '{to}' has an empty side"),
                ));
            }
        }
        errors
    }
}

impl Validatable for CklConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_file("ckl.metadata", self.metadata.as_deref(), &mut errors);
        if self.classification.trim().is_empty() {
            errors.push(ConfigError::new(
                "ckl.classification",
                "Classification must not be empty",
            ));
        }
        errors
    }
}

impl Validatable for BehaviorConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.verbose && self.quiet {
            errors.push(ConfigError::new(
                "behavior",
                "Contradictory flags: both 'verbose' and 'quiet' are true. 'quiet' takes precedence.",
            ));
        }
        errors
    }
}
