//! Unified error types for compliance-tools.
//!
//! Fatal problems (a document that is not what it claims to be, a mapping that
//! references columns no row has, a template placeholder nobody can fill) are
//! reported through [`ConvertError`]. Per-record data quality problems are not
//! errors; parsers collect them as [`crate::parsers::Diagnostic`]s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for compliance-tools operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConvertError {
    /// Errors while reading an input document
    #[error("Failed to parse document: {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// Errors in a caller-supplied mapping (CSV columns, tag tables)
    #[error("Invalid mapping: {context}")]
    Mapping {
        context: String,
        #[source]
        source: MappingErrorKind,
    },

    /// Errors while producing an output document
    #[error("Output generation failed: {context}")]
    Report {
        context: String,
        #[source]
        source: ReportErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific parse error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The input cannot be read as the format it claims to be.
    #[error("Malformed {format} document at {location}: {message}")]
    MalformedDocument {
        format: String,
        location: String,
        message: String,
    },

    #[error("Missing required field '{field}' at {location}")]
    MissingRequiredField { field: String, location: String },

    #[error("Duplicate control id '{id}'")]
    DuplicateControl { id: String },

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Invalid YAML structure: {0}")]
    InvalidYaml(String),

    #[error("Invalid CSV structure: {0}")]
    InvalidCsv(String),
}

/// Specific mapping error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MappingErrorKind {
    /// A configured column index is out of bounds for every data row.
    #[error("column {column} for '{field}' is out of bounds for every row (widest row has {max_width} columns)")]
    ColumnOutOfBounds {
        field: String,
        column: usize,
        max_width: usize,
    },

    #[error("value for '{key}' is not a column index: {value}")]
    NotAColumn { key: String, value: String },

    #[error("mapping has no '{0}' entry")]
    MissingKey(String),

    #[error("cannot read tag replacement '{0}' (expected old=new)")]
    BadReplacement(String),
}

/// Specific report error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReportErrorKind {
    /// A `%name%` placeholder had no value and no declared default.
    #[error("Unresolved template placeholder '%{placeholder}%'")]
    UnresolvedTemplate { placeholder: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Output format not supported for this operation: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for compliance-tools operations
pub type Result<T> = std::result::Result<T, ConvertError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl ConvertError {
    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create a malformed-document error
    pub fn malformed(
        format: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let format = format.into();
        Self::parse(
            format!("reading {format}"),
            ParseErrorKind::MalformedDocument {
                format,
                location: location.into(),
                message: message.into(),
            },
        )
    }

    /// Create a parse error for a missing required field
    pub fn missing_field(field: impl Into<String>, location: impl Into<String>) -> Self {
        Self::parse(
            "missing required field",
            ParseErrorKind::MissingRequiredField {
                field: field.into(),
                location: location.into(),
            },
        )
    }

    /// Create a duplicate control error
    pub fn duplicate_control(id: impl Into<String>) -> Self {
        Self::parse(
            "adding control to profile",
            ParseErrorKind::DuplicateControl { id: id.into() },
        )
    }

    /// Create a mapping error with context
    pub fn mapping(context: impl Into<String>, source: MappingErrorKind) -> Self {
        Self::Mapping {
            context: context.into(),
            source,
        }
    }

    /// Create a report error with context
    pub fn report(context: impl Into<String>, source: ReportErrorKind) -> Self {
        Self::Report {
            context: context.into(),
            source,
        }
    }

    /// Create an unresolved template error
    pub fn unresolved_template(placeholder: impl Into<String>) -> Self {
        Self::report(
            "substituting benchmark attributes",
            ReportErrorKind::UnresolvedTemplate {
                placeholder: placeholder.into(),
            },
        )
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error, for a configuration file that cannot be used
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for the malformed-document kind.
    #[must_use]
    pub const fn is_malformed_document(&self) -> bool {
        matches!(
            self,
            Self::Parse {
                source: ParseErrorKind::MalformedDocument { .. },
                ..
            }
        )
    }

    /// True for any mapping error.
    #[must_use]
    pub const fn is_invalid_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    /// True for the unresolved-template kind.
    #[must_use]
    pub const fn is_unresolved_template(&self) -> bool {
        matches!(
            self,
            Self::Report {
                source: ReportErrorKind::UnresolvedTemplate { .. },
                ..
            }
        )
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(
            "JSON deserialization",
            ParseErrorKind::InvalidJson(err.to_string()),
        )
    }
}

impl From<serde_yaml_ng::Error> for ConvertError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::parse(
            "YAML deserialization",
            ParseErrorKind::InvalidYaml(err.to_string()),
        )
    }
}

impl From<csv::Error> for ConvertError {
    fn from(err: csv::Error) -> Self {
        Self::parse("CSV reading", ParseErrorKind::InvalidCsv(err.to_string()))
    }
}

/// Adds "where it happened" to fallible conversion steps.
///
/// Contexts chain outermost first, so an error raised deep in a translator
/// reads like `reading rules.csv: row 4: ...`.
pub trait ErrorContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`context`](Self::context), built only on the error path.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<ConvertError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context)
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| e.into().within(&f().into()))
    }
}

impl ConvertError {
    /// Prefix `outer` onto this error's context chain.
    #[must_use]
    pub fn within(mut self, outer: &str) -> Self {
        let chain = match &mut self {
            Self::Parse { context, .. }
            | Self::Mapping { context, .. }
            | Self::Report { context, .. } => context,
            Self::Io { message, .. } | Self::Config(message) | Self::Validation(message) => message,
        };
        *chain = if chain.is_empty() {
            outer.to_string()
        } else {
            format!("{outer}: {chain}")
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::malformed("XCCDF", "root element", "expected Benchmark, found html");
        let display = err.to_string();
        assert!(display.contains("XCCDF"), "{display}");

        let err = ConvertError::unresolved_template("benchmark.title");
        assert!(err.is_unresolved_template());
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Unresolved template placeholder '%benchmark.title%'")
        );
    }

    #[test]
    fn test_error_kind_predicates() {
        assert!(ConvertError::malformed("CSV", "row 1", "bad").is_malformed_document());
        assert!(!ConvertError::missing_field("id", "Rule[0]").is_malformed_document());
        let mapping = ConvertError::mapping(
            "control.title",
            MappingErrorKind::ColumnOutOfBounds {
                field: "control.title".to_string(),
                column: 9,
                max_width: 3,
            },
        );
        assert!(mapping.is_invalid_mapping());
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConvertError::io("/path/to/benchmark.xml", io_err);
        assert!(err.to_string().contains("/path/to/benchmark.xml"));
    }

    #[test]
    fn test_context_chains_outermost_first() {
        fn row() -> Result<()> {
            Err(ConvertError::duplicate_control("V-230221"))
        }

        fn file() -> Result<()> {
            row().context("row 4")
        }

        match file().context("reading stig.csv") {
            Err(ConvertError::Parse { context, source }) => {
                assert_eq!(context, "reading stig.csv: row 4: adding control to profile");
                assert!(matches!(source, ParseErrorKind::DuplicateControl { .. }));
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_context_only_on_error() {
        let mut built = 0;
        let ok: Result<i32> = Ok(42);
        let _ = ok.with_context(|| {
            built += 1;
            "unused"
        });
        let failed: Result<i32> = Err(ConvertError::validation("empty threshold"));
        let err = failed
            .with_context(|| {
                built += 1;
                "loading threshold"
            })
            .unwrap_err();
        assert_eq!(built, 1);
        assert_eq!(err.to_string(), "Validation failed: loading threshold: empty threshold");
    }

    #[test]
    fn test_within_on_empty_context() {
        let err = ConvertError::Config(String::new()).within("ckl.metadata");
        assert_eq!(err.to_string(), "Invalid configuration: ckl.metadata");
    }
}
