//! Parser trait, format detection scores and per-record diagnostics.

use crate::error::{ConvertError, Result};
use crate::model::Profile;
use std::fmt;
use std::path::Path;

/// Confidence level for format detection
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FormatConfidence(f32);

impl FormatConfidence {
    /// Definitely not this format
    pub const NONE: Self = Self(0.0);
    /// Might be this format
    pub const LOW: Self = Self(0.25);
    /// Likely this format
    pub const MEDIUM: Self = Self(0.5);
    /// Almost certainly this format
    pub const HIGH: Self = Self(0.75);
    /// Definitely this format
    pub const CERTAIN: Self = Self(1.0);

    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Check if this confidence indicates the format can be parsed
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.0 >= 0.25
    }
}

impl Default for FormatConfidence {
    fn default() -> Self {
        Self::NONE
    }
}

/// Detection result from a parser
#[derive(Debug, Clone, Default)]
pub struct FormatDetection {
    pub confidence: FormatConfidence,
    /// Detected variant (e.g. "profile", "results")
    pub variant: Option<String>,
    pub version: Option<String>,
    pub warnings: Vec<String>,
}

impl FormatDetection {
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_confidence(confidence: FormatConfidence) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }
}

/// Kind of per-record problem found during a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A record lacked its identifier.
    MissingRequiredField,
    /// A descriptive field was absent and defaulted to empty.
    MissingField,
    /// A value could not be interpreted and a default was used.
    UnknownValue,
    /// A row had fewer cells than the mapping asks for.
    ShortRow,
    /// Informational trace, emitted in verbose mode.
    Note,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingRequiredField => "missing required field",
            Self::MissingField => "missing field",
            Self::UnknownValue => "unknown value",
            Self::ShortRow => "short row",
            Self::Note => "note",
        }
    }
}

/// A per-record issue that did not stop the conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Control id when known, otherwise a positional reference like `Rule[3]` or `row 7`
    pub location: String,
    pub field: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            field: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn missing_required(location: impl Into<String>, field: &str) -> Self {
        Self::new(
            DiagnosticKind::MissingRequiredField,
            location,
            format!("required field '{field}' is missing"),
        )
        .for_field(field)
    }

    pub fn missing(location: impl Into<String>, field: &str) -> Self {
        Self::new(
            DiagnosticKind::MissingField,
            location,
            format!("'{field}' is missing, defaulted to empty"),
        )
        .for_field(field)
    }

    #[must_use]
    pub const fn is_missing_required(&self) -> bool {
        matches!(self.kind, DiagnosticKind::MissingRequiredField)
    }

    /// True for anything that lost or defaulted data.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::Note)
    }

    /// Turn a required-field diagnostic into the equivalent error.
    #[must_use]
    pub fn to_error(&self) -> ConvertError {
        ConvertError::missing_field(
            self.field.clone().unwrap_or_default(),
            self.location.clone(),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.label(), self.location, self.message)
    }
}

/// A freshly built profile plus everything that was degraded on the way.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub profile: Profile,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Diagnostics for one location (usually a control id).
    pub fn diagnostics_for<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.location == location)
    }

    /// Records that lacked their identifier, as errors.
    #[must_use]
    pub fn missing_required_errors(&self) -> Vec<ConvertError> {
        self.diagnostics
            .iter()
            .filter(|d| d.is_missing_required())
            .map(Diagnostic::to_error)
            .collect()
    }

    /// Log a one-line summary plus every missing-required error, and the
    /// remaining diagnostics when `verbose`.
    pub fn log_diagnostics(&self, verbose: bool) {
        let warnings = self.warnings().count();
        if warnings > 0 {
            tracing::warn!(
                "{} record-level issue(s) while converting {} controls",
                warnings,
                self.profile.len()
            );
        }
        for error in self.missing_required_errors() {
            match std::error::Error::source(&error) {
                Some(cause) => tracing::warn!("{}: {}", error, cause),
                None => tracing::warn!("{}", error),
            }
        }
        if verbose {
            for diagnostic in self.diagnostics.iter().filter(|d| !d.is_missing_required()) {
                tracing::info!("{}", diagnostic);
            }
        }
    }

    #[must_use]
    pub fn into_profile(self) -> Profile {
        self.profile
    }
}

/// Trait for format-specific profile parsers
///
/// Implementors provide detection via `detect()` and parsing via `parse_str()`.
pub trait ProfileParser {
    /// Parse from a file path
    fn parse(&self, path: &Path) -> Result<ParseOutcome> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        self.parse_str(&content)
    }

    /// Parse from string content
    fn parse_str(&self, content: &str) -> Result<ParseOutcome>;

    /// Get format name
    fn format_name(&self) -> &str;

    /// Lightweight structural sniffing without a full parse.
    fn detect(&self, content: &str) -> FormatDetection;

    fn can_parse(&self, content: &str) -> bool {
        self.detect(content).confidence.can_parse()
    }

    fn confidence(&self, content: &str) -> FormatConfidence {
        self.detect(content).confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(FormatConfidence::new(3.0).value(), 1.0);
        assert!(!FormatConfidence::new(0.1).can_parse());
        assert!(FormatConfidence::LOW.can_parse());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::missing("V-001", "check");
        assert_eq!(
            d.to_string(),
            "[missing field] V-001: 'check' is missing, defaulted to empty"
        );
        assert!(d.is_warning());
        assert!(!d.is_missing_required());
    }

    #[test]
    fn test_outcome_filters() {
        let mut outcome = ParseOutcome::default();
        outcome.push(Diagnostic::missing_required("Rule[0]", "id"));
        outcome.push(Diagnostic::new(DiagnosticKind::Note, "row 1", "parsed"));
        assert_eq!(outcome.warnings().count(), 1);
        assert_eq!(outcome.diagnostics_for("Rule[0]").count(), 1);
    }

    #[test]
    fn test_missing_required_become_errors() {
        let mut outcome = ParseOutcome::default();
        outcome.push(Diagnostic::missing_required("Rule[0]", "id"));
        outcome.push(Diagnostic::missing("V-2", "check"));
        outcome.push(Diagnostic::missing_required("Rule[4]", "id"));

        let errors = outcome.missing_required_errors();
        assert_eq!(errors.len(), 2);
        let cause = std::error::Error::source(&errors[1]).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("Missing required field 'id' at Rule[4]"));
    }
}
