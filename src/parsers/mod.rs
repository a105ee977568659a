//! Readers that turn external documents into a [`Profile`].
//!
//! Every parser returns a [`ParseOutcome`]: the profile plus the per-record
//! diagnostics collected on the way. Structural failures (the document is not
//! what it claims to be, the mapping cannot work) are errors instead.
//!
//! ## Format Detection
//!
//! Each parser scores content with a confidence between 0.0 and 1.0 and
//! [`FormatDetector`] picks the most confident one:
//!
//! ```no_run
//! use compliance_tools::parsers::{detect_format, parse_profile};
//! use std::path::Path;
//!
//! let outcome = parse_profile(Path::new("results.json")).unwrap();
//! println!("{} controls", outcome.profile.len());
//!
//! let content = std::fs::read_to_string("benchmark.xml").unwrap();
//! if let Some(detected) = detect_format(&content) {
//!     println!("Detected: {} ({})", detected.format_name, detected.confidence);
//! }
//! ```

mod csv;
mod detection;
mod inspec;
mod pdf;
mod traits;
mod xccdf;

pub use self::csv::CsvParser;
pub use detection::{DetectionResult, FormatDetector, ParserKind, MIN_CONFIDENCE_THRESHOLD};
pub use inspec::InspecParser;
pub use pdf::{PdfParser, PlainTextExtractor, TextExtractor};
pub use traits::{
    Diagnostic, DiagnosticKind, FormatConfidence, FormatDetection, ParseOutcome, ProfileParser,
};
pub use xccdf::XccdfParser;

use crate::error::{ConvertError, Result};
use std::path::Path;

/// Result of format detection
#[derive(Debug, Clone)]
pub struct DetectedFormat {
    pub format_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub variant: Option<String>,
    pub version: Option<String>,
    pub warnings: Vec<String>,
}

/// Detect the document format from content without parsing
///
/// Returns None if no format could be detected with sufficient confidence.
#[must_use]
pub fn detect_format(content: &str) -> Option<DetectedFormat> {
    let result = FormatDetector::new().detect_from_content(content);

    if result.can_parse() {
        Some(DetectedFormat {
            format_name: result
                .parser
                .map(|p| p.name().to_string())
                .unwrap_or_default(),
            confidence: result.confidence.value(),
            variant: result.variant,
            version: result.version,
            warnings: result.warnings,
        })
    } else {
        None
    }
}

/// Maximum input size (256 MB); benchmark documents are far smaller.
const MAX_DOCUMENT_SIZE: u64 = 256 * 1024 * 1024;

/// Read a file of any supported format, detecting which one it is.
pub fn parse_profile(path: &Path) -> Result<ParseOutcome> {
    let metadata = std::fs::metadata(path).map_err(|e| ConvertError::io(path, e))?;
    if metadata.len() > MAX_DOCUMENT_SIZE {
        return Err(ConvertError::validation(format!(
            "{} is {} MB, exceeding the {} MB limit",
            path.display(),
            metadata.len() / (1024 * 1024),
            MAX_DOCUMENT_SIZE / (1024 * 1024),
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    parse_profile_str(&self::csv::decode_text(bytes))
}

/// Parse content of any supported format.
pub fn parse_profile_str(content: &str) -> Result<ParseOutcome> {
    FormatDetector::new().parse_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_xccdf() {
        let content = r#"<?xml version="1.0"?><Benchmark xmlns="http://checklists.nist.gov/xccdf/1.1" id="x"></Benchmark>"#;
        let detected = detect_format(content).expect("Should detect format");
        assert_eq!(detected.format_name, "XCCDF");
        assert_eq!(detected.version.as_deref(), Some("1.1"));
        assert!(detected.confidence >= 0.75);
    }

    #[test]
    fn test_detect_inspec_results() {
        let content = r#"{"platform": {"name": "x"}, "profiles": [{"name": "p", "controls": []}]}"#;
        let detected = detect_format(content).expect("Should detect format");
        assert_eq!(detected.format_name, "InSpec");
        assert_eq!(detected.variant.as_deref(), Some("results"));
    }

    #[test]
    fn test_detect_unknown_format() {
        assert!(detect_format(r#"{"some": "random", "json": "content"}"#).is_none());
    }

    #[test]
    fn test_confidence_based_selection() {
        let content = r#"{"name": "p", "controls": [{"id": "a", "impact": 0.5}]}"#;
        let inspec = InspecParser::new().confidence(content);
        let xccdf = XccdfParser::new().confidence(content);
        assert!(inspec.value() > xccdf.value());
    }

    #[test]
    fn test_parse_profile_missing_file() {
        let err = parse_profile(Path::new("/nonexistent/benchmark.xml")).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
