//! Content-based format detection across all profile parsers.

use super::traits::{FormatConfidence, FormatDetection, ParseOutcome, ProfileParser};
use super::{CsvParser, InspecParser, PdfParser, XccdfParser};
use crate::error::{ConvertError, ParseErrorKind, Result};

/// Minimum confidence threshold for accepting a format detection.
/// This is LOW confidence (0.25) - the parser believes it might be able to handle the content.
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Parser type identified during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Xccdf,
    Inspec,
    Csv,
    CisText,
}

impl ParserKind {
    pub const ALL: [Self; 4] = [Self::Xccdf, Self::Inspec, Self::Csv, Self::CisText];

    /// Get the human-readable name for this parser.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Xccdf => "XCCDF",
            Self::Inspec => "InSpec",
            Self::Csv => "CSV",
            Self::CisText => "CIS text",
        }
    }
}

/// Result of format detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// The parser that should handle this content, if detected.
    pub parser: Option<ParserKind>,
    pub confidence: FormatConfidence,
    /// Detected format variant (e.g. "benchmark", "results").
    pub variant: Option<String>,
    pub version: Option<String>,
    pub warnings: Vec<String>,
}

impl DetectionResult {
    /// Create a result indicating no format was detected.
    #[must_use]
    pub fn unknown(reason: &str) -> Self {
        Self {
            parser: None,
            confidence: FormatConfidence::NONE,
            variant: None,
            version: None,
            warnings: vec![reason.to_string()],
        }
    }

    fn detected(kind: ParserKind, detection: FormatDetection) -> Self {
        Self {
            parser: Some(kind),
            confidence: detection.confidence,
            variant: detection.variant,
            version: detection.version,
            warnings: detection.warnings,
        }
    }

    /// Check if the detection is confident enough to parse.
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.parser.is_some() && self.confidence.value() >= MIN_CONFIDENCE_THRESHOLD
    }
}

/// Picks the parser for a document nobody labelled.
///
/// Parsers are configured with their defaults; callers that need a tag
/// mapper or CSV mapping construct the parser directly instead.
#[derive(Debug, Clone)]
pub struct FormatDetector {
    xccdf: XccdfParser,
    inspec: InspecParser,
    csv: CsvParser,
    cis: PdfParser,
    min_confidence: f32,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            xccdf: XccdfParser::new(),
            inspec: InspecParser::new(),
            csv: CsvParser::default(),
            cis: PdfParser::new(),
            min_confidence: MIN_CONFIDENCE_THRESHOLD,
        }
    }

    /// Create a format detector with a custom confidence threshold.
    #[must_use]
    pub fn with_threshold(min_confidence: f32) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
            ..Self::new()
        }
    }

    fn parser(&self, kind: ParserKind) -> &dyn ProfileParser {
        match kind {
            ParserKind::Xccdf => &self.xccdf,
            ParserKind::Inspec => &self.inspec,
            ParserKind::Csv => &self.csv,
            ParserKind::CisText => &self.cis,
        }
    }

    /// Run every parser's detection and keep the most confident one.
    /// Ties go to the parser listed first in [`ParserKind::ALL`].
    #[must_use]
    pub fn detect_from_content(&self, content: &str) -> DetectionResult {
        let mut best: Option<(ParserKind, FormatDetection)> = None;
        for kind in ParserKind::ALL {
            let detection = self.parser(kind).detect(content);
            tracing::debug!(
                "Format detection: {}={:.2}",
                kind.name(),
                detection.confidence.value()
            );
            let better = best
                .as_ref()
                .map_or(true, |(_, b)| detection.confidence.value() > b.confidence.value());
            if better {
                best = Some((kind, detection));
            }
        }

        match best {
            Some((kind, detection)) if detection.confidence.value() >= self.min_confidence => {
                DetectionResult::detected(kind, detection)
            }
            _ => DetectionResult::unknown("Could not detect document format with sufficient confidence"),
        }
    }

    /// Detect the format, then parse with the matching parser.
    pub fn parse_str(&self, content: &str) -> Result<ParseOutcome> {
        let detection = self.detect_from_content(content);
        for warning in &detection.warnings {
            tracing::warn!("{}", warning);
        }

        match detection.parser {
            Some(kind) if detection.can_parse() => {
                tracing::info!("Detected {} document", kind.name());
                self.parser(kind).parse_str(content)
            }
            _ => Err(ConvertError::parse(
                "detecting document format",
                ParseErrorKind::MalformedDocument {
                    format: "unknown".to_string(),
                    location: "document".to_string(),
                    message: "expected XCCDF, InSpec JSON, CSV or CIS benchmark text".to_string(),
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_format() {
        let detector = FormatDetector::new();
        let xccdf = r#"<Benchmark xmlns="http://checklists.nist.gov/xccdf/1.2" id="b"/>"#;
        assert_eq!(detector.detect_from_content(xccdf).parser, Some(ParserKind::Xccdf));

        let inspec = r#"{"name": "p", "controls": [{"id": "a", "impact": 0.5}]}"#;
        assert_eq!(detector.detect_from_content(inspec).parser, Some(ParserKind::Inspec));

        let csv = "Vuln ID,Severity,CCI\nV-1,high,CCI-1\n";
        assert_eq!(detector.detect_from_content(csv).parser, Some(ParserKind::Csv));
    }

    #[test]
    fn test_unknown_content() {
        let detector = FormatDetector::new();
        let result = detector.detect_from_content("just words");
        assert!(!result.can_parse());
        assert!(detector.parse_str("just words").unwrap_err().is_malformed_document());
    }

    #[test]
    fn test_parse_through_detection() {
        let outcome = FormatDetector::new()
            .parse_str(r#"{"name": "p", "controls": [{"id": "a", "impact": 0.7}]}"#)
            .unwrap();
        assert_eq!(outcome.profile.len(), 1);
    }
}
