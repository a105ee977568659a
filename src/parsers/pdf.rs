//! CIS benchmark text reader.
//!
//! Turning a PDF into text is somebody else's job: a [`TextExtractor`]
//! hands over plain lines and this module only recognizes the benchmark
//! layout in them. A control starts at a numbered heading such as
//! `1.1.1 Ensure mounting of cramfs filesystems is disabled (Scored)` and
//! its body is split by section labels (`Description:`, `Audit:`...).

use super::traits::{Diagnostic, FormatConfidence, FormatDetection, ParseOutcome, ProfileParser};
use crate::error::{ConvertError, ErrorContext, Result};
use crate::model::{Control, DuplicatePolicy, Profile, Severity, TagValue};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

const FORMAT: &str = "CIS text";

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)+)\s+(.+?)\s*\((Scored|Not Scored|Automated|Manual)\)\s*$")
        .expect("static regex")
});

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)+\s+\S").expect("static regex"));

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Page\s+\d+(?:\s+of\s+\d+)?|\d+\s*\|\s*P\s?a\s?g\s?e)$").expect("static regex")
});

static LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Level\s+(\d)").expect("static regex"));

/// Source of raw text lines for a benchmark document.
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>>;
}

/// Reads text that was already extracted (e.g. by `pdftotext -layout`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

/// Body sections of a CIS recommendation, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Applicability,
    Description,
    Rationale,
    Audit,
    Remediation,
    Impact,
    DefaultValue,
    References,
    CisControls,
}

impl Section {
    const LABELS: [(&'static str, Self); 9] = [
        ("Profile Applicability", Self::Applicability),
        ("Description", Self::Description),
        ("Rationale", Self::Rationale),
        ("Audit", Self::Audit),
        ("Remediation", Self::Remediation),
        ("Impact", Self::Impact),
        ("Default Value", Self::DefaultValue),
        ("References", Self::References),
        ("CIS Controls", Self::CisControls),
    ];

    /// Label at the start of `line`, and whatever follows its colon.
    fn match_label(line: &str) -> Option<(Self, &str)> {
        Self::LABELS.iter().find_map(|(label, section)| {
            line.strip_prefix(label)
                .and_then(|rest| rest.trim_start().strip_prefix(':'))
                .map(|rest| (*section, rest.trim()))
        })
    }

    const fn tag_name(self) -> &'static str {
        match self {
            Self::Applicability => "applicability",
            Self::Description => "description",
            Self::Rationale => "rationale",
            Self::Audit => "check",
            Self::Remediation => "fix",
            Self::Impact => "impact_statement",
            Self::DefaultValue => "default_value",
            Self::References => "references",
            Self::CisControls => "cis_controls",
        }
    }
}

#[derive(Debug)]
struct Recommendation {
    number: String,
    title: String,
    scored: bool,
    sections: Vec<(Section, Vec<String>)>,
}

impl Recommendation {
    fn text(&self, wanted: Section) -> Option<String> {
        self.sections
            .iter()
            .find(|(section, _)| *section == wanted)
            .map(|(_, lines)| lines.join("\n").trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

/// Parser for text extracted from CIS benchmark PDFs
#[derive(Debug, Clone)]
pub struct PdfParser {
    duplicate_policy: DuplicatePolicy,
    name: String,
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfParser {
    /// Repeated headings are merged by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Merge,
            name: "cis-benchmark".to_string(),
        }
    }

    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Extract lines from `path` and parse them.
    pub fn parse_with(&self, extractor: &dyn TextExtractor, path: &Path) -> Result<ParseOutcome> {
        let rows = extractor.extract(path)?;
        self.parse_rows(&rows)
            .with_context(|| format!("reading {}", path.display()))
    }

    /// Build a profile from extracted lines.
    pub fn parse_rows<S: AsRef<str>>(&self, rows: &[S]) -> Result<ParseOutcome> {
        let lines: Vec<&str> = rows
            .iter()
            .map(|r| r.as_ref().trim_end())
            .filter(|l| !PAGE_MARKER.is_match(l.trim()))
            .collect();

        let mut recommendations: Vec<Recommendation> = Vec::new();
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index].trim();
            if let Some((heading, consumed)) = heading_at(&lines, index) {
                recommendations.push(heading);
                index += consumed;
                continue;
            }
            if let Some(current) = recommendations.last_mut() {
                if let Some((section, rest)) = Section::match_label(line) {
                    current.sections.push((section, Vec::new()));
                    if !rest.is_empty() {
                        push_line(current, rest);
                    }
                } else if !current.sections.is_empty() {
                    push_line(current, line);
                }
            }
            index += 1;
        }

        let mut outcome = ParseOutcome::new(Profile::new(&self.name));
        for recommendation in recommendations {
            let control = convert(recommendation, &mut outcome);
            outcome
                .profile
                .add_control_with(control, self.duplicate_policy)?;
        }
        tracing::debug!("CIS text: {} controls from {} lines", outcome.profile.len(), lines.len());
        Ok(outcome)
    }
}

impl ProfileParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<ParseOutcome> {
        self.parse_with(&PlainTextExtractor, path)
    }

    fn parse_str(&self, content: &str) -> Result<ParseOutcome> {
        let rows: Vec<&str> = content.lines().collect();
        self.parse_rows(&rows)
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let has_heading = content.lines().any(|l| HEADING.is_match(l.trim()));
        let has_labels = content.contains("Profile Applicability:") || content.contains("Audit:");
        match (has_heading, has_labels) {
            (true, true) => FormatDetection::with_confidence(FormatConfidence::HIGH).variant("cis"),
            (true, false) | (false, true) => {
                FormatDetection::with_confidence(FormatConfidence::LOW).variant("cis")
            }
            (false, false) => FormatDetection::no_match(),
        }
    }
}

fn push_line(current: &mut Recommendation, line: &str) {
    if let Some((_, lines)) = current.sections.last_mut() {
        lines.push(line.to_string());
    }
}

/// Heading at `index`, possibly wrapped onto the next line. Returns the
/// recommendation and how many lines it used.
fn heading_at(lines: &[&str], index: usize) -> Option<(Recommendation, usize)> {
    let line = lines[index].trim();
    if let Some(rec) = parse_heading(line) {
        return Some((rec, 1));
    }
    if !NUMBERED_LINE.is_match(line) {
        return None;
    }
    let next = lines.get(index + 1)?.trim();
    if NUMBERED_LINE.is_match(next) {
        return None;
    }
    parse_heading(&format!("{line} {next}")).map(|rec| (rec, 2))
}

fn parse_heading(line: &str) -> Option<Recommendation> {
    let caps = HEADING.captures(line)?;
    Some(Recommendation {
        number: caps.get(1)?.as_str().to_string(),
        title: caps.get(2)?.as_str().to_string(),
        scored: matches!(caps.get(3)?.as_str(), "Scored" | "Automated"),
        sections: Vec::new(),
    })
}

fn convert(rec: Recommendation, outcome: &mut ParseOutcome) -> Control {
    let id = rec.number.clone();
    let impact = if rec.scored {
        Severity::Medium.impact()
    } else {
        Severity::None.impact()
    };

    let mut control = Control::new(&id)
        .with_title(&rec.title)
        .with_impact(impact)
        .with_tag("cis_rid", rec.number.as_str())
        .with_tag("scored", rec.scored);

    for (section, field) in [
        (Section::Description, "desc"),
        (Section::Audit, "check"),
        (Section::Remediation, "fix"),
    ] {
        let text = rec.text(section).unwrap_or_else(|| {
            outcome.push(Diagnostic::missing(&id, field));
            String::new()
        });
        match section {
            Section::Description => control.desc = text,
            Section::Audit => control.check = text,
            _ => control.fix = text,
        }
    }

    for (_, section) in Section::LABELS {
        if matches!(
            section,
            Section::Description | Section::Audit | Section::Remediation
        ) {
            continue;
        }
        let Some(text) = rec.text(section) else {
            continue;
        };
        if section == Section::Applicability {
            let mut levels: Vec<String> = LEVEL
                .captures_iter(&text)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect();
            levels.dedup();
            if !levels.is_empty() {
                control.set_tag("cis_level", TagValue::List(levels));
            }
            let profiles: Vec<String> = text
                .lines()
                .map(|l| l.trim_start_matches(['•', '-', '*']).trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            control.set_tag(section.tag_name(), TagValue::List(profiles));
        } else {
            control.set_tag(section.tag_name(), text);
        }
    }
    control
}
