//! Mapping-driven CSV reader.
//!
//! Every data row becomes one control. Which column feeds which field is
//! decided entirely by a [`CsvMapping`]; the default mapping matches the
//! column layout of a DISA STIG Viewer export.

use super::traits::{
    Diagnostic, DiagnosticKind, FormatConfidence, FormatDetection, ParseOutcome, ProfileParser,
};
use crate::error::{ConvertError, ErrorContext, MappingErrorKind, Result};
use crate::mapping::{CsvMapping, TagMapper, MULTI_VALUE_TAGS};
use crate::model::{Control, DuplicatePolicy, Profile, Severity, TagValue};
use std::path::Path;
use unicode_width::UnicodeWidthStr;

const FORMAT: &str = "CSV";

/// Parser for tabular control exports
#[derive(Debug, Clone)]
pub struct CsvParser {
    mapping: CsvMapping,
    source_name: String,
    verbose: bool,
    tag_mapper: TagMapper,
    duplicate_policy: DuplicatePolicy,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(CsvMapping::default())
    }
}

impl CsvParser {
    #[must_use]
    pub fn new(mapping: CsvMapping) -> Self {
        Self {
            mapping,
            source_name: "csv".to_string(),
            verbose: false,
            tag_mapper: TagMapper::identity(),
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }

    /// Name used for the profile and for generated control ids.
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Emit a note per row.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_tag_mapper(mut self, mapper: TagMapper) -> Self {
        self.tag_mapper = mapper;
        self
    }

    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    #[must_use]
    pub const fn mapping(&self) -> &CsvMapping {
        &self.mapping
    }

    /// Split CSV text into raw rows. Rows may have different widths.
    pub fn read_rows(content: &str) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| {
                let location = e
                    .position()
                    .map_or_else(|| "unknown position".to_string(), |p| format!("line {}", p.line()));
                ConvertError::malformed(FORMAT, location, e.to_string())
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    /// Build a profile from raw rows, header row included when the mapping
    /// says there is one.
    pub fn parse_rows(&self, rows: &[Vec<String>]) -> Result<ParseOutcome> {
        let header_rows = usize::from(self.mapping.skip_csv_header);
        let data_rows = rows.get(header_rows..).unwrap_or_default();
        self.check_columns(data_rows)?;

        let mut outcome = ParseOutcome::new(Profile::new(&self.source_name));
        for (index, row) in data_rows.iter().enumerate() {
            let row_number = index + header_rows + 1;
            let control = self.convert_row(row, row_number, &mut outcome);
            outcome
                .profile
                .add_control_with(control, self.duplicate_policy)
                .with_context(|| format!("reading row {row_number}"))?;
        }

        tracing::debug!(
            "CSV '{}': {} rows -> {} controls",
            self.source_name,
            data_rows.len(),
            outcome.profile.len()
        );
        Ok(outcome)
    }

    /// A column no data row reaches means the mapping is wrong, not the data.
    fn check_columns(&self, data_rows: &[Vec<String>]) -> Result<()> {
        let Some(max_width) = data_rows.iter().map(Vec::len).max() else {
            return Ok(());
        };
        for (field, column) in self.mapping.columns() {
            if column >= max_width {
                return Err(ConvertError::mapping(
                    format!("checking column for '{field}'"),
                    MappingErrorKind::ColumnOutOfBounds {
                        field,
                        column,
                        max_width,
                    },
                ));
            }
        }
        Ok(())
    }

    fn convert_row(
        &self,
        row: &[String],
        row_number: usize,
        outcome: &mut ParseOutcome,
    ) -> Control {
        let location = format!("row {row_number}");
        let cell = |column: Option<usize>| {
            column
                .and_then(|c| row.get(c))
                .map_or("", |value| value.trim())
        };

        let short: Vec<String> = self
            .mapping
            .columns()
            .into_iter()
            .filter(|(_, column)| *column >= row.len())
            .map(|(field, _)| field)
            .collect();
        if !short.is_empty() {
            outcome.push(Diagnostic::new(
                DiagnosticKind::ShortRow,
                &location,
                format!("{} cells, no value for {}", row.len(), short.join(", ")),
            ));
        }

        let id = match cell(self.mapping.id) {
            "" => {
                let generated = format!("{}-{}", self.source_name, row_number);
                outcome.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingRequiredField,
                        &location,
                        format!("required field 'id' is missing, generated '{generated}'"),
                    )
                    .for_field("id"),
                );
                generated
            }
            id => id.to_string(),
        };

        let mut control = Control::new(&id)
            .with_title(cell(self.mapping.title))
            .with_desc(wrap(cell(self.mapping.desc), self.mapping.width));

        let mut raw_tags = Vec::new();
        let mut severity_cell = None;
        for (name, column) in &self.mapping.tags {
            let value = cell(Some(*column));
            if value.is_empty() {
                continue;
            }
            let canonical = self.tag_mapper.resolve(name);
            // Severity drives impact whatever the tag ends up being called
            if name == "severity" || (severity_cell.is_none() && canonical == "severity") {
                severity_cell = Some(value);
            }
            match canonical {
                "check" => control.check = value.to_string(),
                "fix" => control.fix = value.to_string(),
                _ if MULTI_VALUE_TAGS.contains(&canonical) => {
                    raw_tags.push((name.clone(), TagValue::List(split_multi_value(value))));
                }
                _ => raw_tags.push((name.clone(), TagValue::from(value))),
            }
        }
        control.tags = self.tag_mapper.apply(raw_tags);
        control.impact = self.row_impact(cell(self.mapping.impact), severity_cell, &id, outcome);

        if self.verbose {
            outcome.push(Diagnostic::new(
                DiagnosticKind::Note,
                &location,
                format!("read control {id} ({} tags)", control.tags.len()),
            ));
        }
        control
    }

    /// Impact from the impact column when mapped, else from the severity cell.
    fn row_impact(
        &self,
        impact_cell: &str,
        severity_cell: Option<&str>,
        id: &str,
        outcome: &mut ParseOutcome,
    ) -> f64 {
        if !impact_cell.is_empty() {
            if let Ok(value) = impact_cell.parse::<f64>() {
                return value.clamp(0.0, 1.0);
            }
            if let Some(severity) = Severity::parse(impact_cell) {
                return severity.impact();
            }
            outcome.push(
                Diagnostic::new(
                    DiagnosticKind::UnknownValue,
                    id,
                    format!("impact '{impact_cell}' not recognized, using medium"),
                )
                .for_field("impact"),
            );
            return Severity::Medium.impact();
        }

        match severity_cell {
            Some(label) => Severity::parse(label).map_or_else(
                || {
                    outcome.push(
                        Diagnostic::new(
                            DiagnosticKind::UnknownValue,
                            id,
                            format!("severity '{label}' not recognized, using medium"),
                        )
                        .for_field("severity"),
                    );
                    Severity::Medium.impact()
                },
                Severity::impact,
            ),
            None => {
                if self.mapping.impact.is_some() || self.mapping.tags.contains_key("severity") {
                    outcome.push(Diagnostic::missing(id, "severity"));
                }
                Severity::Medium.impact()
            }
        }
    }
}

impl ProfileParser for CsvParser {
    /// STIG Viewer exports are often ISO-8859-1, so bytes that are not UTF-8
    /// are decoded as Latin-1 instead of failing.
    fn parse(&self, path: &Path) -> Result<ParseOutcome> {
        let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
        self.parse_str(&decode_text(bytes))
    }

    fn parse_str(&self, content: &str) -> Result<ParseOutcome> {
        let rows = Self::read_rows(content)?;
        self.parse_rows(&rows)
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();
        if trimmed.starts_with('<') || trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }
        let first_line = trimmed.lines().next().unwrap_or_default();
        if first_line.starts_with("Vuln ID,") || first_line.starts_with("\"Vuln ID\",") {
            FormatDetection::with_confidence(FormatConfidence::HIGH).variant("stig-viewer")
        } else if first_line.contains(',') {
            FormatDetection::with_confidence(FormatConfidence::LOW).variant("generic")
        } else {
            FormatDetection::no_match()
        }
    }
}

/// UTF-8 when valid, otherwise ISO-8859-1 (every byte is its own code
/// point). A leading byte-order mark is dropped.
pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Input is not UTF-8 ({e}), reading as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Split a multi-value cell on commas and newlines.
fn split_multi_value(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedy word wrap by display width. Existing line breaks are kept;
/// a width of 0 disables wrapping.
fn wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    text.lines()
        .map(|line| wrap_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, width: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut current = 0;
    for word in line.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        if current > 0 && current + 1 + word_width > width {
            out.push('\n');
            current = 0;
        } else if current > 0 {
            out.push(' ');
            current += 1;
        }
        out.push_str(word);
        current += word_width;
    }
    out
}
