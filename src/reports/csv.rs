//! CSV export of a profile.
//!
//! Columns come from a [`CsvExportMapping`], independent of the import
//! mapping. Multi-valued tags are joined with the mapping's delimiter, so a
//! value that itself contains the delimiter does not survive a re-import
//! intact.

use super::{ProfileWriter, ReportFormat};
use crate::error::{ConvertError, ReportErrorKind, Result};
use crate::mapping::CsvExportMapping;
use crate::model::Profile;

/// CSV export generator.
#[derive(Debug, Clone, Default)]
pub struct CsvWriter {
    mapping: CsvExportMapping,
}

impl CsvWriter {
    #[must_use]
    pub fn new(mapping: CsvExportMapping) -> Self {
        Self { mapping }
    }

    #[must_use]
    pub fn mapping(&self) -> &CsvExportMapping {
        &self.mapping
    }

    /// Header row followed by one row per control, in profile order.
    #[must_use]
    pub fn rows(&self, profile: &Profile) -> Vec<Vec<String>> {
        render(profile, &self.mapping)
    }
}

/// Table rows for `profile`: the header row, then one row per control.
#[must_use]
pub fn render(profile: &Profile, mapping: &CsvExportMapping) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(profile.len() + 1);
    rows.push(mapping.headers());
    for control in profile.controls() {
        rows.push(
            mapping
                .columns
                .iter()
                .map(|(_, field)| field.extract(control, &mapping.delimiter))
                .collect(),
        );
    }
    rows
}

/// RFC 4180 text for `rows`.
pub fn render_string(rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| {
        ConvertError::report(
            "writing CSV",
            ReportErrorKind::Serialization(e.error().to_string()),
        )
    })?;
    String::from_utf8(bytes).map_err(|e| {
        ConvertError::report("writing CSV", ReportErrorKind::Serialization(e.to_string()))
    })
}

impl ProfileWriter for CsvWriter {
    fn render(&self, profile: &Profile) -> Result<String> {
        render_string(&self.rows(profile))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CsvMapping, ExportField};
    use crate::model::{Control, Severity, TagValue};
    use crate::parsers::CsvParser;

    fn sample_profile() -> Profile {
        let mut profile = Profile::new("demo");
        profile
            .add_control(
                Control::new("V-1")
                    .with_title("First, with a comma")
                    .with_desc("Line one\nline two")
                    .with_severity(Severity::High)
                    .with_check("check it")
                    .with_fix("fix it")
                    .with_tag("stig_id", "DEMO-001")
                    .with_tag("rid", "SV-1r1_rule")
                    .with_tag("cci", TagValue::List(vec!["CCI-000366".into(), "CCI-000381".into()])),
            )
            .unwrap();
        profile
            .add_control(Control::new("V-2").with_title("Second").with_severity(Severity::Low))
            .unwrap();
        profile
    }

    #[test]
    fn test_default_columns() {
        let rows = render(&sample_profile(), &CsvExportMapping::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            [
                "VulnID", "STIGID", "RuleID", "Severity", "Impact", "CCI", "NIST", "Title",
                "Description", "Check", "Fix"
            ]
        );
        assert_eq!(rows[1][0], "V-1");
        assert_eq!(rows[1][3], "high");
        assert_eq!(rows[1][4], "0.7");
        assert_eq!(rows[1][5], "CCI-000366, CCI-000381");
        assert_eq!(rows[2][5], "");
    }

    #[test]
    fn test_render_string_quotes_cells() {
        let text = CsvWriter::default().render(&sample_profile()).unwrap();
        assert!(text.starts_with("VulnID,STIGID,RuleID"));
        assert!(text.contains("\"First, with a comma\""));
        assert!(text.contains("\"Line one\nline two\""));
    }

    #[test]
    fn test_export_then_import_keeps_controls() {
        let profile = sample_profile();
        let text = CsvWriter::default().render(&profile).unwrap();

        let mapping = CsvMapping {
            width: 0,
            id: Some(0),
            title: Some(7),
            desc: Some(8),
            impact: Some(4),
            tags: [("stig_id", 1), ("rid", 2), ("severity", 3), ("cci", 5), ("check", 9), ("fix", 10)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..CsvMapping::default()
        };
        let rows = CsvParser::read_rows(&text).unwrap();
        let back = CsvParser::new(mapping).parse_rows(&rows).unwrap().profile;

        assert_eq!(back.len(), profile.len());
        for original in profile.controls() {
            let control = back.control(&original.id).unwrap();
            assert_eq!(control.title, original.title);
            assert_eq!(control.desc, original.desc);
            assert_eq!(control.impact, original.impact);
            assert_eq!(control.check, original.check);
            assert_eq!(control.fix, original.fix);
        }
        assert_eq!(
            back.control("V-1").unwrap().tag("cci"),
            profile.control("V-1").unwrap().tag("cci")
        );
    }

    #[test]
    fn test_custom_mapping_with_status() {
        let mapping = CsvExportMapping::from_yaml_str(
            "delimiter: \"|\"\ncolumns:\n  - header: ID\n    field: id\n  - header: CCIs\n    field: tags.cci\n",
        )
        .unwrap()
        .with_status();
        assert_eq!(mapping.columns[1].1, ExportField::Tag("cci".into()));
        let rows = render(&sample_profile(), &mapping);
        assert_eq!(rows[0], ["ID", "CCIs", "Status"]);
        assert_eq!(rows[1], ["V-1", "CCI-000366|CCI-000381", ""]);
    }
}
