//! Column mappings for CSV import and export.
//!
//! Import and export are configured separately: the import mapping says
//! which input column feeds which control field, the export mapping lists
//! output columns in order.

use super::flatten_yaml;
use crate::error::{ConvertError, ErrorContext, MappingErrorKind, Result};
use crate::model::{Control, ResultStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tags whose CSV cells hold several comma/newline separated values.
pub const MULTI_VALUE_TAGS: &[&str] = &["cci", "nist"];

/// Delimiter used when export flattens a list into one cell.
pub const MULTI_VALUE_DELIMITER: &str = ", ";

/// Import mapping: input column index per control field.
///
/// Recognized keys: `skip_csv_header`, `width`, `control.id`,
/// `control.title`, `control.desc`, `control.impact` and
/// `control.tags.<name>`, either dotted or nested. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvMapping {
    /// Row 0 is a header (default `true`)
    pub skip_csv_header: bool,
    /// Wrap width for descriptions (default 80, cosmetic)
    pub width: usize,
    pub id: Option<usize>,
    pub title: Option<usize>,
    pub desc: Option<usize>,
    pub impact: Option<usize>,
    pub tags: IndexMap<String, usize>,
}

impl Default for CsvMapping {
    /// Column layout of a DISA STIG Viewer CSV export.
    fn default() -> Self {
        Self {
            skip_csv_header: true,
            width: 80,
            id: Some(0),
            title: Some(15),
            desc: Some(16),
            impact: None,
            tags: [
                ("severity", 1),
                ("rid", 8),
                ("stig_id", 3),
                ("cci", 2),
                ("check", 12),
                ("fix", 10),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        }
    }
}

impl CsvMapping {
    /// Parse a mapping document (YAML, which also covers JSON).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root: serde_yaml_ng::Value = serde_yaml_ng::from_str(content)?;
        let flat = flatten_yaml(&root);

        let mut mapping = Self {
            skip_csv_header: true,
            width: 80,
            id: None,
            title: None,
            desc: None,
            impact: None,
            tags: IndexMap::new(),
        };

        for (key, value) in &flat {
            match key.as_str() {
                "skip_csv_header" => mapping.skip_csv_header = yaml_bool(value).unwrap_or(true),
                "width" => mapping.width = column_index(key, value)?,
                "control.id" => mapping.id = Some(column_index(key, value)?),
                "control.title" => mapping.title = Some(column_index(key, value)?),
                "control.desc" => mapping.desc = Some(column_index(key, value)?),
                "control.impact" => mapping.impact = Some(column_index(key, value)?),
                other => {
                    if let Some(tag) = other.strip_prefix("control.tags.") {
                        mapping.tags.insert(tag.to_string(), column_index(key, value)?);
                    } else {
                        tracing::debug!("Ignoring unrecognized mapping key '{}'", other);
                    }
                }
            }
        }

        if mapping.id.is_none() {
            return Err(ConvertError::mapping(
                "reading CSV mapping",
                MappingErrorKind::MissingKey("control.id".to_string()),
            ));
        }
        Ok(mapping)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("loading CSV mapping {}", path.display()))
    }

    /// Every configured (field, column) pair.
    #[must_use]
    pub fn columns(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        let named = [
            ("control.id", self.id),
            ("control.title", self.title),
            ("control.desc", self.desc),
            ("control.impact", self.impact),
        ];
        for (name, col) in named {
            if let Some(col) = col {
                out.push((name.to_string(), col));
            }
        }
        for (tag, col) in &self.tags {
            out.push((format!("control.tags.{tag}"), *col));
        }
        out
    }

    /// Template written by `generate-map`.
    #[must_use]
    pub fn template_yaml() -> String {
        let mapping = Self::default();
        let mut out = String::new();
        out.push_str(&format!("skip_csv_header: {}\n", mapping.skip_csv_header));
        out.push_str(&format!("width: {}\n", mapping.width));
        for (name, col) in [
            ("control.id", mapping.id),
            ("control.title", mapping.title),
            ("control.desc", mapping.desc),
        ] {
            if let Some(col) = col {
                out.push_str(&format!("{name}: {col}\n"));
            }
        }
        out.push_str("control.tags:\n");
        for (tag, col) in &mapping.tags {
            out.push_str(&format!("  {tag}: {col}\n"));
        }
        out
    }
}

fn yaml_bool(value: &serde_yaml_ng::Value) -> Option<bool> {
    match value {
        serde_yaml_ng::Value::Bool(b) => Some(*b),
        serde_yaml_ng::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn column_index(key: &str, value: &serde_yaml_ng::Value) -> Result<usize> {
    let parsed = match value {
        serde_yaml_ng::Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        serde_yaml_ng::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ConvertError::mapping(
            "reading CSV mapping",
            MappingErrorKind::NotAColumn {
                key: key.to_string(),
                value: serde_yaml_ng::to_string(value)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            },
        )
    })
}

/// Where an export column takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportField {
    Id,
    Title,
    Desc,
    Impact,
    Severity,
    Check,
    Fix,
    /// Final result status, empty when the control never ran
    Status,
    Tag(String),
}

impl ExportField {
    /// Parse `id`, `title`, `desc`, `impact`, `severity`, `check`, `fix`,
    /// `status` or `tags.<name>`.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.trim() {
            "id" => Self::Id,
            "title" => Self::Title,
            "desc" | "description" => Self::Desc,
            "impact" => Self::Impact,
            "severity" => Self::Severity,
            "check" => Self::Check,
            "fix" => Self::Fix,
            "status" => Self::Status,
            other => Self::Tag(other.strip_prefix("tags.").unwrap_or(other).to_string()),
        }
    }

    #[must_use]
    pub fn spec(&self) -> String {
        match self {
            Self::Id => "id".to_string(),
            Self::Title => "title".to_string(),
            Self::Desc => "desc".to_string(),
            Self::Impact => "impact".to_string(),
            Self::Severity => "severity".to_string(),
            Self::Check => "check".to_string(),
            Self::Fix => "fix".to_string(),
            Self::Status => "status".to_string(),
            Self::Tag(name) => format!("tags.{name}"),
        }
    }

    /// Cell text for `control`. Lists are joined with `delimiter`.
    #[must_use]
    pub fn extract(&self, control: &Control, delimiter: &str) -> String {
        match self {
            Self::Id => control.id.clone(),
            Self::Title => control.title.clone(),
            Self::Desc => control.desc.clone(),
            Self::Impact => format!("{:.1}", control.impact),
            Self::Severity => control.severity().to_string(),
            Self::Check => control.check.clone(),
            Self::Fix => control.fix.clone(),
            Self::Status => control
                .final_status()
                .map(ResultStatus::as_str)
                .unwrap_or_default()
                .to_string(),
            Self::Tag(name) => control
                .tag(name)
                .map(|v| v.flatten(delimiter))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportColumnSpec {
    header: String,
    field: String,
}

#[derive(Debug, Deserialize)]
struct ExportMappingSpec {
    #[serde(default)]
    delimiter: Option<String>,
    columns: Vec<ExportColumnSpec>,
}

/// Export mapping: ordered output columns.
///
/// Multi-valued tags are joined with [`Self::delimiter`]; the export is lossy
/// for values that themselves contain the delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExportMapping {
    pub columns: Vec<(String, ExportField)>,
    pub delimiter: String,
}

impl Default for CsvExportMapping {
    fn default() -> Self {
        let columns = [
            ("VulnID", ExportField::Id),
            ("STIGID", ExportField::Tag("stig_id".into())),
            ("RuleID", ExportField::Tag("rid".into())),
            ("Severity", ExportField::Severity),
            ("Impact", ExportField::Impact),
            ("CCI", ExportField::Tag("cci".into())),
            ("NIST", ExportField::Tag("nist".into())),
            ("Title", ExportField::Title),
            ("Description", ExportField::Desc),
            ("Check", ExportField::Check),
            ("Fix", ExportField::Fix),
        ];
        Self {
            columns: columns
                .into_iter()
                .map(|(h, f)| (h.to_string(), f))
                .collect(),
            delimiter: MULTI_VALUE_DELIMITER.to_string(),
        }
    }
}

impl CsvExportMapping {
    /// Parse `{delimiter?, columns: [{header, field}]}`.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let spec: ExportMappingSpec = serde_yaml_ng::from_str(content)?;
        Ok(Self {
            columns: spec
                .columns
                .into_iter()
                .map(|c| (c.header, ExportField::parse(&c.field)))
                .collect(),
            delimiter: spec
                .delimiter
                .unwrap_or_else(|| MULTI_VALUE_DELIMITER.to_string()),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("loading CSV export mapping {}", path.display()))
    }

    #[must_use]
    pub fn with_status(mut self) -> Self {
        if !self.columns.iter().any(|(_, f)| *f == ExportField::Status) {
            self.columns.push(("Status".to_string(), ExportField::Status));
        }
        self
    }

    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|(h, _)| h.clone()).collect()
    }
}
