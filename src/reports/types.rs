//! Output format definitions.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Document kinds the single-document writers produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// XCCDF 1.1 benchmark
    Xccdf,
    /// Spreadsheet export
    Csv,
    /// `inspec json` style hash
    InspecJson,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Xccdf => write!(f, "xccdf"),
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::InspecJson => write!(f, "inspec-json"),
        }
    }
}

/// How converted profiles are written
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ProfileFormat {
    /// InSpec profile directory (`inspec.yml` + `controls/*.rb`)
    #[default]
    Ruby,
    /// Single JSON hash
    Json,
}

impl std::fmt::Display for ProfileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileFormat::Ruby => write!(f, "ruby"),
            ProfileFormat::Json => write!(f, "json"),
        }
    }
}
