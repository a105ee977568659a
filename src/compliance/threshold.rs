//! Threshold specifications and their evaluation against a summary.
//!
//! A spec is a (possibly nested) map of category to requirement:
//!
//! ```yaml
//! compliance.min: 80
//! failed:
//!   critical:
//!     max: 0
//! passed.high: 90
//! ```
//!
//! A bare number or `.min` is a minimum percentage of scored controls; `.max`
//! is a maximum count. `compliance` is always a percentage.

use super::summary::SummaryReport;
use crate::error::{ConvertError, ErrorContext, Result};
use crate::mapping::flatten_yaml;
use crate::model::{ResultStatus, Severity};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Which side of the requirement a clause bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// Minimum percentage
    Min,
    /// Maximum count
    Max,
}

impl Bound {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// One requirement of a threshold spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdClause {
    /// Normalized category: `compliance`, `<status>` or `<status>.<severity>`
    pub category: String,
    pub bound: Bound,
    pub value: f64,
}

impl fmt::Display for ThresholdClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bound {
            Bound::Min => write!(f, "{}.min >= {}%", self.category, self.value),
            Bound::Max => write!(f, "{}.max <= {}", self.category, self.value),
        }
    }
}

/// A parsed threshold specification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThresholdSpec {
    clauses: Vec<ThresholdClause>,
}

impl ThresholdSpec {
    /// Parse YAML (or JSON, which YAML accepts).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(content)?;
        if !value.is_mapping() {
            return Err(ConvertError::validation(
                "threshold specification must be a mapping of category to value",
            ));
        }

        let mut clauses = Vec::new();
        for (key, raw) in flatten_yaml(&value) {
            let value = numeric(&raw).ok_or_else(|| {
                ConvertError::validation(format!("threshold '{key}' is not a number"))
            })?;
            let (category, bound) = normalize_key(&key);
            clauses.push(ThresholdClause {
                category,
                bound,
                value,
            });
        }
        if clauses.is_empty() {
            return Err(ConvertError::validation(
                "threshold specification declares no requirements",
            ));
        }
        Ok(Self { clauses })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("loading threshold file {}", path.display()))
    }

    #[must_use]
    pub fn clauses(&self) -> &[ThresholdClause] {
        &self.clauses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn numeric(value: &serde_yaml_ng::Value) -> Option<f64> {
    match value {
        serde_yaml_ng::Value::Number(n) => n.as_f64(),
        serde_yaml_ng::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// Split a key into its category and bound.
///
/// Tokens may be separated by `.` or `_` and appear in any order, so
/// `critical_passed`, `passed_critical` and `passed.critical.min` all name
/// `passed.critical`. `total` is dropped. Keys that do not name a known
/// category keep their raw form and never match a report entry.
fn normalize_key(key: &str) -> (String, Bound) {
    let lowered = key.trim().to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(['.', '_'])
        .filter(|t| !t.is_empty())
        .collect();

    let bound = match tokens.last() {
        Some(&"max") => {
            tokens.pop();
            Bound::Max
        }
        Some(&"min") => {
            tokens.pop();
            Bound::Min
        }
        _ => Bound::Min,
    };
    tokens.retain(|t| *t != "total");

    let status = tokens
        .iter()
        .find(|t| **t == "compliance" || t.parse::<ResultStatus>().is_ok());
    let severity = tokens.iter().find_map(|t| {
        Severity::parse(t).filter(|_| matches!(*t, "none" | "low" | "medium" | "high" | "critical"))
    });

    let category = match (status, severity, tokens.len()) {
        (Some(&"compliance"), None, 1) => "compliance".to_string(),
        (Some(status), None, 1) => canonical_status(status).to_string(),
        (Some(status), Some(severity), 2) if *status != "compliance" => {
            format!("{}.{}", canonical_status(status), severity.as_str())
        }
        _ => {
            tracing::warn!("Threshold key '{}' does not name a known category", key);
            key.trim().to_lowercase()
        }
    };
    (category, bound)
}

fn canonical_status(token: &str) -> &'static str {
    token
        .parse::<ResultStatus>()
        .map_or("compliance", ResultStatus::as_str)
}

/// Outcome of one clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseOutcome {
    pub clause: ThresholdClause,
    /// Percentage (min) or count (max); `None` when the category is absent
    pub actual: Option<f64>,
    pub met: bool,
}

/// Value of `category` in `report` for the given bound.
fn actual(report: &SummaryReport, category: &str, bound: Bound) -> Option<f64> {
    if category == "compliance" {
        return Some(report.compliance);
    }
    let (status, severity) = match category.split_once('.') {
        Some((status, severity)) => (status, Some(severity)),
        None => (category, None),
    };
    let breakdown = report.statuses.get(status)?;
    let (count, denominator) = match severity {
        None => (breakdown.total, report.scored),
        Some(sev) => (
            *breakdown.by_severity.get(sev)?,
            *report.severity_totals.get(sev)?,
        ),
    };
    Some(match bound {
        Bound::Max => count as f64,
        Bound::Min if denominator == 0 => 0.0,
        Bound::Min => count as f64 * 100.0 / denominator as f64,
    })
}

/// Check every clause of `spec` against `report`.
#[must_use]
pub fn evaluate(report: &SummaryReport, spec: &ThresholdSpec) -> Vec<ClauseOutcome> {
    spec.clauses
        .iter()
        .map(|clause| {
            let actual = actual(report, &clause.category, clause.bound);
            let met = actual.is_some_and(|value| match clause.bound {
                Bound::Min => value >= clause.value,
                Bound::Max => value <= clause.value,
            });
            tracing::debug!(
                "Threshold {}: actual {:?}, {}",
                clause,
                actual,
                if met { "met" } else { "not met" }
            );
            ClauseOutcome {
                clause: clause.clone(),
                actual,
                met,
            }
        })
        .collect()
}

/// True when every clause holds.
#[must_use]
pub fn threshold(report: &SummaryReport, spec: &ThresholdSpec) -> bool {
    evaluate(report, spec).iter().all(|o| o.met)
}
