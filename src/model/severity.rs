//! The canonical severity scale.
//!
//! Controls carry a numeric `impact` in `0.0..=1.0`. Formats that speak in
//! categories (XCCDF `severity`, CKL `Severity`, CSV columns) convert through
//! [`Severity`]:
//!
//! | category | impact | numeric range mapped back |
//! |----------|--------|---------------------------|
//! | none     | 0.0    | `< 0.1`                   |
//! | low      | 0.3    | `0.1 ..< 0.4`             |
//! | medium   | 0.5    | `0.4 ..< 0.7`             |
//! | high     | 0.7    | `0.7 ..< 0.9`             |
//! | critical | 1.0    | `>= 0.9`                  |
//!
//! Every category survives `from_impact(sev.impact())` unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categorical severity on the canonical scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// Canonical impact value for this category.
    #[must_use]
    pub const fn impact(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Low => 0.3,
            Self::Medium => 0.5,
            Self::High => 0.7,
            Self::Critical => 1.0,
        }
    }

    /// Map a numeric impact back onto a category.
    #[must_use]
    pub fn from_impact(impact: f64) -> Self {
        if impact < 0.1 {
            Self::None
        } else if impact < 0.4 {
            Self::Low
        } else if impact < 0.7 {
            Self::Medium
        } else if impact < 0.9 {
            Self::High
        } else {
            Self::Critical
        }
    }

    /// Parse a severity label as found in XCCDF, CKL and CSV exports.
    ///
    /// Accepts the canonical names, DISA `CAT I/II/III`, and XCCDF's `info`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "none" | "info" | "informational" => Some(Self::None),
            "low" | "cat iii" | "cat 3" | "iii" => Some(Self::Low),
            "medium" | "moderate" | "cat ii" | "cat 2" | "ii" => Some(Self::Medium),
            "high" | "cat i" | "cat 1" | "i" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lowercase canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// XCCDF `severity` attribute value.
    ///
    /// XCCDF has no `critical`; it is written as `high`.
    #[must_use]
    pub const fn xccdf_label(self) -> &'static str {
        match self {
            Self::None => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High | Self::Critical => "high",
        }
    }

    /// CKL `Severity` value, which only knows low/medium/high.
    #[must_use]
    pub const fn ckl_label(self) -> &'static str {
        match self {
            Self::None | Self::Low => "low",
            Self::Medium => "medium",
            Self::High | Self::Critical => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown severity '{s}'"))
    }
}
