//! Result aggregation over a profile.

use crate::model::{Profile, ResultStatus, Severity};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of one control for summary purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Passed,
    Failed,
    Skipped,
    Error,
    /// Impact 0: informational, never scored
    NoImpact,
    /// No recorded results
    NotRun,
}

impl ControlStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
            Self::NoImpact => "no_impact",
            Self::NotRun => "not_run",
        }
    }

    /// Scored statuses count towards the compliance denominator.
    #[must_use]
    pub const fn result_status(self) -> Option<ResultStatus> {
        match self {
            Self::Passed => Some(ResultStatus::Passed),
            Self::Failed => Some(ResultStatus::Failed),
            Self::Skipped => Some(ResultStatus::Skipped),
            Self::Error => Some(ResultStatus::Error),
            Self::NoImpact | Self::NotRun => None,
        }
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count for one result status, split by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub total: usize,
    /// One entry per severity present among scored controls
    pub by_severity: IndexMap<String, usize>,
}

/// One row of the per-control listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSummary {
    pub id: String,
    pub status: ControlStatus,
    pub severity: Severity,
}

/// Aggregated results of a profile run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub name: String,
    pub total_controls: usize,
    /// Controls with results and non-zero impact
    pub scored: usize,
    pub not_run: usize,
    pub no_impact: usize,
    /// passed / scored x 100, 0.0 when nothing was scored
    pub compliance: f64,
    /// passed, failed, skipped and error; always all four
    pub statuses: IndexMap<String, StatusBreakdown>,
    /// Scored controls per severity present
    pub severity_totals: IndexMap<String, usize>,
    pub controls: Vec<ControlSummary>,
}

impl SummaryReport {
    #[must_use]
    pub fn count(&self, status: ResultStatus) -> usize {
        self.statuses.get(status.as_str()).map_or(0, |b| b.total)
    }

    /// Count of `status` among scored controls of `severity`, if that
    /// severity occurs at all.
    #[must_use]
    pub fn bucket(&self, status: ResultStatus, severity: Severity) -> Option<usize> {
        self.statuses
            .get(status.as_str())?
            .by_severity
            .get(severity.as_str())
            .copied()
    }

    /// Pretty JSON for the `summary` command.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Final status of `control`'s recorded results.
fn control_status(control: &crate::model::Control) -> ControlStatus {
    if control.impact == 0.0 {
        return ControlStatus::NoImpact;
    }
    match control.final_status() {
        None => ControlStatus::NotRun,
        Some(ResultStatus::Passed) => ControlStatus::Passed,
        Some(ResultStatus::Failed) => ControlStatus::Failed,
        Some(ResultStatus::Skipped) => ControlStatus::Skipped,
        Some(ResultStatus::Error) => ControlStatus::Error,
    }
}

/// Aggregate `profile`'s recorded results.
#[must_use]
pub fn summarize(profile: &Profile) -> SummaryReport {
    let controls: Vec<ControlSummary> = profile
        .controls()
        .map(|c| ControlSummary {
            id: c.id.clone(),
            status: control_status(c),
            severity: c.severity(),
        })
        .collect();

    let scored: Vec<(ResultStatus, Severity)> = controls
        .iter()
        .filter_map(|c| c.status.result_status().map(|s| (s, c.severity)))
        .collect();

    let mut severity_totals: IndexMap<String, usize> = IndexMap::new();
    for severity in Severity::ALL.iter().rev() {
        let n = scored.iter().filter(|(_, s)| s == severity).count();
        if n > 0 {
            severity_totals.insert(severity.as_str().to_string(), n);
        }
    }

    let statuses: IndexMap<String, StatusBreakdown> = ResultStatus::ALL
        .iter()
        .map(|status| {
            let of_status = || scored.iter().filter(move |(s, _)| s == status);
            let by_severity = severity_totals
                .keys()
                .map(|sev| {
                    let n = of_status().filter(|(_, s)| s.as_str() == sev.as_str()).count();
                    (sev.clone(), n)
                })
                .collect();
            let breakdown = StatusBreakdown {
                total: of_status().count(),
                by_severity,
            };
            (status.as_str().to_string(), breakdown)
        })
        .collect();

    let passed = statuses.get("passed").map_or(0, |b| b.total);
    let compliance = if scored.is_empty() {
        0.0
    } else {
        passed as f64 * 100.0 / scored.len() as f64
    };

    let report = SummaryReport {
        name: profile.metadata.name.clone(),
        total_controls: controls.len(),
        scored: scored.len(),
        not_run: controls
            .iter()
            .filter(|c| c.status == ControlStatus::NotRun)
            .count(),
        no_impact: controls
            .iter()
            .filter(|c| c.status == ControlStatus::NoImpact)
            .count(),
        compliance,
        statuses,
        severity_totals,
        controls,
    };
    tracing::debug!(
        "Summary: {} scored of {}, compliance {:.1}%",
        report.scored,
        report.total_controls,
        report.compliance
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Control, ResultRecord};

    fn control(id: &str, severity: Severity, statuses: &[ResultStatus]) -> Control {
        let mut control = Control::new(id).with_severity(severity);
        for status in statuses {
            control.record_result(ResultRecord::new(*status, ""));
        }
        control
    }

    fn profile(controls: Vec<Control>) -> Profile {
        let mut profile = Profile::new("run");
        for c in controls {
            profile.add_control(c).unwrap();
        }
        profile
    }

    #[test]
    fn test_final_status_precedence() {
        use ResultStatus::{Error, Failed, Passed, Skipped};
        let report = summarize(&profile(vec![
            control("a", Severity::High, &[Passed, Failed, Error]),
            control("b", Severity::High, &[Passed, Error]),
            control("c", Severity::Low, &[Skipped, Skipped]),
            control("d", Severity::Low, &[Passed, Skipped]),
        ]));
        let statuses: Vec<_> = report.controls.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            [
                ControlStatus::Failed,
                ControlStatus::Error,
                ControlStatus::Skipped,
                ControlStatus::Passed
            ]
        );
    }

    #[test]
    fn test_unrun_and_no_impact_excluded() {
        let report = summarize(&profile(vec![
            control("a", Severity::High, &[ResultStatus::Passed]),
            control("b", Severity::High, &[ResultStatus::Failed]),
            control("c", Severity::Medium, &[]),
            control("d", Severity::None, &[ResultStatus::Failed]),
        ]));
        assert_eq!(report.total_controls, 4);
        assert_eq!(report.scored, 2);
        assert_eq!(report.not_run, 1);
        assert_eq!(report.no_impact, 1);
        assert!((report.compliance - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_profile_is_zero_percent() {
        let report = summarize(&Profile::new("empty"));
        assert_eq!(report.compliance, 0.0);
        assert_eq!(report.statuses.len(), 4);
        assert!(report.severity_totals.is_empty());
    }

    #[test]
    fn test_severity_buckets_only_for_present_severities() {
        let report = summarize(&profile(vec![
            control("a", Severity::High, &[ResultStatus::Passed]),
            control("b", Severity::Low, &[ResultStatus::Failed]),
        ]));
        assert_eq!(report.bucket(ResultStatus::Passed, Severity::High), Some(1));
        assert_eq!(report.bucket(ResultStatus::Failed, Severity::High), Some(0));
        assert_eq!(report.bucket(ResultStatus::Passed, Severity::Critical), None);
        assert_eq!(
            report.severity_totals.keys().collect::<Vec<_>>(),
            ["high", "low"]
        );
    }

    #[test]
    fn test_json_shape() {
        let report = summarize(&profile(vec![control(
            "a",
            Severity::Medium,
            &[ResultStatus::Passed],
        )]));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["statuses"]["passed"]["total"], 1);
        assert_eq!(json["statuses"]["passed"]["by_severity"]["medium"], 1);
        assert_eq!(json["controls"][0]["status"], "passed");
        assert_eq!(json["compliance"], 100.0);
    }
}
