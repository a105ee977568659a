//! Controls, their tags, and recorded results.

use super::Severity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value of a control tag.
///
/// Multi-valued tags (CCI references, NIST families) stay ordered lists all
/// the way through the model; only export formats without list support
/// flatten them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Scalar(String),
    List(Vec<String>),
}

impl TagValue {
    /// The scalar text, if this is a scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// All values as an ordered list.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Bool(b) => vec![b.to_string()],
            Self::Scalar(s) => vec![s.clone()],
            Self::List(items) => items.clone(),
        }
    }

    /// Join the values with `delimiter`. Lossy for lists.
    #[must_use]
    pub fn flatten(&self, delimiter: &str) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Scalar(s) => s.clone(),
            Self::List(items) => items.join(delimiter),
        }
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(_) => false,
            Self::Scalar(s) => s.is_empty(),
            Self::List(items) => items.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vec<String>> for TagValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Outcome of one run of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl ResultStatus {
    pub const ALL: [Self; 4] = [Self::Passed, Self::Failed, Self::Skipped, Self::Error];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passed" | "pass" => Ok(Self::Passed),
            "failed" | "fail" => Ok(Self::Failed),
            "skipped" | "skip" => Ok(Self::Skipped),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown result status '{other}'")),
        }
    }
}

/// A single recorded outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub status: ResultStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

impl ResultRecord {
    pub fn new(status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            code_desc: String::new(),
            run_time: None,
            start_time: None,
        }
    }

    #[must_use]
    pub const fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_code_desc(mut self, code_desc: impl Into<String>) -> Self {
        self.code_desc = code_desc.into();
        self
    }
}

/// One auditable rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub impact: f64,
    /// Labelled descriptions beyond `desc` (rationale, check, fix...)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub descriptions: IndexMap<String, String>,
    #[serde(default)]
    pub tags: IndexMap<String, TagValue>,
    #[serde(default)]
    pub check: String,
    #[serde(default)]
    pub fix: String,
    /// Executable body, when the control came from a profile source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// `None` when the control was never run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultRecord>>,
}

impl Control {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            desc: String::new(),
            impact: Severity::Medium.impact(),
            descriptions: IndexMap::new(),
            tags: IndexMap::new(),
            check: String::new(),
            fix: String::new(),
            code: None,
            results: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    #[must_use]
    pub const fn with_impact(mut self, impact: f64) -> Self {
        self.impact = impact;
        self
    }

    #[must_use]
    pub fn with_severity(self, severity: Severity) -> Self {
        self.with_impact(severity.impact())
    }

    #[must_use]
    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.check = check.into();
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = fix.into();
        self
    }

    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.set_tag(name, value);
        self
    }

    /// Set a tag. An existing value under the same name is replaced.
    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<TagValue>) {
        self.tags.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    /// Scalar text of a tag; lists are joined with `", "`.
    #[must_use]
    pub fn tag_text(&self, name: &str) -> Option<String> {
        self.tags.get(name).map(|v| v.flatten(", "))
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_impact(self.impact)
    }

    /// Append a result, turning "never run" into "run".
    pub fn record_result(&mut self, result: ResultRecord) {
        self.results.get_or_insert_with(Vec::new).push(result);
    }

    /// True when at least one result is recorded.
    #[must_use]
    pub fn has_results(&self) -> bool {
        self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Final status over all recorded results.
    ///
    /// Any failure wins, then any error; a control whose every result is
    /// skipped is skipped; otherwise it passed. `None` when nothing ran.
    #[must_use]
    pub fn final_status(&self) -> Option<ResultStatus> {
        let results = self.results.as_ref().filter(|r| !r.is_empty())?;
        let any = |status: ResultStatus| results.iter().any(|r| r.status == status);

        if any(ResultStatus::Failed) {
            Some(ResultStatus::Failed)
        } else if any(ResultStatus::Error) {
            Some(ResultStatus::Error)
        } else if results.iter().all(|r| r.status == ResultStatus::Skipped) {
            Some(ResultStatus::Skipped)
        } else {
            Some(ResultStatus::Passed)
        }
    }

    /// Status of the most recent result, `None` when nothing ran.
    #[must_use]
    pub fn latest_status(&self) -> Option<ResultStatus> {
        self.results.as_ref()?.last().map(|r| r.status)
    }

    /// Fold a later definition of the same control into this one.
    ///
    /// Non-empty fields of `other` replace ours, tags are overlaid, and its
    /// results are appended after ours.
    pub fn merge_from(&mut self, other: Self) {
        if !other.title.is_empty() {
            self.title = other.title;
        }
        if !other.desc.is_empty() {
            self.desc = other.desc;
        }
        self.impact = other.impact;
        if !other.check.is_empty() {
            self.check = other.check;
        }
        if !other.fix.is_empty() {
            self.fix = other.fix;
        }
        if other.code.is_some() {
            self.code = other.code;
        }
        self.descriptions.extend(other.descriptions);
        self.tags.extend(other.tags);
        if let Some(results) = other.results {
            self.results.get_or_insert_with(Vec::new).extend(results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ResultStatus) -> ResultRecord {
        ResultRecord::new(status, "")
    }

    #[test]
    fn test_no_results_differs_from_skipped() {
        let never_run = Control::new("V-1");
        let mut skipped = Control::new("V-1");
        skipped.record_result(result(ResultStatus::Skipped));

        assert_eq!(never_run.final_status(), None);
        assert_eq!(skipped.final_status(), Some(ResultStatus::Skipped));
        assert_ne!(never_run, skipped);
    }

    #[test]
    fn test_final_status_precedence() {
        let mut control = Control::new("V-2");
        control.record_result(result(ResultStatus::Passed));
        control.record_result(result(ResultStatus::Skipped));
        assert_eq!(control.final_status(), Some(ResultStatus::Passed));

        control.record_result(result(ResultStatus::Error));
        assert_eq!(control.final_status(), Some(ResultStatus::Error));

        control.record_result(result(ResultStatus::Failed));
        assert_eq!(control.final_status(), Some(ResultStatus::Failed));
        assert_eq!(control.results.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_empty_result_list_counts_as_not_run() {
        let mut control = Control::new("V-3");
        control.results = Some(Vec::new());
        assert!(!control.has_results());
        assert_eq!(control.final_status(), None);
        assert_eq!(control.latest_status(), None);
    }

    #[test]
    fn test_latest_status_is_last_recorded() {
        let mut control = Control::new("V-4");
        control.record_result(result(ResultStatus::Failed));
        control.record_result(result(ResultStatus::Passed));
        assert_eq!(control.latest_status(), Some(ResultStatus::Passed));
        assert_eq!(control.final_status(), Some(ResultStatus::Failed));
    }

    #[test]
    fn test_tag_values_keep_order() {
        let control = Control::new("V-4").with_tag(
            "cci",
            vec!["CCI-002".to_string(), "CCI-001".to_string()],
        );
        let cci = control.tag("cci").unwrap();
        assert!(cci.is_list());
        assert_eq!(cci.values(), vec!["CCI-002", "CCI-001"]);
        assert_eq!(cci.flatten(", "), "CCI-002, CCI-001");
    }

    #[test]
    fn test_tag_value_json_shape() {
        let list = TagValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["a","b"]"#);
        let parsed: TagValue = serde_json::from_str(r#""x""#).unwrap();
        assert_eq!(parsed, TagValue::Scalar("x".into()));
        let parsed: TagValue = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, TagValue::Bool(false));
    }

    #[test]
    fn test_merge_from_appends_results() {
        let mut first = Control::new("V-5").with_title("old");
        first.record_result(result(ResultStatus::Passed));
        let mut second = Control::new("V-5").with_title("new").with_tag("rid", "SV-5r1");
        second.record_result(result(ResultStatus::Failed));

        first.merge_from(second);
        assert_eq!(first.title, "new");
        assert_eq!(first.tag_text("rid").as_deref(), Some("SV-5r1"));
        assert_eq!(first.final_status(), Some(ResultStatus::Failed));
        assert_eq!(first.results.map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_result_status_parse() {
        assert_eq!("PASSED".parse::<ResultStatus>(), Ok(ResultStatus::Passed));
        assert!("maybe".parse::<ResultStatus>().is_err());
    }
}
