//! InSpec profile and results JSON reader.
//!
//! Accepts both `inspec json` profile dumps (controls at the top level) and
//! `inspec exec --reporter json` results (controls nested under `profiles`).
//! Only the results shape carries `results`; a control read from a plain
//! profile stays "never run".

use super::traits::{
    Diagnostic, DiagnosticKind, FormatConfidence, FormatDetection, ParseOutcome, ProfileParser,
};
use crate::error::{ConvertError, ErrorContext, Result};
use crate::model::{
    Control, DuplicatePolicy, Profile, ProfileMetadata, ResultRecord, ResultStatus, Severity,
    TagValue,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;

const FORMAT: &str = "InSpec";

/// Parser for InSpec profile and results JSON
#[derive(Debug, Clone, Default)]
pub struct InspecParser {
    duplicate_policy: DuplicatePolicy,
}

impl InspecParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    fn convert(&self, doc: InspecDocument) -> Result<ParseOutcome> {
        let mut outcome = ParseOutcome::new(Profile::default());

        let profiles = if doc.profiles.is_empty() {
            vec![doc.profile]
        } else {
            doc.profiles
        };

        let mut seen_in_earlier: HashSet<String> = HashSet::new();
        for (profile_index, source) in profiles.into_iter().enumerate() {
            if profile_index == 0 {
                outcome.profile.metadata = source.metadata();
            }
            let profile_name = source.name.clone().unwrap_or_default();
            let mut seen_here = HashSet::new();

            for (index, raw) in source.controls.into_iter().enumerate() {
                let position = format!("profiles[{profile_index}].controls[{index}]");
                let Some(id) = raw.id.clone().filter(|id| !id.is_empty()) else {
                    outcome.push(Diagnostic::missing_required(position, "id"));
                    continue;
                };
                if seen_in_earlier.contains(&id) {
                    outcome.push(Diagnostic::new(
                        DiagnosticKind::Note,
                        &id,
                        format!("also defined in dependency profile '{profile_name}', first definition kept"),
                    ));
                    continue;
                }
                seen_here.insert(id.clone());
                let control = convert_control(id, raw, &mut outcome);
                outcome
                    .profile
                    .add_control_with(control, self.duplicate_policy)
                    .with_context(|| format!("reading {position}"))?;
            }
            seen_in_earlier.extend(seen_here);
        }

        Ok(outcome)
    }
}

impl ProfileParser for InspecParser {
    fn parse_str(&self, content: &str) -> Result<ParseOutcome> {
        let doc: InspecDocument = serde_json::from_str(content).map_err(|e| {
            ConvertError::malformed(
                FORMAT,
                format!("line {} column {}", e.line(), e.column()),
                e.to_string(),
            )
        })?;
        let outcome = self.convert(doc)?;
        tracing::debug!(
            "InSpec: {} controls, {} with results",
            outcome.profile.len(),
            outcome.profile.controls().filter(|c| c.has_results()).count()
        );
        Ok(outcome)
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();
        if !trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }
        let has_profiles = content.contains("\"profiles\"");
        let has_platform = content.contains("\"platform\"");
        let has_controls = content.contains("\"controls\"");

        if has_profiles && has_platform {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN).variant("results")
        } else if has_controls && content.contains("\"impact\"") {
            FormatDetection::with_confidence(FormatConfidence::HIGH).variant("profile")
        } else if has_controls || has_profiles {
            FormatDetection::with_confidence(FormatConfidence::LOW)
                .variant("profile")
                .warning("No impact values found")
        } else {
            FormatDetection::no_match()
        }
    }
}

fn convert_control(id: String, raw: RawControl, outcome: &mut ParseOutcome) -> Control {
    let mut descriptions = raw.descriptions.into_map();

    let impact = match raw.impact {
        Some(impact) if (0.0..=1.0).contains(&impact) => impact,
        Some(impact) => {
            outcome.push(
                Diagnostic::new(
                    DiagnosticKind::UnknownValue,
                    &id,
                    format!("impact {impact} is outside 0.0-1.0, clamped"),
                )
                .for_field("impact"),
            );
            impact.clamp(0.0, 1.0)
        }
        None => {
            outcome.push(Diagnostic::missing(&id, "impact"));
            Severity::Medium.impact()
        }
    };

    let mut tags = IndexMap::new();
    for (name, value) in raw.tags {
        if let Some(value) = json_tag_value(value) {
            tags.insert(name, value);
        }
    }
    let check = take_procedure(&mut tags, &mut descriptions, "check");
    let fix = take_procedure(&mut tags, &mut descriptions, "fix");

    let desc = raw
        .desc
        .filter(|d| !d.is_empty())
        .or_else(|| descriptions.get("default").cloned())
        .unwrap_or_default();
    if descriptions.get("default").is_some_and(|d| *d == desc) {
        descriptions.shift_remove("default");
    }

    let results = raw.results.map(|records| {
        records
            .into_iter()
            .map(|r| convert_result(&id, r, outcome))
            .collect()
    });

    Control {
        title: raw.title.unwrap_or_default(),
        desc,
        impact,
        descriptions,
        tags,
        check,
        fix,
        code: raw.code.filter(|c| !c.is_empty()),
        results,
        id,
    }
}

/// Check and fix text live in tags first, labelled descriptions second.
fn take_procedure(
    tags: &mut IndexMap<String, TagValue>,
    descriptions: &mut IndexMap<String, String>,
    name: &str,
) -> String {
    match tags.shift_remove(name) {
        Some(value) if !value.is_empty() => {
            let text = value.flatten("\n");
            if descriptions.get(name) == Some(&text) {
                descriptions.shift_remove(name);
            }
            text
        }
        _ => descriptions.shift_remove(name).unwrap_or_default(),
    }
}

fn convert_result(id: &str, raw: RawResult, outcome: &mut ParseOutcome) -> ResultRecord {
    let status = raw.status.parse::<ResultStatus>().unwrap_or_else(|e| {
        outcome.push(
            Diagnostic::new(DiagnosticKind::UnknownValue, id, format!("{e}, recorded as error"))
                .for_field("status"),
        );
        ResultStatus::Error
    });
    let message = raw
        .message
        .or(raw.skip_message)
        .or(raw.exception)
        .unwrap_or_default();
    ResultRecord {
        status,
        message,
        code: raw.code,
        code_desc: raw.code_desc.unwrap_or_default(),
        run_time: raw.run_time,
        start_time: raw.start_time,
    }
}

/// JSON tag values keep lists and booleans; numbers become their text.
fn json_tag_value(value: serde_json::Value) -> Option<TagValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(TagValue::Bool(b)),
        Value::String(s) => Some(TagValue::Scalar(s)),
        Value::Number(n) => Some(TagValue::Scalar(n.to_string())),
        Value::Array(items) => Some(TagValue::List(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        object @ Value::Object(_) => Some(TagValue::Scalar(object.to_string())),
    }
}

// ============================================================================
// Wire structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct InspecDocument {
    #[serde(flatten)]
    profile: RawProfile,
    #[serde(default)]
    profiles: Vec<RawProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    name: Option<String>,
    title: Option<String>,
    maintainer: Option<String>,
    copyright: Option<String>,
    copyright_email: Option<String>,
    license: Option<String>,
    summary: Option<String>,
    version: Option<String>,
    #[serde(default)]
    controls: Vec<RawControl>,
}

impl RawProfile {
    fn metadata(&self) -> ProfileMetadata {
        ProfileMetadata {
            name: self.name.clone().unwrap_or_else(|| "inspec-profile".to_string()),
            title: self.title.clone(),
            maintainer: self.maintainer.clone(),
            copyright: self.copyright.clone(),
            copyright_email: self.copyright_email.clone(),
            license: self.license.clone(),
            summary: self.summary.clone(),
            version: self.version.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawControl {
    id: Option<String>,
    title: Option<String>,
    desc: Option<String>,
    impact: Option<f64>,
    #[serde(default)]
    descriptions: RawDescriptions,
    #[serde(default)]
    tags: IndexMap<String, serde_json::Value>,
    code: Option<String>,
    results: Option<Vec<RawResult>>,
}

/// `descriptions` is a map in profile dumps and a label/data list in results.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDescriptions {
    Map(IndexMap<String, Option<String>>),
    List(Vec<LabelledDescription>),
}

impl Default for RawDescriptions {
    fn default() -> Self {
        Self::Map(IndexMap::new())
    }
}

impl RawDescriptions {
    fn into_map(self) -> IndexMap<String, String> {
        let pairs: Vec<(String, Option<String>)> = match self {
            Self::Map(map) => map.into_iter().collect(),
            Self::List(list) => list.into_iter().map(|d| (d.label, d.data)).collect(),
        };
        pairs
            .into_iter()
            .filter_map(|(label, data)| data.filter(|d| !d.is_empty()).map(|d| (label, d)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct LabelledDescription {
    label: String,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    status: String,
    message: Option<String>,
    skip_message: Option<String>,
    exception: Option<String>,
    code: Option<i64>,
    code_desc: Option<String>,
    run_time: Option<f64>,
    start_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_JSON: &str = r#"{
      "name": "rhel8-baseline",
      "title": "RHEL 8 Baseline",
      "maintainer": "Security Team",
      "version": "1.2.0",
      "controls": [
        {
          "id": "V-230221",
          "title": "Supported release",
          "desc": "Unsupported releases receive no patches.",
          "impact": 0.7,
          "descriptions": {"default": "Unsupported releases receive no patches.", "rationale": "Patching"},
          "tags": {
            "severity": "high",
            "cci": ["CCI-000366", "CCI-001744"],
            "documentable": false,
            "weight": 10,
            "check": "cat /etc/redhat-release",
            "fix": "Upgrade"
          },
          "code": "control 'V-230221' do\nend\n"
        },
        {
          "id": "V-230222",
          "title": "Patches",
          "impact": 0.5,
          "descriptions": [{"label": "check", "data": "Run yum history"}, {"label": "fix", "data": "yum update"}],
          "tags": {"nist": ["SI-2"], "gtitle": null}
        }
      ]
    }"#;

    const RESULTS_JSON: &str = r#"{
      "platform": {"name": "redhat", "release": "8.6"},
      "profiles": [
        {
          "name": "wrapper",
          "title": "Wrapper",
          "controls": [
            {"id": "V-1", "title": "one", "impact": 0.5, "tags": {},
             "results": [{"status": "passed", "code_desc": "ok", "run_time": 0.01}]},
            {"id": "V-2", "title": "two", "impact": 0.7, "tags": {},
             "results": [{"status": "failed", "message": "expected 1 got 2"},
                         {"status": "skipped", "skip_message": "not on this host"}]},
            {"id": "V-3", "title": "three", "impact": 0.0, "tags": {}, "results": []}
          ]
        },
        {
          "name": "dependency",
          "controls": [
            {"id": "V-1", "title": "one again", "impact": 0.5, "tags": {}},
            {"id": "V-9", "title": "nine", "impact": 0.3, "tags": {}}
          ]
        }
      ],
      "statistics": {"duration": 0.5},
      "version": "5.18.14"
    }"#;

    #[test]
    fn test_parse_profile_json() {
        let outcome = InspecParser::new().parse_str(PROFILE_JSON).unwrap();
        let profile = &outcome.profile;
        assert_eq!(profile.metadata.name, "rhel8-baseline");
        assert_eq!(profile.metadata.version.as_deref(), Some("1.2.0"));
        assert_eq!(profile.len(), 2);

        let first = profile.control("V-230221").unwrap();
        assert_eq!(first.check, "cat /etc/redhat-release");
        assert_eq!(first.fix, "Upgrade");
        assert!(first.tag("check").is_none());
        assert_eq!(first.tag("documentable"), Some(&TagValue::Bool(false)));
        assert_eq!(first.tag_text("weight").as_deref(), Some("10"));
        assert_eq!(first.tag("cci").map(TagValue::values).unwrap().len(), 2);
        assert_eq!(first.descriptions.get("rationale").map(String::as_str), Some("Patching"));
        assert!(!first.descriptions.contains_key("default"));
        assert!(first.code.is_some());
        assert!(first.results.is_none());

        let second = profile.control("V-230222").unwrap();
        assert_eq!(second.check, "Run yum history");
        assert_eq!(second.fix, "yum update");
        assert!(second.tag("gtitle").is_none());
    }

    #[test]
    fn test_parse_results_json() {
        let outcome = InspecParser::new().parse_str(RESULTS_JSON).unwrap();
        let profile = &outcome.profile;
        assert_eq!(profile.metadata.name, "wrapper");
        let ids: Vec<_> = profile.controls().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["V-1", "V-2", "V-3", "V-9"]);

        assert_eq!(profile.control("V-1").unwrap().title, "one");
        assert_eq!(
            profile.control("V-1").unwrap().final_status(),
            Some(ResultStatus::Passed)
        );
        let v2 = profile.control("V-2").unwrap();
        assert_eq!(v2.final_status(), Some(ResultStatus::Failed));
        let messages: Vec<_> = v2
            .results
            .iter()
            .flatten()
            .map(|r| r.message.as_str())
            .collect();
        assert_eq!(messages, ["expected 1 got 2", "not on this host"]);

        // present-but-empty stays distinct from absent
        assert_eq!(profile.control("V-3").unwrap().results, Some(Vec::new()));
        assert_eq!(profile.control("V-9").unwrap().results, None);
    }

    #[test]
    fn test_missing_id_is_accumulated() {
        let json = r#"{"name": "p", "controls": [{"title": "no id", "impact": 0.5}, {"id": "A", "impact": 0.5}]}"#;
        let outcome = InspecParser::new().parse_str(json).unwrap();
        assert_eq!(outcome.profile.len(), 1);
        assert!(outcome.diagnostics[0].is_missing_required());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = InspecParser::new().parse_str("{\"controls\": [").unwrap_err();
        assert!(err.is_malformed_document());
    }

    #[test]
    fn test_detect_variants() {
        let parser = InspecParser::new();
        assert_eq!(parser.detect(RESULTS_JSON).variant.as_deref(), Some("results"));
        assert_eq!(parser.detect(PROFILE_JSON).variant.as_deref(), Some("profile"));
        assert!(!parser.can_parse("<Benchmark/>"));
    }
}
