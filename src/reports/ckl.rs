//! DISA checklist (CKL) generation.
//!
//! One `VULN` per control. Host metadata only feeds the `ASSET` header, so a
//! checklist without metadata is still complete, just with empty host
//! fields.

use super::escape::escape_xml;
use crate::model::{Control, HostMetadata, Profile, ResultStatus};
use serde::Serialize;
use std::fmt;

/// Finding status vocabulary of a checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CklStatus {
    Open,
    NotAFinding,
    #[serde(rename = "Not_Applicable")]
    NotApplicable,
    #[serde(rename = "Not_Reviewed")]
    NotReviewed,
}

impl CklStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::NotAFinding => "NotAFinding",
            Self::NotApplicable => "Not_Applicable",
            Self::NotReviewed => "Not_Reviewed",
        }
    }

    /// Status for a control from its latest recorded result.
    ///
    /// Nothing recorded is `Not_Reviewed`. A zero-impact control that ran is
    /// `Not_Applicable`. Otherwise a failed latest result is `Open`, a passed
    /// one `NotAFinding`, and errors or skips leave it `Not_Reviewed`.
    #[must_use]
    pub fn for_control(control: &Control) -> Self {
        let Some(status) = control.latest_status() else {
            return Self::NotReviewed;
        };
        if control.impact == 0.0 {
            return Self::NotApplicable;
        }
        match status {
            ResultStatus::Failed => Self::Open,
            ResultStatus::Error | ResultStatus::Skipped => Self::NotReviewed,
            ResultStatus::Passed => Self::NotAFinding,
        }
    }
}

impl fmt::Display for CklStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One checklist finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CklVuln {
    /// `(VULN_ATTRIBUTE, ATTRIBUTE_DATA)` pairs; CCI and legacy ids repeat.
    pub stig_data: Vec<(String, String)>,
    pub status: CklStatus,
    pub finding_details: String,
    pub comments: String,
}

impl CklVuln {
    /// First value recorded for `attribute`.
    #[must_use]
    pub fn attribute(&self, attribute: &str) -> Option<&str> {
        self.stig_data
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value.as_str())
    }

    /// Every value recorded for `attribute`.
    pub fn attributes<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a str> {
        self.stig_data
            .iter()
            .filter(move |(name, _)| name == attribute)
            .map(|(_, value)| value.as_str())
    }
}

/// A complete checklist ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CklDocument {
    pub asset: HostMetadata,
    pub stig_info: Vec<(String, String)>,
    pub vulns: Vec<CklVuln>,
}

impl CklDocument {
    /// Finding for a control id (`Vuln_Num`).
    #[must_use]
    pub fn vuln(&self, id: &str) -> Option<&CklVuln> {
        self.vulns
            .iter()
            .find(|v| v.attribute("Vuln_Num") == Some(id))
    }

    /// Number of findings with `status`.
    #[must_use]
    pub fn count(&self, status: CklStatus) -> usize {
        self.vulns.iter().filter(|v| v.status == status).count()
    }

    /// Serialize as STIG Viewer checklist XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096 + self.vulns.len() * 2048);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<!--DISA STIG Viewer :: 2.17-->\n");
        out.push_str("<CHECKLIST>\n");

        out.push_str("\t<ASSET>\n");
        let asset = &self.asset;
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let web_or_database = asset.is_web_or_database().to_string();
        for (name, value) in [
            ("ROLE", opt(&asset.role)),
            ("ASSET_TYPE", opt(&asset.asset_type)),
            ("HOST_NAME", opt(&asset.hostname)),
            ("HOST_IP", opt(&asset.ip)),
            ("HOST_MAC", opt(&asset.mac)),
            ("HOST_FQDN", opt(&asset.fqdn)),
            ("TARGET_COMMENT", String::new()),
            ("TECH_AREA", opt(&asset.tech_area)),
            ("TARGET_KEY", opt(&asset.target_key)),
            ("WEB_OR_DATABASE", web_or_database),
            ("WEB_DB_SITE", opt(&asset.web_db_site)),
            ("WEB_DB_INSTANCE", opt(&asset.web_db_instance)),
        ] {
            element(&mut out, 2, name, &value);
        }
        out.push_str("\t</ASSET>\n");

        out.push_str("\t<STIGS>\n\t\t<iSTIG>\n\t\t\t<STIG_INFO>\n");
        for (name, value) in &self.stig_info {
            out.push_str("\t\t\t\t<SI_DATA>\n");
            element(&mut out, 5, "SID_NAME", name);
            element(&mut out, 5, "SID_DATA", value);
            out.push_str("\t\t\t\t</SI_DATA>\n");
        }
        out.push_str("\t\t\t</STIG_INFO>\n");

        for vuln in &self.vulns {
            out.push_str("\t\t\t<VULN>\n");
            for (attribute, value) in &vuln.stig_data {
                out.push_str("\t\t\t\t<STIG_DATA>\n");
                element(&mut out, 5, "VULN_ATTRIBUTE", attribute);
                element(&mut out, 5, "ATTRIBUTE_DATA", value);
                out.push_str("\t\t\t\t</STIG_DATA>\n");
            }
            element(&mut out, 4, "STATUS", vuln.status.as_str());
            element(&mut out, 4, "FINDING_DETAILS", &vuln.finding_details);
            element(&mut out, 4, "COMMENTS", &vuln.comments);
            element(&mut out, 4, "SEVERITY_OVERRIDE", "");
            element(&mut out, 4, "SEVERITY_JUSTIFICATION", "");
            out.push_str("\t\t\t</VULN>\n");
        }

        out.push_str("\t\t</iSTIG>\n\t</STIGS>\n</CHECKLIST>\n");
        out
    }
}

fn element(out: &mut String, depth: usize, name: &str, value: &str) {
    for _ in 0..depth {
        out.push('\t');
    }
    if value.is_empty() {
        out.push_str(&format!("<{name}></{name}>\n"));
    } else {
        out.push_str(&format!("<{name}>{}</{name}>\n", escape_xml(value)));
    }
}

/// Vuln attributes read straight from same-named tags, in checklist order.
const TAG_ATTRIBUTES: [(&str, &str); 11] = [
    ("IA_Controls", "ia_controls"),
    ("False_Positives", "false_positives"),
    ("False_Negatives", "false_negatives"),
    ("Documentable", "documentable"),
    ("Mitigations", "mitigations"),
    ("Potential_Impact", "potential_impacts"),
    ("Third_Party_Tools", "third_party_tools"),
    ("Mitigation_Control", "mitigation_control"),
    ("Responsibility", "responsibility"),
    ("Security_Override_Guidance", "severity_override_guidance"),
    ("Check_Content_Ref", "check_content_ref"),
];

/// Builds checklists from profiles with recorded results.
#[derive(Debug, Clone, Default)]
pub struct CklGenerator {
    classification: Option<String>,
}

impl CklGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classification marking for `STIG_INFO` (default `UNCLASSIFIED`).
    #[must_use]
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    #[must_use]
    pub fn generate(&self, profile: &Profile, host: &HostMetadata) -> CklDocument {
        let stig_ref = match &profile.metadata.version {
            Some(version) => format!("{} :: Version {version}", profile.display_title()),
            None => profile.display_title().to_string(),
        };

        let vulns: Vec<CklVuln> = profile
            .controls()
            .map(|control| self.vuln(control, &stig_ref, host))
            .collect();

        let document = CklDocument {
            asset: host.clone(),
            stig_info: self.stig_info(profile, host),
            vulns,
        };
        tracing::debug!(
            "CKL: {} findings, {} open, {} not reviewed",
            document.vulns.len(),
            document.count(CklStatus::Open),
            document.count(CklStatus::NotReviewed)
        );
        document
    }

    fn stig_info(&self, profile: &Profile, host: &HostMetadata) -> Vec<(String, String)> {
        let attr = |key: &str| profile.attributes.get(key).cloned().unwrap_or_default();
        let stigid = host
            .stigid
            .clone()
            .unwrap_or_else(|| profile.metadata.name.clone());
        let version = profile
            .metadata
            .version
            .clone()
            .unwrap_or_else(|| attr("benchmark.version"));

        [
            ("version", version),
            (
                "classification",
                self.classification
                    .clone()
                    .unwrap_or_else(|| "UNCLASSIFIED".to_string()),
            ),
            ("customname", String::new()),
            ("stigid", stigid),
            (
                "description",
                profile.metadata.summary.clone().unwrap_or_default(),
            ),
            ("filename", String::new()),
            ("releaseinfo", attr("benchmark.plaintext")),
            ("title", profile.display_title().to_string()),
            ("notice", attr("benchmark.notice.id")),
            ("source", attr("reference.dc.source")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn vuln(&self, control: &Control, stig_ref: &str, host: &HostMetadata) -> CklVuln {
        let tag = |name: &str| control.tag_text(name).unwrap_or_default();
        let mut data: Vec<(String, String)> = Vec::new();
        let mut push = |name: &str, value: String| data.push((name.to_string(), value));

        push("Vuln_Num", control.id.clone());
        push("Severity", control.severity().ckl_label().to_string());
        push("Group_Title", tag("gtitle"));
        push("Rule_ID", tag("rid"));
        push("Rule_Ver", tag("stig_id"));
        push("Rule_Title", control.title.clone());
        push("Vuln_Discuss", control.desc.clone());
        push("Check_Content", control.check.clone());
        push("Fix_Text", control.fix.clone());
        for (attribute, tag_name) in TAG_ATTRIBUTES {
            push(attribute, tag(tag_name));
        }
        push(
            "Weight",
            control.tag_text("weight").unwrap_or_else(|| "10.0".to_string()),
        );
        push("Class", "Unclass".to_string());
        push("STIGRef", stig_ref.to_string());
        push("TargetKey", host.target_key.clone().unwrap_or_default());
        for list_tag in ["legacy", "cci"] {
            let attribute = if list_tag == "cci" { "CCI_REF" } else { "LEGACY_ID" };
            for value in control.tag(list_tag).map(|t| t.values()).unwrap_or_default() {
                push(attribute, value);
            }
        }

        let status = CklStatus::for_control(control);
        CklVuln {
            stig_data: data,
            status,
            finding_details: finding_details(control),
            comments: comments(control, status),
        }
    }
}

fn finding_details(control: &Control) -> String {
    let Some(results) = control.results.as_ref() else {
        return String::new();
    };
    results
        .iter()
        .map(|r| {
            let mut entry = r.status.as_str().to_uppercase();
            if !r.code_desc.is_empty() {
                entry.push_str(" -- ");
                entry.push_str(&r.code_desc);
            }
            if !r.message.is_empty() {
                entry.push('\n');
                entry.push_str(&r.message);
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn comments(control: &Control, status: CklStatus) -> String {
    match status {
        CklStatus::NotApplicable => "Impact is 0.0; control is not applicable.".to_string(),
        CklStatus::NotReviewed if control.has_results() => {
            "Automated check did not reach a verdict; manual review required.".to_string()
        }
        _ => String::new(),
    }
}
