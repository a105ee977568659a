//! XCCDF benchmark writer.
//!
//! The benchmark header is a template of `%attribute.name%` placeholders;
//! each is filled from the caller's attributes, then the profile's own
//! attributes, then the writer defaults. Groups and rules are generated from
//! the controls.

use super::escape::{escape_xml, escape_xml_attr};
use super::{ProfileWriter, ReportFormat};
use crate::error::{ConvertError, Result};
use crate::model::{Control, Profile};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%").expect("static regex"));

const HEADER_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Benchmark xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:cpe="http://cpe.mitre.org/language/2.0" xmlns:xhtml="http://www.w3.org/1999/xhtml" xmlns:dsig="http://www.w3.org/2000/09/xmldsig#" xsi:schemaLocation="http://checklists.nist.gov/xccdf/1.1 http://nvd.nist.gov/schema/xccdf-1.1.4.xsd http://cpe.mitre.org/dictionary/2.0 http://cpe.mitre.org/files/cpe-dictionary_2.1.xsd" id="%benchmark.id%" xml:lang="en" xmlns="http://checklists.nist.gov/xccdf/1.1">
  <status date="%benchmark.status.date%">%benchmark.status%</status>
  <title>%benchmark.title%</title>
  <description>%benchmark.description%</description>
  <notice id="%benchmark.notice.id%">%benchmark.notice%</notice>
  <reference href="%reference.href%">
    <dc:publisher>%reference.dc.publisher%</dc:publisher>
    <dc:source>%reference.dc.source%</dc:source>
  </reference>
  <plain-text id="%benchmark.plaintext.id%">%benchmark.plaintext%</plain-text>
  <version>%benchmark.version%</version>
"#;

/// Description pseudo-elements in the order STIG benchmarks use, with the
/// tag each one is read from.
const DESCRIPTION_ELEMENTS: [(&str, &str); 10] = [
    ("FalsePositives", "false_positives"),
    ("FalseNegatives", "false_negatives"),
    ("Documentable", "documentable"),
    ("Mitigations", "mitigations"),
    ("SeverityOverrideGuidance", "severity_override_guidance"),
    ("PotentialImpacts", "potential_impacts"),
    ("ThirdPartyTools", "third_party_tools"),
    ("MitigationControl", "mitigation_control"),
    ("Responsibility", "responsibility"),
    ("IAControls", "ia_controls"),
];

/// Renders a profile as an XCCDF 1.1 benchmark.
#[derive(Debug, Clone)]
pub struct XccdfWriter {
    attributes: IndexMap<String, String>,
    defaults: IndexMap<String, String>,
}

impl Default for XccdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XccdfWriter {
    #[must_use]
    pub fn new() -> Self {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let mut defaults: IndexMap<String, String> = [
            ("benchmark.status", "draft"),
            ("benchmark.version", "1"),
            ("benchmark.description", ""),
            ("benchmark.notice", ""),
            ("benchmark.notice.id", "terms-of-use"),
            ("benchmark.plaintext", ""),
            ("benchmark.plaintext.id", "release-info"),
            ("reference.href", ""),
            ("reference.dc.publisher", ""),
            ("reference.dc.source", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        defaults.insert("benchmark.status.date".to_string(), today);
        Self {
            attributes: IndexMap::new(),
            defaults,
        }
    }

    /// Caller attributes; these take precedence over the profile's.
    #[must_use]
    pub fn with_attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Override a writer default, e.g. a fixed status date.
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Render with an explicit attribute map.
    pub fn render_with(
        &self,
        profile: &Profile,
        attributes: &IndexMap<String, String>,
    ) -> Result<String> {
        let mut out = self.header(profile, attributes)?;
        for control in profile.controls() {
            write_group(&mut out, control, &profile.metadata.name);
        }
        out.push_str("</Benchmark>\n");
        tracing::debug!("XCCDF: wrote {} rules", profile.len());
        Ok(out)
    }

    fn header(&self, profile: &Profile, attributes: &IndexMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(HEADER_TEMPLATE.len() + 512);
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(HEADER_TEMPLATE) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let key = key.as_str();
            let value = attributes
                .get(key)
                .or_else(|| self.attributes.get(key))
                .or_else(|| profile.attributes.get(key))
                .or_else(|| self.defaults.get(key))
                .ok_or_else(|| ConvertError::unresolved_template(key))?;
            out.push_str(&HEADER_TEMPLATE[last..whole.start()]);
            out.push_str(&escape_xml_attr(value));
            last = whole.end();
        }
        out.push_str(&HEADER_TEMPLATE[last..]);
        Ok(out)
    }
}

impl ProfileWriter for XccdfWriter {
    fn render(&self, profile: &Profile) -> Result<String> {
        self.render_with(profile, &IndexMap::new())
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Xccdf
    }
}

fn write_group(out: &mut String, control: &Control, benchmark_name: &str) {
    let tag = |name: &str| control.tag_text(name).unwrap_or_default();
    let rule_id = control
        .tag_text("rid")
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| format!("{}_rule", control.id));
    let fix_id = control
        .tag_text("fix_id")
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| format!("F-{}_fix", control.id));
    let weight = control
        .tag_text("weight")
        .unwrap_or_else(|| "10.0".to_string());

    out.push_str(&format!("  <Group id=\"{}\">\n", escape_xml_attr(&control.id)));
    out.push_str(&format!("    <title>{}</title>\n", escape_xml(&tag("gtitle"))));
    out.push_str("    <description>&lt;GroupDescription&gt;&lt;/GroupDescription&gt;</description>\n");
    out.push_str(&format!(
        "    <Rule id=\"{}\" severity=\"{}\" weight=\"{}\">\n",
        escape_xml_attr(&rule_id),
        control.severity().xccdf_label(),
        escape_xml_attr(&weight)
    ));
    let stig_id = tag("stig_id");
    if !stig_id.is_empty() {
        out.push_str(&format!("      <version>{}</version>\n", escape_xml(&stig_id)));
    }
    out.push_str(&format!("      <title>{}</title>\n", escape_xml(&control.title)));
    out.push_str(&format!(
        "      <description>{}</description>\n",
        escape_xml(&description(control))
    ));

    for (system, tag_name) in [
        ("http://cyber.mil/legacy", "legacy"),
        ("http://cyber.mil/cci", "cci"),
        ("urn:ident", "ident"),
    ] {
        for value in control.tag(tag_name).map(|t| t.values()).unwrap_or_default() {
            out.push_str(&format!(
                "      <ident system=\"{system}\">{}</ident>\n",
                escape_xml(&value)
            ));
        }
    }

    out.push_str(&format!(
        "      <fixtext fixref=\"{}\">{}</fixtext>\n",
        escape_xml_attr(&fix_id),
        escape_xml(&control.fix)
    ));
    out.push_str(&format!("      <fix id=\"{}\" />\n", escape_xml_attr(&fix_id)));

    out.push_str(&format!(
        "      <check system=\"C-{}_chk\">\n",
        escape_xml_attr(&control.id)
    ));
    let refs = control
        .tag("check_content_ref")
        .map(|t| t.values())
        .unwrap_or_default();
    let href = format!("{benchmark_name}.xml");
    if refs.is_empty() {
        out.push_str(&format!(
            "        <check-content-ref href=\"{}\" name=\"M\" />\n",
            escape_xml_attr(&href)
        ));
    }
    for name in refs {
        out.push_str(&format!(
            "        <check-content-ref href=\"{}\" name=\"{}\" />\n",
            escape_xml_attr(&href),
            escape_xml_attr(&name)
        ));
    }
    out.push_str(&format!(
        "        <check-content>{}</check-content>\n",
        escape_xml(&control.check)
    ));
    out.push_str("      </check>\n    </Rule>\n  </Group>\n");
}

/// STIG description pseudo-XML; escaped again when embedded.
fn description(control: &Control) -> String {
    let mut text = format!("<VulnDiscussion>{}</VulnDiscussion>", control.desc);
    for (element, tag_name) in DESCRIPTION_ELEMENTS {
        let value = control.tag_text(tag_name).unwrap_or_default();
        text.push_str(&format!("<{element}>{value}</{element}>"));
    }
    text
}
