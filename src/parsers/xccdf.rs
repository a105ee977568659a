//! XCCDF benchmark reader.
//!
//! Walks `Benchmark > Group* > Rule` with the quick-xml event reader and
//! builds one control per rule. Inside a group the control id is the group
//! id (the STIG vulnerability id) and the rule id becomes the `rid` tag;
//! a rule outside any group is keyed by its own id.
//!
//! STIG descriptions embed escaped pseudo-XML
//! (`<VulnDiscussion>..</VulnDiscussion><FalsePositives>..`). The
//! `VulnDiscussion` part becomes the control description and every other
//! element becomes a snake_cased tag.

use super::traits::{
    Diagnostic, DiagnosticKind, FormatConfidence, FormatDetection, ParseOutcome, ProfileParser,
};
use crate::error::{ConvertError, ErrorContext, Result};
use crate::mapping::TagMapper;
use crate::model::{Control, DuplicatePolicy, Profile, Severity, TagValue};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

const FORMAT: &str = "XCCDF";

static PSEUDO_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_]*)>").expect("static regex"));

static NAMESPACE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"checklists\.nist\.gov/xccdf/(\d+\.\d+)").expect("static regex")
});

/// Parser for XCCDF 1.1/1.2 benchmark documents
#[derive(Debug, Clone, Default)]
pub struct XccdfParser {
    tag_mapper: TagMapper,
    duplicate_policy: DuplicatePolicy,
}

impl XccdfParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename discovered tags through `mapper`.
    #[must_use]
    pub fn with_tag_mapper(mut self, mapper: TagMapper) -> Self {
        self.tag_mapper = mapper;
        self
    }

    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Parse raw bytes; anything that is not UTF-8 is malformed.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParseOutcome> {
        let content = std::str::from_utf8(bytes).map_err(|e| {
            ConvertError::malformed(FORMAT, format!("byte {}", e.valid_up_to()), "invalid UTF-8")
        })?;
        self.parse_str(content)
    }

    fn walk(&self, content: &str) -> Result<ParseOutcome> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut walk = Walk::new(self);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => walk.on_start(e, false)?,
                Ok(Event::Empty(ref e)) => walk.on_start(e, true)?,
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    walk.on_text(&text);
                }
                Ok(Event::CData(ref e)) => walk.on_text(&String::from_utf8_lossy(e)),
                Ok(Event::End(ref e)) => walk.on_end(&local_name(e.name().as_ref()))?,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ConvertError::malformed(
                        FORMAT,
                        format!("byte {}", reader.buffer_position()),
                        e.to_string(),
                    ))
                }
                _ => {}
            }
            buf.clear();
        }

        walk.finish()
    }
}

impl ProfileParser for XccdfParser {
    fn parse_str(&self, content: &str) -> Result<ParseOutcome> {
        let outcome = self.walk(content)?;
        tracing::debug!(
            "XCCDF: {} controls, {} diagnostics",
            outcome.profile.len(),
            outcome.diagnostics.len()
        );
        Ok(outcome)
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn detect(&self, content: &str) -> FormatDetection {
        if !content.trim_start().starts_with('<') {
            return FormatDetection::no_match();
        }
        let has_benchmark = content.contains("<Benchmark") || content.contains(":Benchmark");
        let has_namespace = content.contains("checklists.nist.gov/xccdf");
        let version = NAMESPACE_VERSION
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let detection = if has_benchmark && has_namespace {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN).variant("benchmark")
        } else if has_benchmark {
            FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                .variant("benchmark")
                .warning("Missing XCCDF namespace")
        } else {
            return FormatDetection::no_match();
        };
        match version {
            Some(v) => detection.version(&v),
            None => detection,
        }
    }
}

#[derive(Debug, Default)]
struct GroupFrame {
    id: Option<String>,
    title: String,
}

#[derive(Debug, Default)]
struct RuleFrame {
    index: usize,
    id: Option<String>,
    severity: Option<String>,
    version: Option<String>,
    title: Option<String>,
    description: Option<String>,
    check_content: Option<String>,
    check_refs: Vec<String>,
    fixtext: Option<String>,
    fix_id: Option<String>,
    idents: Vec<(String, String)>,
    pending_ident_system: String,
}

/// Mutable state of one document walk.
struct Walk<'p> {
    parser: &'p XccdfParser,
    outcome: ParseOutcome,
    stack: Vec<String>,
    texts: Vec<String>,
    groups: Vec<GroupFrame>,
    rule: Option<RuleFrame>,
    rule_count: usize,
    seen_root: bool,
}

impl<'p> Walk<'p> {
    fn new(parser: &'p XccdfParser) -> Self {
        Self {
            parser,
            outcome: ParseOutcome::new(Profile::default()),
            stack: Vec::new(),
            texts: Vec::new(),
            groups: Vec::new(),
            rule: None,
            rule_count: 0,
            seen_root: false,
        }
    }

    fn set_attribute(&mut self, key: impl Into<String>, value: String) {
        if !value.is_empty() {
            self.outcome.profile.attributes.insert(key.into(), value);
        }
    }

    fn on_start(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        let name = local_name(e.name().as_ref());

        if !self.seen_root {
            if name != "Benchmark" {
                return Err(ConvertError::malformed(
                    FORMAT,
                    "root element",
                    format!("expected Benchmark, found {name}"),
                ));
            }
            self.seen_root = true;
            if let Some(id) = attribute(e, "id") {
                self.set_attribute("benchmark.id", id);
            }
        } else {
            let at_benchmark = self.stack.last().is_some_and(|p| p == "Benchmark");
            match name.as_str() {
                "Group" if !is_empty => self.groups.push(GroupFrame {
                    id: attribute(e, "id"),
                    title: String::new(),
                }),
                "Rule" => {
                    let frame = RuleFrame {
                        index: self.rule_count,
                        id: attribute(e, "id"),
                        severity: attribute(e, "severity"),
                        ..RuleFrame::default()
                    };
                    self.rule_count += 1;
                    if is_empty {
                        self.finish_rule(frame)?;
                    } else {
                        self.rule = Some(frame);
                    }
                }
                "fixtext" | "fix" => {
                    let id_attr = if name == "fix" { "id" } else { "fixref" };
                    if let Some(rule) = self.rule.as_mut() {
                        if rule.fix_id.is_none() {
                            rule.fix_id = attribute(e, id_attr).filter(|v| !v.is_empty());
                        }
                    }
                }
                "ident" => {
                    if let Some(rule) = self.rule.as_mut() {
                        rule.pending_ident_system = attribute(e, "system").unwrap_or_default();
                    }
                }
                "check-content-ref" => {
                    if let Some(rule) = self.rule.as_mut() {
                        if let Some(ref_name) =
                            attribute(e, "name").filter(|n| !n.is_empty() && n != "M")
                        {
                            rule.check_refs.push(ref_name);
                        }
                    }
                }
                "status" if at_benchmark => {
                    if let Some(date) = attribute(e, "date") {
                        self.set_attribute("benchmark.status.date", date);
                    }
                }
                "notice" if at_benchmark => {
                    if let Some(id) = attribute(e, "id") {
                        self.set_attribute("benchmark.notice.id", id);
                    }
                }
                "plain-text" if at_benchmark => {
                    if let Some(id) = attribute(e, "id") {
                        self.set_attribute("benchmark.plaintext.id", id);
                    }
                }
                "reference" if at_benchmark => {
                    if let Some(href) = attribute(e, "href") {
                        self.set_attribute("reference.href", href);
                    }
                }
                _ => {}
            }
        }

        if !is_empty {
            self.stack.push(name);
            self.texts.push(String::new());
        }
        Ok(())
    }

    fn on_text(&mut self, text: &str) {
        if let Some(buf) = self.texts.last_mut() {
            buf.push_str(text);
        }
    }

    fn on_end(&mut self, name: &str) -> Result<()> {
        self.stack.pop();
        let text = self.texts.pop().unwrap_or_default();
        let parent = self.stack.last().cloned().unwrap_or_default();
        let grandparent = self
            .stack
            .len()
            .checked_sub(2)
            .and_then(|i| self.stack.get(i))
            .cloned()
            .unwrap_or_default();

        // Markup nested in free text is folded back into its parent.
        if matches!(parent.as_str(), "description" | "check-content" | "fixtext") {
            let folded = if parent == "description" && self.rule.is_some() {
                format!("<{name}>{text}</{name}>")
            } else {
                text
            };
            self.on_text(&folded);
            return Ok(());
        }

        let text = text.trim().to_string();

        if name == "Rule" {
            if let Some(frame) = self.rule.take() {
                self.finish_rule(frame)?;
            }
            return Ok(());
        }

        if let Some(rule) = self.rule.as_mut() {
            match name {
                "version" if parent == "Rule" => rule.version = Some(text),
                "title" if parent == "Rule" => rule.title = Some(text),
                "description" if parent == "Rule" => rule.description = Some(text),
                "check-content" => rule.check_content = Some(text),
                "fixtext" => rule.fixtext = Some(text),
                "ident" => {
                    let system = std::mem::take(&mut rule.pending_ident_system);
                    if !text.is_empty() {
                        rule.idents.push((system, text));
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        match name {
            "Group" => {
                self.groups.pop();
            }
            "title" if parent == "Group" => {
                if let Some(group) = self.groups.last_mut() {
                    group.title = text;
                }
            }
            _ if parent == "Benchmark" => {
                if let Some(key) = benchmark_attribute_key(name) {
                    self.set_attribute(key, text);
                }
            }
            _ if parent == "reference" && grandparent == "Benchmark" => {
                self.set_attribute(format!("reference.dc.{name}"), text);
            }
            _ => {}
        }
        Ok(())
    }

    /// Required text field: defaults to empty with a diagnostic.
    fn text_or_default(&mut self, value: Option<String>, location: &str, field: &str) -> String {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                self.outcome.push(Diagnostic::missing(location, field));
                String::new()
            }
        }
    }

    fn finish_rule(&mut self, rule: RuleFrame) -> Result<()> {
        let position = format!("Rule[{}]", rule.index);
        let group = self.groups.last();
        let group_id = group.and_then(|g| g.id.clone()).filter(|s| !s.is_empty());
        let group_title = group.map(|g| g.title.clone()).unwrap_or_default();
        let rule_id = rule.id.clone().filter(|s| !s.is_empty());

        let control_id = match (&group_id, &rule_id) {
            (Some(gid), _) => gid.clone(),
            (None, Some(rid)) => rid.clone(),
            (None, None) => {
                self.outcome.push(Diagnostic::missing_required(position, "id"));
                return Ok(());
            }
        };
        if rule_id.is_none() {
            self.outcome
                .push(Diagnostic::missing_required(control_id.clone(), "id"));
        }
        let location = control_id.clone();

        let severity = match rule.severity.as_deref() {
            None => {
                self.outcome.push(Diagnostic::missing(&location, "severity"));
                Severity::Medium
            }
            Some(label) => Severity::parse(label).unwrap_or_else(|| {
                self.outcome.push(
                    Diagnostic::new(
                        DiagnosticKind::UnknownValue,
                        &location,
                        format!("severity '{label}' not recognized, using medium"),
                    )
                    .for_field("severity"),
                );
                Severity::Medium
            }),
        };

        let title = self.text_or_default(rule.title, &location, "title");
        let description = self.text_or_default(rule.description, &location, "description");
        let check = self.text_or_default(rule.check_content, &location, "check");
        let fix = self.text_or_default(rule.fixtext, &location, "fix");
        let (desc, description_tags) = split_description(&description);

        let mut raw_tags: Vec<(String, TagValue)> = Vec::new();
        let mut push = |name: &str, value: TagValue| raw_tags.push((name.to_string(), value));
        push("severity", TagValue::from(severity.as_str()));
        if !group_title.is_empty() {
            push("gtitle", TagValue::from(group_title));
        }
        if let Some(gid) = group_id {
            push("gid", TagValue::from(gid));
        }
        if let Some(rid) = rule_id {
            push("rid", TagValue::from(rid));
        }
        if let Some(version) = rule.version.filter(|v| !v.is_empty()) {
            push("stig_id", TagValue::from(version));
        }
        if let Some(fix_id) = rule.fix_id {
            push("fix_id", TagValue::from(fix_id));
        }

        let (mut cci, mut legacy, mut other) = (Vec::new(), Vec::new(), Vec::new());
        for (system, value) in rule.idents {
            let system = system.to_lowercase();
            if system.contains("cci") || value.starts_with("CCI-") {
                cci.push(value);
            } else if system.contains("legacy") {
                legacy.push(value);
            } else {
                other.push(value);
            }
        }
        for (name, values) in [("cci", cci), ("legacy", legacy), ("ident", other)] {
            if !values.is_empty() {
                push(name, TagValue::List(values));
            }
        }
        match rule.check_refs.len() {
            0 => {}
            1 => push("check_content_ref", TagValue::from(rule.check_refs[0].clone())),
            _ => push("check_content_ref", TagValue::List(rule.check_refs)),
        }
        for (name, value) in description_tags {
            push(&name, value);
        }

        let control = Control {
            id: control_id,
            title,
            desc,
            impact: severity.impact(),
            descriptions: IndexMap::new(),
            tags: self.parser.tag_mapper.apply(raw_tags),
            check,
            fix,
            code: None,
            results: None,
        };

        self.outcome
            .profile
            .add_control_with(control, self.parser.duplicate_policy)
            .with_context(|| format!("reading {position}"))
    }

    fn finish(mut self) -> Result<ParseOutcome> {
        if !self.seen_root {
            return Err(ConvertError::malformed(
                FORMAT,
                "document",
                "no root element found",
            ));
        }
        let attributes = &self.outcome.profile.attributes;
        let metadata = &mut self.outcome.profile.metadata;
        metadata.name = attributes
            .get("benchmark.id")
            .cloned()
            .unwrap_or_else(|| "xccdf-benchmark".to_string());
        metadata.title = attributes.get("benchmark.title").cloned();
        metadata.version = attributes.get("benchmark.version").cloned();
        metadata.summary = attributes.get("benchmark.description").cloned();
        Ok(self.outcome)
    }
}

fn benchmark_attribute_key(element: &str) -> Option<&'static str> {
    match element {
        "title" => Some("benchmark.title"),
        "description" => Some("benchmark.description"),
        "version" => Some("benchmark.version"),
        "status" => Some("benchmark.status"),
        "plain-text" => Some("benchmark.plaintext"),
        "notice" => Some("benchmark.notice"),
        _ => None,
    }
}

/// Extract local name from a qualified XML name (strips namespace prefix)
fn local_name(name: &[u8]) -> String {
    let name_str = String::from_utf8_lossy(name);
    name_str
        .rfind(':')
        .map_or_else(|| name_str.to_string(), |idx| name_str[idx + 1..].to_string())
}

fn attribute(e: &BytesStart<'_>, wanted: &str) -> Option<String> {
    e.attributes()
        .filter_map(std::result::Result::ok)
        .find(|attr| local_name(attr.key.as_ref()) == wanted)
        .map(|attr| {
            attr.unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
        })
}

/// Split a STIG description into its discussion text and extra tags.
///
/// Text without any pseudo-elements is returned whole.
fn split_description(raw: &str) -> (String, Vec<(String, TagValue)>) {
    let mut discussion = None;
    let mut tags = Vec::new();
    let mut found_any = false;
    let mut cursor = 0;

    while let Some(caps) = PSEUDO_OPEN_TAG.captures(&raw[cursor..]) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let open_end = cursor + whole.end();
        let close = format!("</{}>", tag.as_str());
        let Some(close_offset) = raw[open_end..].find(&close) else {
            cursor = open_end;
            continue;
        };
        found_any = true;
        let inner = raw[open_end..open_end + close_offset].trim();
        if tag.as_str() == "VulnDiscussion" {
            discussion = Some(inner.to_string());
        } else if !inner.is_empty() {
            tags.push((snake_case(tag.as_str()), TagValue::from(inner)));
        }
        cursor = open_end + close_offset + close.len();
    }

    let desc = match discussion {
        Some(d) => d,
        None if !found_any => raw.trim().to_string(),
        None => String::new(),
    };
    (desc, tags)
}

/// `SeverityOverrideGuidance` -> `severity_override_guidance`, `IAControls` -> `ia_controls`
fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower)
                {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
