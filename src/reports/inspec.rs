//! InSpec profile writer: JSON hash and Ruby profile tree.

use super::escape::{ruby_key, ruby_string};
use super::{ProfileWriter, ReportFormat};
use crate::error::{ConvertError, ReportErrorKind, Result};
use crate::model::{Control, Profile, TagValue};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Generated profile files, keyed by path relative to the profile root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFiles {
    files: IndexMap<String, String>,
}

impl ProfileFiles {
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn insert(&mut self, path: String, content: String) {
        self.files.insert(path, content);
    }

    /// Write every file under `root`, creating directories as needed.
    pub fn write_to(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for (relative, content) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
            }
            std::fs::write(&path, content).map_err(|e| ConvertError::io(&path, e))?;
            written.push(path);
        }
        tracing::info!("Wrote {} profile files to {}", written.len(), root.display());
        Ok(written)
    }
}

/// `inspec.yml` contents.
#[derive(Debug, Serialize)]
struct InspecYml<'a> {
    name: &'a str,
    title: &'a str,
    maintainer: &'a str,
    copyright: &'a str,
    copyright_email: &'a str,
    license: &'a str,
    summary: &'a str,
    version: &'a str,
    supports: Vec<IndexMap<&'static str, &'static str>>,
}

/// Writes a profile as InSpec source or as the JSON hash `inspec json` emits.
#[derive(Debug, Clone)]
pub struct InspecWriter {
    separate_files: bool,
}

impl Default for InspecWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl InspecWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            separate_files: true,
        }
    }

    /// One `controls/<id>.rb` per control (default) or a single file.
    #[must_use]
    pub const fn separate_files(mut self, separate: bool) -> Self {
        self.separate_files = separate;
        self
    }

    /// Plain nested mapping, readable again by the InSpec JSON parser.
    #[must_use]
    pub fn render_hash(&self, profile: &Profile) -> Value {
        let meta = &profile.metadata;
        let controls: Vec<Value> = profile.controls().map(control_hash).collect();
        let mut hash = json!({
            "name": meta.name,
            "title": meta.title,
            "maintainer": meta.maintainer,
            "copyright": meta.copyright,
            "copyright_email": meta.copyright_email,
            "license": meta.license,
            "summary": meta.summary,
            "version": meta.version,
            "supports": [],
            "controls": controls,
        });
        if let Value::Object(map) = &mut hash {
            map.retain(|_, v| !v.is_null());
        }
        hash
    }

    /// `inspec.yml` plus control source files.
    pub fn render_ruby(&self, profile: &Profile) -> Result<ProfileFiles> {
        let mut files = ProfileFiles::default();
        files.insert("inspec.yml".to_string(), inspec_yml(profile)?);

        if self.separate_files {
            for control in profile.controls() {
                files.insert(
                    format!("controls/{}.rb", file_stem(&control.id)),
                    control_ruby(control),
                );
            }
        } else {
            let body = profile
                .controls()
                .map(control_ruby)
                .collect::<Vec<_>>()
                .join("\n");
            files.insert(
                format!("controls/{}.rb", file_stem(&profile.metadata.name)),
                body,
            );
        }
        tracing::debug!("InSpec: rendered {} files", files.len());
        Ok(files)
    }
}

impl ProfileWriter for InspecWriter {
    fn render(&self, profile: &Profile) -> Result<String> {
        serde_json::to_string_pretty(&self.render_hash(profile)).map_err(|e| {
            ConvertError::report("rendering InSpec JSON", ReportErrorKind::Serialization(e.to_string()))
        })
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::InspecJson
    }
}

fn control_hash(control: &Control) -> Value {
    let mut descriptions: IndexMap<&str, &str> = IndexMap::new();
    if !control.desc.is_empty() {
        descriptions.insert("default", &control.desc);
    }
    for (label, text) in &control.descriptions {
        descriptions.insert(label, text);
    }

    let mut hash = json!({
        "id": control.id,
        "title": control.title,
        "desc": control.desc,
        "descriptions": descriptions,
        "impact": control.impact,
        "refs": [],
        "tags": procedure_tags(control),
        "code": control.code.clone().unwrap_or_default(),
    });
    if let (Value::Object(map), Some(results)) = (&mut hash, &control.results) {
        map.insert("results".to_string(), json!(results));
    }
    hash
}

/// Tags with check and fix folded in as tags.
fn procedure_tags(control: &Control) -> IndexMap<String, TagValue> {
    let mut tags = control.tags.clone();
    if !control.check.is_empty() {
        tags.insert("check".to_string(), TagValue::from(control.check.as_str()));
    }
    if !control.fix.is_empty() {
        tags.insert("fix".to_string(), TagValue::from(control.fix.as_str()));
    }
    tags
}

fn inspec_yml(profile: &Profile) -> Result<String> {
    let meta = &profile.metadata;
    let or = |value: &Option<String>, default: &str| -> String {
        value.clone().unwrap_or_else(|| default.to_string())
    };
    let (title, maintainer, copyright, email, license, summary, version) = (
        or(&meta.title, &meta.name),
        or(&meta.maintainer, "The Authors"),
        or(&meta.copyright, "The Authors"),
        or(&meta.copyright_email, "you@example.com"),
        or(&meta.license, "Apache-2.0"),
        or(&meta.summary, "An InSpec Compliance Profile"),
        or(&meta.version, "0.1.0"),
    );
    let yml = InspecYml {
        name: &meta.name,
        title: &title,
        maintainer: &maintainer,
        copyright: &copyright,
        copyright_email: &email,
        license: &license,
        summary: &summary,
        version: &version,
        supports: vec![IndexMap::from([("platform", "os")])],
    };
    Ok(serde_yaml_ng::to_string(&yml)?)
}

fn control_ruby(control: &Control) -> String {
    if let Some(code) = control.code.as_ref().filter(|c| !c.trim().is_empty()) {
        let mut code = code.clone();
        if !code.ends_with('\n') {
            code.push('\n');
        }
        return code;
    }

    let mut out = format!("control {} do\n", ruby_string(&control.id));
    out.push_str(&format!("  title {}\n", ruby_string(&control.title)));
    out.push_str(&format!("  desc {}\n", ruby_string(&control.desc)));
    for (label, text) in &control.descriptions {
        out.push_str(&format!("  desc {}, {}\n", ruby_string(label), ruby_string(text)));
    }
    out.push_str(&format!("  impact {}\n", ruby_impact(control.impact)));
    for (name, value) in procedure_tags(control) {
        out.push_str(&format!("  tag {} {}\n", ruby_key(&name), ruby_value(&value)));
    }
    out.push_str("end\n");
    out
}

fn ruby_value(value: &TagValue) -> String {
    match value {
        TagValue::Bool(b) => b.to_string(),
        TagValue::Scalar(s) => ruby_string(s),
        TagValue::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|i| ruby_string(i))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Always keeps a decimal point: `0.0`, `0.5`, `1.0`.
fn ruby_impact(impact: f64) -> String {
    if impact.fract() == 0.0 {
        format!("{impact:.1}")
    } else {
        impact.to_string()
    }
}

fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
