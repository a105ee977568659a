//! Name and column resolution between external formats and the model.
//!
//! [`TagMapper`] renames tags on import (XCCDF and CSV both route every tag
//! name through it). [`CsvMapping`] and [`CsvExportMapping`] describe CSV
//! column layouts for the two directions.

mod columns;
mod tags;

pub use columns::{
    CsvExportMapping, CsvMapping, ExportField, MULTI_VALUE_DELIMITER, MULTI_VALUE_TAGS,
};
pub use tags::TagMapper;

use indexmap::IndexMap;

/// Flatten nested YAML mappings into dotted keys.
///
/// `{control: {tags: {cci: 2}}}` becomes `control.tags.cci: 2`. Keys that are
/// already dotted are kept as written, so both spellings meet in one table.
/// Sequences and scalars are leaves.
#[must_use]
pub fn flatten_yaml(value: &serde_yaml_ng::Value) -> IndexMap<String, serde_yaml_ng::Value> {
    let mut out = IndexMap::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(
    prefix: String,
    value: &serde_yaml_ng::Value,
    out: &mut IndexMap<String, serde_yaml_ng::Value>,
) {
    match value {
        serde_yaml_ng::Value::Mapping(map) => {
            for (key, child) in map {
                let key = match key {
                    serde_yaml_ng::Value::String(s) => s.clone(),
                    serde_yaml_ng::Value::Number(n) => n.to_string(),
                    serde_yaml_ng::Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(full, child, out);
            }
        }
        serde_yaml_ng::Value::Tagged(tagged) => flatten_into(prefix, &tagged.value, out),
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix, leaf.clone());
            }
        }
    }
}
