//! Tag-name replacement tables.

use crate::error::{ConvertError, ErrorContext, MappingErrorKind, Result};
use crate::model::TagValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolves format-specific tag names to the names stored on controls.
///
/// The table is partial: names it does not mention pass through unchanged.
/// When two source tags resolve to the same name on one control, the later
/// tag in input order wins; this is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMapper {
    replacements: IndexMap<String, String>,
}

impl TagMapper {
    #[must_use]
    pub const fn new(replacements: IndexMap<String, String>) -> Self {
        Self { replacements }
    }

    /// A mapper that renames nothing.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse `old=new` (or `old:new`) pairs as given on the command line.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut replacements = IndexMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (from, to) = pair
                .split_once('=')
                .or_else(|| pair.split_once(':'))
                .map(|(f, t)| (f.trim(), t.trim()))
                .filter(|(f, t)| !f.is_empty() && !t.is_empty())
                .ok_or_else(|| {
                    ConvertError::mapping(
                        "reading tag replacements",
                        MappingErrorKind::BadReplacement(pair.to_string()),
                    )
                })?;
            replacements.insert(from.to_string(), to.to_string());
        }
        Ok(Self::new(replacements))
    }

    /// Load a flat YAML or JSON `old: new` table.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        let table: IndexMap<String, String> = if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        {
            serde_json::from_str(&content)
                .with_context(|| format!("reading tag table {}", path.display()))?
        } else {
            serde_yaml_ng::from_str(&content)
                .with_context(|| format!("reading tag table {}", path.display()))?
        };
        Ok(Self::new(table))
    }

    /// Canonical name for `raw`.
    #[must_use]
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.replacements.get(raw).map_or(raw, String::as_str)
    }

    /// Rename every tag, keeping input order. Later collisions overwrite.
    pub fn apply<I>(&self, tags: I) -> IndexMap<String, TagValue>
    where
        I: IntoIterator<Item = (String, TagValue)>,
    {
        let mut out = IndexMap::new();
        for (name, value) in tags {
            let canonical = self.resolve(&name).to_string();
            if let Some(previous) = out.insert(canonical.clone(), value) {
                tracing::debug!(
                    "Tag '{}' resolved onto existing '{}', replacing {:?}",
                    name,
                    canonical,
                    previous
                );
            }
        }
        out
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.replacements.iter().all(|(k, v)| k == v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Merge another table over this one.
    #[must_use]
    pub fn extended_with(mut self, other: &Self) -> Self {
        self.replacements.extend(
            other
                .replacements
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self
    }
}
