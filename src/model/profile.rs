//! The profile: an ordered, id-unique collection of controls.

use super::Control;
use crate::error::{ConvertError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What to do when a control id is added twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with a duplicate-control error.
    #[default]
    Reject,
    /// Fold the later control into the earlier one.
    Merge,
}

/// Profile-level descriptive fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Controls plus metadata, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub metadata: ProfileMetadata,
    /// Template parameters (benchmark.title, reference.href...)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub controls: IndexMap<String, Control>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ProfileMetadata {
                name: name.into(),
                ..ProfileMetadata::default()
            },
            attributes: IndexMap::new(),
            controls: IndexMap::new(),
        }
    }

    /// Add a control, rejecting duplicate ids.
    pub fn add_control(&mut self, control: Control) -> Result<()> {
        self.add_control_with(control, DuplicatePolicy::Reject)
    }

    /// Add a control under an explicit duplicate policy.
    ///
    /// Returns an error only for a duplicate id under [`DuplicatePolicy::Reject`].
    pub fn add_control_with(&mut self, control: Control, policy: DuplicatePolicy) -> Result<()> {
        match self.controls.get_mut(&control.id) {
            None => {
                self.controls.insert(control.id.clone(), control);
                Ok(())
            }
            Some(_) if policy == DuplicatePolicy::Reject => {
                Err(ConvertError::duplicate_control(control.id))
            }
            Some(existing) => {
                tracing::debug!("Merging duplicate control {}", control.id);
                existing.merge_from(control);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.get(id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.controls.get_mut(id)
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Title, falling back to the name.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.metadata
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.metadata.name)
    }
}
