//! External metadata records and their injection into profiles.
//!
//! A metadata file is a flat JSON (or YAML) map. Host metadata feeds the CKL
//! asset header; profile metadata feeds `inspec.yml`. Empty values are
//! dropped on load and on save.

use super::Profile;
use crate::error::{ConvertError, ErrorContext, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keys recognized for host (CKL asset) metadata.
pub const HOST_METADATA_KEYS: [&str; 12] = [
    "stigid",
    "role",
    "type",
    "hostname",
    "ip",
    "mac",
    "fqdn",
    "tech_area",
    "target_key",
    "web_or_database",
    "web_db_site",
    "web_db_instance",
];

/// Keys recognized for profile metadata.
pub const PROFILE_METADATA_KEYS: [&str; 5] =
    ["maintainer", "copyright", "copyright_email", "license", "version"];

/// A flat, ordered key/value record with empty values removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetadataRecord(IndexMap<String, String>);

impl MetadataRecord {
    /// Build from pairs, dropping empty values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into().trim().to_string()))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        )
    }

    /// Parse a flat JSON object. Non-string scalars are stringified.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: IndexMap<String, serde_json::Value> = serde_json::from_str(content)?;
        Ok(Self::from_pairs(
            raw.into_iter().map(|(k, v)| (k, json_scalar(&v))),
        ))
    }

    /// Parse a flat YAML mapping.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: IndexMap<String, serde_yaml_ng::Value> = serde_yaml_ng::from_str(content)?;
        Ok(Self::from_pairs(
            raw.into_iter().map(|(k, v)| (k, yaml_scalar(&v))),
        ))
    }

    /// Load from a file, choosing the parser by extension (JSON by default).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let parsed = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        };
        parsed.with_context(|| format!("loading metadata from {}", path.display()))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys that are not in `known`, for warning about typos.
    #[must_use]
    pub fn unknown_keys(&self, known: &[&str]) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| !known.contains(k))
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn yaml_scalar(value: &serde_yaml_ng::Value) -> String {
    match value {
        serde_yaml_ng::Value::Null => String::new(),
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Host/asset details for the CKL header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMetadata {
    pub stigid: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub fqdn: Option<String>,
    pub tech_area: Option<String>,
    pub target_key: Option<String>,
    pub web_or_database: Option<String>,
    pub web_db_site: Option<String>,
    pub web_db_instance: Option<String>,
}

impl HostMetadata {
    #[must_use]
    pub fn from_record(record: &MetadataRecord) -> Self {
        let take = |key: &str| record.get(key).map(str::to_string);
        Self {
            stigid: take("stigid"),
            role: take("role"),
            asset_type: take("type"),
            hostname: take("hostname"),
            ip: take("ip"),
            mac: take("mac"),
            fqdn: take("fqdn"),
            tech_area: take("tech_area"),
            target_key: take("target_key"),
            web_or_database: take("web_or_database"),
            web_db_site: take("web_db_site"),
            web_db_instance: take("web_db_instance"),
        }
    }

    /// Overlay `other`'s present fields onto a copy of `self`.
    #[must_use]
    pub fn merged_with(&self, other: &Self) -> Self {
        fn pick(a: &Option<String>, b: &Option<String>) -> Option<String> {
            b.clone().or_else(|| a.clone())
        }
        Self {
            stigid: pick(&self.stigid, &other.stigid),
            role: pick(&self.role, &other.role),
            asset_type: pick(&self.asset_type, &other.asset_type),
            hostname: pick(&self.hostname, &other.hostname),
            ip: pick(&self.ip, &other.ip),
            mac: pick(&self.mac, &other.mac),
            fqdn: pick(&self.fqdn, &other.fqdn),
            tech_area: pick(&self.tech_area, &other.tech_area),
            target_key: pick(&self.target_key, &other.target_key),
            web_or_database: pick(&self.web_or_database, &other.web_or_database),
            web_db_site: pick(&self.web_db_site, &other.web_db_site),
            web_db_instance: pick(&self.web_db_instance, &other.web_db_instance),
        }
    }

    /// `web_or_database` as a boolean; anything but a truthy word is false.
    #[must_use]
    pub fn is_web_or_database(&self) -> bool {
        self.web_or_database
            .as_deref()
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "yes" | "y" | "1"))
    }
}

/// Profile maintainer/licensing details for `inspec.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadataRecord {
    pub maintainer: Option<String>,
    pub copyright: Option<String>,
    pub copyright_email: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
}

impl ProfileMetadataRecord {
    #[must_use]
    pub fn from_record(record: &MetadataRecord) -> Self {
        let take = |key: &str| record.get(key).map(str::to_string);
        Self {
            maintainer: take("maintainer"),
            copyright: take("copyright"),
            copyright_email: take("copyright_email"),
            license: take("license"),
            version: take("version"),
        }
    }
}

/// Return `profile` with the record's present fields applied.
///
/// Only profile metadata changes; controls and their ids are untouched.
#[must_use]
pub fn inject_profile_metadata(profile: Profile, record: &ProfileMetadataRecord) -> Profile {
    let mut profile = profile;
    let meta = &mut profile.metadata;
    let apply = |slot: &mut Option<String>, value: &Option<String>| {
        if let Some(v) = value {
            *slot = Some(v.clone());
        }
    };
    apply(&mut meta.maintainer, &record.maintainer);
    apply(&mut meta.copyright, &record.copyright);
    apply(&mut meta.copyright_email, &record.copyright_email);
    apply(&mut meta.license, &record.license);
    apply(&mut meta.version, &record.version);
    profile
}
