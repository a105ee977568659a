//! Profile output stage.
//!
//! Writes a converted profile either as an InSpec source tree or as the JSON
//! hash, plus the benchmark attributes file next to it.

use crate::model::Profile;
use crate::reports::{InspecWriter, ProfileFormat};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where and how a converted profile is written.
#[derive(Debug, Clone)]
pub struct ProfileOutput {
    pub format: ProfileFormat,
    pub separate_files: bool,
    /// Profile directory (ruby) or JSON file; an existing directory takes
    /// `<name>.json` for the JSON format.
    pub destination: PathBuf,
}

/// Write `profile`, returning every file created.
pub fn write_profile(profile: &Profile, output: &ProfileOutput, quiet: bool) -> Result<Vec<PathBuf>> {
    let writer = InspecWriter::new().separate_files(output.separate_files);

    match output.format {
        ProfileFormat::Ruby => {
            let files = writer
                .render_ruby(profile)
                .context("Failed to render profile")?;
            let written = files
                .write_to(&output.destination)
                .with_context(|| format!("Failed to write profile to {}", output.destination.display()))?;
            if !quiet {
                tracing::info!(
                    "Profile '{}' written to {} ({} files)",
                    profile.metadata.name,
                    output.destination.display(),
                    written.len()
                );
            }
            Ok(written)
        }
        ProfileFormat::Json => {
            let path = json_path(profile, &output.destination);
            let hash = writer.render_hash(profile);
            let json = serde_json::to_string_pretty(&hash).context("Failed to serialize profile")?;
            super::write_output(&json, &super::OutputTarget::File(path.clone()), quiet)?;
            Ok(vec![path])
        }
    }
}

fn json_path(profile: &Profile, destination: &Path) -> PathBuf {
    if destination.is_dir() {
        let name = if profile.metadata.name.is_empty() {
            crate::config::DEFAULT_PROFILE_NAME
        } else {
            profile.metadata.name.as_str()
        };
        destination.join(format!("{name}.json"))
    } else {
        destination.to_path_buf()
    }
}

/// Write the captured benchmark attributes as a flat YAML map.
pub fn write_attributes(profile: &Profile, path: &Path, quiet: bool) -> Result<()> {
    if profile.attributes.is_empty() {
        tracing::warn!("No benchmark attributes captured; writing an empty attributes file");
    }
    let yaml = serde_yaml_ng::to_string(&profile.attributes).context("Failed to serialize attributes")?;
    super::write_output(&yaml, &super::OutputTarget::File(path.to_path_buf()), quiet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Control;
    use tempfile::TempDir;

    fn profile() -> Profile {
        let mut profile = Profile::new("rhel-8");
        profile
            .add_control(Control::new("V-1").with_title("One"))
            .unwrap();
        profile
            .add_control(Control::new("V-2").with_title("Two"))
            .unwrap();
        profile
            .attributes
            .insert("benchmark.title".to_string(), "RHEL 8".to_string());
        profile
    }

    #[test]
    fn test_write_ruby_profile() {
        let tmp = TempDir::new().unwrap();
        let output = ProfileOutput {
            format: ProfileFormat::Ruby,
            separate_files: true,
            destination: tmp.path().join("out"),
        };
        let written = write_profile(&profile(), &output, true).unwrap();
        assert_eq!(written.len(), 3);
        assert!(tmp.path().join("out/inspec.yml").is_file());
        assert!(tmp.path().join("out/controls/V-1.rb").is_file());
    }

    #[test]
    fn test_write_json_into_directory() {
        let tmp = TempDir::new().unwrap();
        let output = ProfileOutput {
            format: ProfileFormat::Json,
            separate_files: true,
            destination: tmp.path().to_path_buf(),
        };
        let written = write_profile(&profile(), &output, true).unwrap();
        assert_eq!(written, vec![tmp.path().join("rhel-8.json")]);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(value["controls"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_write_attributes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("attributes.yml");
        write_attributes(&profile(), &path, true).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.trim(), "benchmark.title: RHEL 8");
    }
}
