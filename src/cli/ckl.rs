//! Checklist command handler.
//!
//! Implements `inspec2ckl`: run results plus host metadata into a STIG
//! Viewer checklist.

use crate::config::AppConfig;
use crate::model::HostMetadata;
use crate::parsers::InspecParser;
use crate::pipeline::{load_host_metadata, read_profile, write_output, OutputTarget, ReadOptions};
use crate::reports::{CklGenerator, CklStatus};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Options for `inspec2ckl`
#[derive(Debug, Clone, Default)]
pub struct CklOptions {
    /// `inspec exec --reporter json` output
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Host metadata JSON; falls back to `ckl.metadata`
    pub metadata: Option<PathBuf>,
    /// Values given on the command line override the metadata file
    pub host: HostMetadata,
}

/// Run the inspec2ckl command
#[allow(clippy::needless_pass_by_value)]
pub fn run_inspec2ckl(options: CklOptions, config: &AppConfig) -> Result<()> {
    let quiet = config.behavior.quiet;
    let parser = InspecParser::new().with_duplicate_policy(config.duplicate_policy());
    let read = ReadOptions {
        verbose: config.behavior.verbose,
        quiet,
    };
    let profile = read_profile(&options.input, &parser, read)?;
    if !profile.controls().any(|c| c.has_results()) {
        tracing::warn!(
            "{} has no results; every finding will be Not_Reviewed",
            options.input.display()
        );
    }

    let metadata_path = options.metadata.or_else(|| config.ckl.metadata.clone());
    let host = load_host_metadata(metadata_path.as_deref())
        .context("Failed to load checklist metadata")?
        .merged_with(&options.host);

    let checklist = CklGenerator::new()
        .with_classification(config.ckl.classification.clone())
        .generate(&profile, &host);

    if !quiet {
        tracing::info!(
            "Checklist: {} open, {} not a finding, {} not applicable, {} not reviewed",
            checklist.count(CklStatus::Open),
            checklist.count(CklStatus::NotAFinding),
            checklist.count(CklStatus::NotApplicable),
            checklist.count(CklStatus::NotReviewed),
        );
    }

    write_output(&checklist.to_xml(), &OutputTarget::from_option(options.output), quiet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RESULTS: &str = r#"{
        "platform": {"name": "rhel", "release": "8"},
        "profiles": [{
            "name": "rhel8-stig",
            "controls": [
                {"id": "V-1", "impact": 0.7, "title": "One",
                 "results": [{"status": "failed", "code_desc": "sshd", "message": "expected no"}]},
                {"id": "V-2", "impact": 0.5, "title": "Two",
                 "results": [{"status": "passed", "code_desc": "auditd"}]}
            ]
        }]
    }"#;

    #[test]
    fn test_inspec2ckl_writes_checklist() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("results.json");
        let metadata = tmp.path().join("metadata.json");
        let output = tmp.path().join("out.ckl");
        std::fs::write(&input, RESULTS).unwrap();
        std::fs::write(&metadata, r#"{"hostname": "from-file", "ip": "10.0.0.1"}"#).unwrap();

        let options = CklOptions {
            input,
            output: Some(output.clone()),
            metadata: Some(metadata),
            host: HostMetadata {
                hostname: Some("from-cli".to_string()),
                ..HostMetadata::default()
            },
        };
        run_inspec2ckl(options, &AppConfig::builder().quiet(true).build()).unwrap();

        let xml = std::fs::read_to_string(output).unwrap();
        assert!(xml.contains("<HOST_NAME>from-cli</HOST_NAME>"));
        assert!(xml.contains("<HOST_IP>10.0.0.1</HOST_IP>"));
        assert!(xml.contains("<STATUS>Open</STATUS>"));
        assert!(xml.contains("<STATUS>NotAFinding</STATUS>"));
    }
}
