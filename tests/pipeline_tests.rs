//! Tests for the command handlers.
//!
//! Each test runs a handler the way `main` would, writing into a temporary
//! directory, and reads the produced files back.

use compliance_tools::cli::{
    run_csv2inspec, run_generate_ckl_metadata, run_generate_inspec_metadata, run_generate_map,
    run_inspec2ckl, run_inspec2csv, run_inspec2xccdf, run_pdf2inspec, run_summary,
    run_xccdf2inspec, AppConfig, CklOptions, CsvExportOptions, CsvImportOptions,
    PdfImportOptions, SummaryFormat, XccdfExportOptions, XccdfImportOptions,
};
use compliance_tools::model::HostMetadata;
use compliance_tools::parsers::{InspecParser, ProfileParser, XccdfParser};
use compliance_tools::reports::ProfileFormat;
use compliance_tools::CsvMapping;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn quiet() -> AppConfig {
    AppConfig::builder().quiet(true).build()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

// ============================================================================
// xccdf2inspec / inspec2xccdf
// ============================================================================

mod xccdf_commands {
    use super::*;

    fn import_options(output: PathBuf) -> XccdfImportOptions {
        XccdfImportOptions {
            input: fixture_path("xccdf/demo-stig.xml"),
            output,
            format: None,
            single_file: false,
            replace_tags: Vec::new(),
            replace_tags_file: None,
            attributes: None,
            metadata: None,
        }
    }

    #[test]
    fn test_writes_profile_tree() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("rhel8");
        run_xccdf2inspec(import_options(out.clone()), &quiet()).unwrap();

        assert!(out.join("inspec.yml").is_file());
        assert!(out.join("controls/V-230221.rb").is_file());
        assert!(out.join("controls/V-230222.rb").is_file());
    }

    #[test]
    fn test_replace_tags_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("rhel8");
        let mut options = import_options(out.clone());
        options.replace_tags = vec!["rid=rule_id".to_string()];
        options.metadata = Some(fixture_path("metadata/inspec-metadata.json"));
        run_xccdf2inspec(options, &quiet()).unwrap();

        let yml = read(&out.join("inspec.yml"));
        assert!(yml.contains("maintainer: Platform Security Team"));
        assert!(yml.contains("version: 0.3.0"));
        let control = read(&out.join("controls/V-230221.rb"));
        assert!(control.contains("tag rule_id: 'SV-230221r743913_rule'"));
        assert!(!control.contains("tag rid:"));
    }

    #[test]
    fn test_config_renames_lose_to_cli() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("profile.json");
        let config = AppConfig::builder()
            .quiet(true)
            .replace_tag("rid", "from_config")
            .build();
        let mut options = import_options(out.clone());
        options.format = Some(ProfileFormat::Json);
        options.replace_tags = vec!["rid=from_cli".to_string()];
        run_xccdf2inspec(options, &config).unwrap();

        let profile = InspecParser::new().parse(&out).unwrap().into_profile();
        let control = profile.control("V-230221").unwrap();
        assert!(control.tag("from_cli").is_some());
        assert!(control.tag("from_config").is_none());
    }

    #[test]
    fn test_attributes_file_written() {
        let tmp = TempDir::new().unwrap();
        let attributes = tmp.path().join("attributes.yml");
        let mut options = import_options(tmp.path().join("rhel8"));
        options.attributes = Some(attributes.clone());
        run_xccdf2inspec(options, &quiet()).unwrap();

        let text = read(&attributes);
        assert!(text.contains("benchmark.id: RHEL_8_STIG"));
        assert!(text.contains("reference.dc.publisher: DISA"));
    }

    #[test]
    fn test_round_trip_with_attributes() {
        let tmp = TempDir::new().unwrap();
        let json = tmp.path().join("profile.json");
        let attributes = tmp.path().join("attributes.yml");
        let mut options = import_options(json.clone());
        options.format = Some(ProfileFormat::Json);
        options.attributes = Some(attributes.clone());
        run_xccdf2inspec(options, &quiet()).unwrap();

        let xml = tmp.path().join("out.xml");
        run_inspec2xccdf(
            XccdfExportOptions {
                input: json,
                attributes: Some(attributes),
                output: Some(xml.clone()),
            },
            &quiet(),
        )
        .unwrap();

        let profile = XccdfParser::new().parse(&xml).unwrap().into_profile();
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.metadata.name, "RHEL_8_STIG");
        assert_eq!(
            profile.attributes.get("reference.dc.source").map(String::as_str),
            Some("STIG.DOD.MIL")
        );
    }

    #[test]
    fn test_missing_input_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut options = import_options(tmp.path().join("out"));
        options.input = tmp.path().join("absent.xml");
        let err = run_xccdf2inspec(options, &quiet()).unwrap_err();
        assert!(format!("{err:#}").contains("absent.xml"));
    }
}

// ============================================================================
// csv2inspec / inspec2csv
// ============================================================================

mod csv_commands {
    use super::*;

    #[test]
    fn test_csv_to_json_profile() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("profile.json");
        run_csv2inspec(
            CsvImportOptions {
                input: fixture_path("csv/stig-viewer.csv"),
                output: out.clone(),
                mapping: None,
                format: Some(ProfileFormat::Json),
                single_file: false,
                replace_tags: Vec::new(),
                metadata: None,
            },
            &quiet(),
        )
        .unwrap();

        let profile = InspecParser::new().parse(&out).unwrap().into_profile();
        assert_eq!(profile.metadata.name, "stig-viewer");
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.control("V-230222").unwrap().fix, "Install security patches.");
    }

    #[test]
    fn test_mapping_from_config() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("trimmed");
        let config = AppConfig::builder()
            .quiet(true)
            .csv_mapping(Some(fixture_path("csv/mapping.yml")))
            .build();
        run_csv2inspec(
            CsvImportOptions {
                input: fixture_path("csv/trimmed.csv"),
                output: out.clone(),
                mapping: None,
                format: None,
                single_file: true,
                replace_tags: Vec::new(),
                metadata: None,
            },
            &config,
        )
        .unwrap();

        let body = read(&out.join("controls/trimmed.rb"));
        assert!(body.contains("control 'APP-001' do"));
        assert!(body.contains("control 'APP-002' do"));
    }

    #[test]
    fn test_export_with_status() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("results.csv");
        run_inspec2csv(
            CsvExportOptions {
                input: fixture_path("inspec/results.json"),
                output: Some(out.clone()),
                export_mapping: None,
                with_status: true,
            },
            &quiet(),
        )
        .unwrap();

        let rows = compliance_tools::parsers::CsvParser::read_rows(&read(&out)).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].last().map(String::as_str), Some("Status"));
        assert_eq!(rows[1].last().map(String::as_str), Some("failed"));
        assert_eq!(rows[5].last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_export_mapping_file() {
        let tmp = TempDir::new().unwrap();
        let mapping = tmp.path().join("export.yml");
        std::fs::write(
            &mapping,
            "delimiter: \"|\"\ncolumns:\n  - {header: ID, field: id}\n  - {header: CCIs, field: tags.cci}\n",
        )
        .unwrap();
        let out = tmp.path().join("out.csv");
        run_inspec2csv(
            CsvExportOptions {
                input: fixture_path("inspec/results.json"),
                output: Some(out.clone()),
                export_mapping: Some(mapping),
                with_status: false,
            },
            &quiet(),
        )
        .unwrap();

        let text = read(&out);
        assert!(text.starts_with("ID,CCIs\n"));
        assert!(text.contains("V-230222,CCI-000366|CCI-001227"));
    }

    #[test]
    fn test_exported_csv_imports_again() {
        let tmp = TempDir::new().unwrap();
        let csv_path = tmp.path().join("export.csv");
        run_inspec2csv(
            CsvExportOptions {
                input: fixture_path("inspec/profile.json"),
                output: Some(csv_path.clone()),
                export_mapping: None,
                with_status: false,
            },
            &quiet(),
        )
        .unwrap();

        // Default export column order: id, stig_id, rid, severity, impact, cci, nist, title, desc, check, fix
        let mapping = CsvMapping::from_yaml_str(
            "control.id: 0\ncontrol.title: 7\ncontrol.desc: 8\ncontrol.impact: 4\ncontrol.tags:\n  stig_id: 1\n  rid: 2\n  cci: 5\n  check: 9\n  fix: 10\n",
        )
        .unwrap();
        let profile = compliance_tools::parsers::CsvParser::new(mapping)
            .parse(&csv_path)
            .unwrap()
            .into_profile();
        let control = profile.control("V-13688").unwrap();
        assert_eq!(control.title, "Log files must consist of the required data fields.");
        assert!((control.impact - 0.3).abs() < f64::EPSILON);
        assert_eq!(control.tag("cci").map(|t| t.values().len()), Some(2));
        assert_eq!(control.check, "Check the log_format directive in nginx.conf.");
    }
}

// ============================================================================
// inspec2ckl
// ============================================================================

mod ckl_commands {
    use super::*;

    #[test]
    fn test_checklist_with_metadata_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("results.ckl");
        run_inspec2ckl(
            CklOptions {
                input: fixture_path("inspec/results.json"),
                output: Some(out.clone()),
                metadata: Some(fixture_path("metadata/ckl-metadata.json")),
                host: HostMetadata::default(),
            },
            &quiet(),
        )
        .unwrap();

        let xml = read(&out);
        assert!(xml.contains("<HOST_NAME>web01.example.com</HOST_NAME>"));
        assert!(xml.contains("<HOST_MAC>00:1B:44:11:3A:B7</HOST_MAC>"));
        assert_eq!(xml.matches("<VULN>").count(), 5);
        assert!(xml.contains("<STATUS>Not_Applicable</STATUS>"));
    }

    #[test]
    fn test_cli_host_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("results.ckl");
        let host = HostMetadata {
            ip: Some("192.168.1.50".to_string()),
            ..HostMetadata::default()
        };
        run_inspec2ckl(
            CklOptions {
                input: fixture_path("inspec/results.json"),
                output: Some(out.clone()),
                metadata: Some(fixture_path("metadata/ckl-metadata.json")),
                host,
            },
            &quiet(),
        )
        .unwrap();

        let xml = read(&out);
        assert!(xml.contains("<HOST_IP>192.168.1.50</HOST_IP>"));
        assert!(xml.contains("<HOST_NAME>web01.example.com</HOST_NAME>"));
    }
}

// ============================================================================
// pdf2inspec
// ============================================================================

mod pdf_commands {
    use super::*;

    #[test]
    fn test_cis_text_to_ruby_profile() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("cis");
        run_pdf2inspec(
            PdfImportOptions {
                input: fixture_path("cis/benchmark.txt"),
                output: out.clone(),
                name: Some("cis-ubuntu".to_string()),
                format: None,
                single_file: false,
                metadata: None,
            },
            &quiet(),
        )
        .unwrap();

        assert!(read(&out.join("inspec.yml")).contains("name: cis-ubuntu"));
        let control = read(&out.join("controls/1.1.1.1.rb"));
        assert!(control.contains("impact 0.5"));
        assert!(control.contains("tag cis_rid: '1.1.1.1'"));
        assert!(read(&out.join("controls/1.1.2.rb")).contains("impact 0.0"));
    }
}

// ============================================================================
// Generators and summary
// ============================================================================

mod generator_commands {
    use super::*;

    #[test]
    fn test_generated_map_drives_import() {
        let tmp = TempDir::new().unwrap();
        let map = tmp.path().join("mapping.yml");
        run_generate_map(Some(map.clone()), true).unwrap();

        let out = tmp.path().join("profile.json");
        run_csv2inspec(
            CsvImportOptions {
                input: fixture_path("csv/stig-viewer.csv"),
                output: out.clone(),
                mapping: Some(map),
                format: Some(ProfileFormat::Json),
                single_file: false,
                replace_tags: Vec::new(),
                metadata: None,
            },
            &quiet(),
        )
        .unwrap();
        let profile = InspecParser::new().parse(&out).unwrap().into_profile();
        assert_eq!(profile.len(), 3);
    }

    #[test]
    fn test_ckl_metadata_template_feeds_checklist() {
        let tmp = TempDir::new().unwrap();
        let metadata = tmp.path().join("metadata.json");
        run_generate_ckl_metadata(
            &[("hostname", Some("db02".to_string())), ("role", Some("Database".to_string()))],
            Some(metadata.clone()),
            true,
        )
        .unwrap();

        let out = tmp.path().join("results.ckl");
        run_inspec2ckl(
            CklOptions {
                input: fixture_path("inspec/results.json"),
                output: Some(out.clone()),
                metadata: Some(metadata),
                host: HostMetadata::default(),
            },
            &quiet(),
        )
        .unwrap();
        let xml = read(&out);
        assert!(xml.contains("<HOST_NAME>db02</HOST_NAME>"));
        assert!(xml.contains("<ROLE>Database</ROLE>"));
    }

    #[test]
    fn test_inspec_metadata_template() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inspec-metadata.json");
        run_generate_inspec_metadata(
            &[("maintainer", Some("Ops".to_string()))],
            Some(path.clone()),
            true,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&read(&path)).unwrap();
        assert_eq!(value["maintainer"], "Ops");
        assert_eq!(value["license"], "");
    }

    #[test]
    fn test_summary_json() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("summary.json");
        run_summary(
            &fixture_path("inspec/results.json"),
            SummaryFormat::Json,
            Some(out.clone()),
            &quiet(),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&read(&out)).unwrap();
        assert_eq!(value["scored"], 3);
        assert_eq!(value["not_run"], 1);
        assert_eq!(value["no_impact"], 1);
        assert_eq!(value["statuses"]["failed"]["by_severity"]["high"], 1);
    }
}
