//! Summary and threshold tests against a recorded InSpec run.

use compliance_tools::cli::{run_compliance, AppConfig, ThresholdSource};
use compliance_tools::compliance::{evaluate, summarize, threshold, SummaryReport, ThresholdSpec};
use compliance_tools::model::{ResultStatus, Severity};
use compliance_tools::parsers::{InspecParser, ProfileParser};
use compliance_tools::pipeline::exit_codes;
use std::path::Path;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn report() -> SummaryReport {
    let profile = InspecParser::new()
        .parse(&fixture_path("inspec/results.json"))
        .expect("Failed to parse results")
        .into_profile();
    summarize(&profile)
}

fn spec(yaml: &str) -> ThresholdSpec {
    ThresholdSpec::from_yaml_str(yaml).expect("valid threshold")
}

mod summary {
    use super::*;

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.name, "rhel-8-stig-baseline");
        assert_eq!(report.total_controls, 5);
        assert_eq!(report.scored, 3);
        assert_eq!(report.not_run, 1);
        assert_eq!(report.no_impact, 1);
        assert_eq!(report.count(ResultStatus::Passed), 2);
        assert_eq!(report.count(ResultStatus::Failed), 1);
        assert_eq!(report.count(ResultStatus::Error), 0);
        assert!((report.compliance - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_buckets_only_for_scored() {
        let report = report();
        let severities: Vec<&str> = report.severity_totals.keys().map(String::as_str).collect();
        assert_eq!(severities, ["high", "medium"]);
        assert_eq!(report.bucket(ResultStatus::Failed, Severity::High), Some(1));
        assert_eq!(report.bucket(ResultStatus::Passed, Severity::Medium), Some(2));
        // The only low control never ran
        assert_eq!(report.bucket(ResultStatus::Passed, Severity::Low), None);
    }
}

mod thresholds {
    use super::*;

    #[test]
    fn test_passing_file() {
        let spec = ThresholdSpec::from_file(&fixture_path("thresholds/passing.yml")).unwrap();
        assert_eq!(spec.len(), 3);
        assert!(threshold(&report(), &spec));
    }

    #[test]
    fn test_failing_file_reports_each_clause() {
        let spec = ThresholdSpec::from_file(&fixture_path("thresholds/failing.yml")).unwrap();
        let outcomes = evaluate(&report(), &spec);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.met));
        assert_eq!(outcomes[1].actual, Some(1.0));
    }

    #[test]
    fn test_key_spellings_agree() {
        let report = report();
        for yaml in [
            "failed.high.max: 1",
            "failed_high_max: 1",
            "high_failed.max: 1",
            "failed:\n  high:\n    max: 1",
        ] {
            assert!(threshold(&report, &spec(yaml)), "{yaml}");
        }
    }

    #[test]
    fn test_bare_number_is_minimum_percentage() {
        let report = report();
        assert!(threshold(&report, &spec("passed: 66")));
        assert!(!threshold(&report, &spec("passed: 67")));
    }

    #[test]
    fn test_absent_severity_never_matches() {
        let outcomes = evaluate(&report(), &spec("failed.critical.max: 5"));
        assert_eq!(outcomes[0].actual, None);
        assert!(!outcomes[0].met);
    }

    #[test]
    fn test_unknown_category_never_matches() {
        assert!(!threshold(&report(), &spec("warnings.max: 100")));
    }

    #[test]
    fn test_empty_spec_rejected() {
        assert!(ThresholdSpec::from_yaml_str("{}").is_err());
        assert!(ThresholdSpec::from_yaml_str("- 1\n- 2").is_err());
    }
}

mod exit_status {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::builder().quiet(true).build()
    }

    #[test]
    fn test_met_threshold_exits_zero() {
        let code = run_compliance(
            &fixture_path("inspec/results.json"),
            Some(ThresholdSource::File(fixture_path("thresholds/passing.yml"))),
            &config(),
        )
        .unwrap();
        assert_eq!(code, exit_codes::SUCCESS);
    }

    #[test]
    fn test_unmet_threshold_exits_one() {
        let code = run_compliance(
            &fixture_path("inspec/results.json"),
            Some(ThresholdSource::File(fixture_path("thresholds/failing.yml"))),
            &config(),
        )
        .unwrap();
        assert_eq!(code, exit_codes::THRESHOLD_NOT_MET);
    }

    #[test]
    fn test_inline_threshold() {
        let code = run_compliance(
            &fixture_path("inspec/results.json"),
            Some(ThresholdSource::Inline("{compliance.min: 50, error.max: 0}".to_string())),
            &config(),
        )
        .unwrap();
        assert_eq!(code, exit_codes::SUCCESS);
    }

    #[test]
    fn test_missing_threshold_file_is_error() {
        let result = run_compliance(
            &fixture_path("inspec/results.json"),
            Some(ThresholdSource::File(fixture_path("thresholds/absent.yml"))),
            &config(),
        );
        assert!(result.is_err());
    }
}
