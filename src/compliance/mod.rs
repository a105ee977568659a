//! Result summaries and compliance thresholds.
//!
//! [`summarize`] folds a profile's recorded results into a
//! [`SummaryReport`]; [`threshold`] decides whether that report meets a
//! [`ThresholdSpec`].
//!
//! ```no_run
//! use compliance_tools::compliance::{summarize, threshold, ThresholdSpec};
//! use compliance_tools::parsers::parse_profile;
//! use std::path::Path;
//!
//! let profile = parse_profile(Path::new("results.json")).unwrap().profile;
//! let report = summarize(&profile);
//! let spec = ThresholdSpec::from_yaml_str("compliance.min: 80").unwrap();
//! println!("{:.1}% compliant, threshold met: {}", report.compliance, threshold(&report, &spec));
//! ```

mod summary;
mod threshold;

pub use summary::{summarize, ControlStatus, ControlSummary, StatusBreakdown, SummaryReport};
pub use threshold::{evaluate, threshold, Bound, ClauseOutcome, ThresholdClause, ThresholdSpec};
