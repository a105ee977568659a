//! **A library for converting security compliance artifacts.**
//!
//! `compliance-tools` translates between the document formats used in
//! security auditing: SCAP/XCCDF benchmarks, InSpec profiles and run
//! results, spreadsheet (CSV) exports, DISA STIG Viewer checklists (CKL) and
//! text extracted from CIS benchmark PDFs. It also summarizes run results and
//! checks them against compliance thresholds.
//!
//! Every format is read into, and written out of, one canonical model. Tag
//! renames, multi-valued fields, column layouts and host metadata are all
//! resolved at the format boundary, so no translator knows about another.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: [`Profile`], [`Control`], [`Severity`] and the metadata
//!   records. No format-specific concepts live here.
//! - **[`mapping`]**: [`TagMapper`] for tag renames plus the CSV import and
//!   export column mappings.
//! - **[`parsers`]**: XCCDF, InSpec JSON, CSV and CIS text readers. Each
//!   returns a [`ParseOutcome`] carrying record-level diagnostics.
//! - **[`reports`]**: CKL, XCCDF, CSV and InSpec writers.
//! - **[`compliance`]**: result summaries and threshold evaluation.
//! - **[`pipeline`]** and **[`cli`]**: the read → convert → write steps the
//!   `compliance-tools` binary is built from.
//!
//! ## Getting Started: XCCDF to InSpec
//!
//! ```no_run
//! use compliance_tools::parsers::{ProfileParser, XccdfParser};
//! use compliance_tools::reports::InspecWriter;
//! use compliance_tools::TagMapper;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = XccdfParser::new()
//!         .with_tag_mapper(TagMapper::from_pairs([("rid", "rule_id")]));
//!     let outcome = parser.parse(Path::new("U_RHEL_8_STIG_Manual-xccdf.xml"))?;
//!     for diagnostic in outcome.warnings() {
//!         eprintln!("{diagnostic}");
//!     }
//!
//!     let files = InspecWriter::new().render_ruby(&outcome.profile)?;
//!     files.write_to(Path::new("rhel8-profile"))?;
//!     Ok(())
//! }
//! ```
//!
//! ### Results to a checklist
//!
//! ```no_run
//! use compliance_tools::parsers::{InspecParser, ProfileParser};
//! use compliance_tools::reports::CklGenerator;
//! use compliance_tools::model::{HostMetadata, MetadataRecord};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = InspecParser::new().parse(Path::new("results.json"))?.into_profile();
//!     let host = HostMetadata::from_record(&MetadataRecord::from_file(Path::new("metadata.json"))?);
//!
//!     let checklist = CklGenerator::new().generate(&profile, &host);
//!     std::fs::write("results.ckl", checklist.to_xml())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Gating on a threshold
//!
//! ```no_run
//! use compliance_tools::compliance::{summarize, threshold, ThresholdSpec};
//! use compliance_tools::parsers::{InspecParser, ProfileParser};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = InspecParser::new().parse(Path::new("results.json"))?.into_profile();
//!     let spec = ThresholdSpec::from_yaml_str("compliance.min: 80\nfailed.critical.max: 0")?;
//!
//!     let report = summarize(&profile);
//!     println!("{:.1}% compliant, threshold met: {}", report.compliance, threshold(&report, &spec));
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Percentages and impact math cast counts to f64; values stay small
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::struct_excessive_bools,
    clippy::similar_names
)]

pub mod cli;
pub mod compliance;
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod reports;

// Re-export main types for convenience
pub use compliance::{summarize, threshold, SummaryReport, ThresholdSpec};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, Validatable};
pub use error::{ConvertError, ErrorContext, Result};
pub use mapping::{CsvExportMapping, CsvMapping, TagMapper};
pub use model::{
    Control, DuplicatePolicy, HostMetadata, MetadataRecord, Profile, ResultRecord, ResultStatus,
    Severity, TagValue,
};
pub use parsers::{parse_profile, parse_profile_str, Diagnostic, ParseOutcome, ProfileParser};
pub use reports::{CklGenerator, CsvWriter, InspecWriter, ProfileWriter, XccdfWriter};
