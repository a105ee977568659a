//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler implements the business logic for a specific CLI subcommand.

mod ckl;
mod compliance;
mod csv;
mod generate;
mod pdf;
mod xccdf;

pub use self::csv::{run_csv2inspec, run_inspec2csv, CsvExportOptions, CsvImportOptions};
pub use ckl::{run_inspec2ckl, CklOptions};
pub use compliance::{run_compliance, run_summary, SummaryFormat, ThresholdSource};
pub use generate::{run_generate_ckl_metadata, run_generate_inspec_metadata, run_generate_map};
pub use pdf::{run_pdf2inspec, PdfImportOptions};
pub use xccdf::{run_inspec2xccdf, run_xccdf2inspec, XccdfExportOptions, XccdfImportOptions};

// Re-export config types used by handlers
pub use crate::config::AppConfig;
