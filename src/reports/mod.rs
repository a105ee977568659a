//! Writers that turn a [`Profile`] into external documents.
//!
//! - CKL: DISA STIG Viewer checklist with host metadata and finding status
//! - XCCDF: benchmark XML, header filled from a template
//! - CSV: spreadsheet export through an export column mapping
//! - InSpec: profile source tree or JSON hash
//!
//! # Security
//!
//! Every value taken from a profile goes through the `escape` helpers before
//! it is embedded in XML or Ruby source.

mod ckl;
mod csv;
pub mod escape;
mod inspec;
mod types;
mod xccdf;

pub use self::csv::{render as render_csv_rows, render_string as render_csv_string, CsvWriter};
pub use ckl::{CklDocument, CklGenerator, CklStatus, CklVuln};
pub use inspec::{InspecWriter, ProfileFiles};
pub use types::{ProfileFormat, ReportFormat};
pub use xccdf::XccdfWriter;

use crate::error::{ConvertError, Result};
use crate::model::Profile;
use std::io::Write;

/// Trait for single-document profile writers
pub trait ProfileWriter {
    /// Render the whole document
    fn render(&self, profile: &Profile) -> Result<String>;

    /// Write the document to a writer
    fn write_to(&self, profile: &Profile, writer: &mut dyn Write) -> Result<()> {
        let document = self.render(profile)?;
        writer
            .write_all(document.as_bytes())
            .map_err(|e| ConvertError::Io {
                path: None,
                message: format!("writing {} output", self.format()),
                source: e,
            })
    }

    /// Get the format this writer produces
    fn format(&self) -> ReportFormat;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Control;

    #[test]
    fn test_write_to_buffer() {
        let mut profile = Profile::new("p");
        profile.add_control(Control::new("V-1")).unwrap();
        let mut buf = Vec::new();
        CsvWriter::default().write_to(&profile, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("VulnID,"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_formats() {
        assert_eq!(XccdfWriter::new().format(), ReportFormat::Xccdf);
        assert_eq!(InspecWriter::new().format().to_string(), "inspec-json");
    }
}
