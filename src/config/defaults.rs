//! Default values shared by configuration and the CLI.

/// Directory name under the user config dir.
pub const CONFIG_DIR_NAME: &str = "compliance-tools";

/// Wrap width for imported CSV descriptions.
pub const DEFAULT_DESC_WIDTH: usize = 80;

/// Classification marking written into checklist `STIG_INFO`.
pub const DEFAULT_CKL_CLASSIFICATION: &str = "UNCLASSIFIED";

/// Profile name used when a converted benchmark names none.
pub const DEFAULT_PROFILE_NAME: &str = "compliance-profile";
