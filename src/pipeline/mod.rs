//! Pipeline orchestration for conversions.
//!
//! This module provides the shared read → convert → write steps used by the
//! CLI command handlers, so each handler only wires options together.

mod output;
mod parse;
mod profile_stage;

pub use output::{write_output, OutputTarget};
pub use parse::{load_host_metadata, load_profile_metadata, read_profile, ReadOptions};
pub use profile_stage::{write_attributes, write_profile, ProfileOutput};

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Success (or compliance threshold met)
    pub const SUCCESS: i32 = 0;
    /// Compliance threshold not met, or no threshold given
    pub const THRESHOLD_NOT_MET: i32 = 1;
    /// An error occurred
    pub const ERROR: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::THRESHOLD_NOT_MET, 1);
        assert_eq!(exit_codes::ERROR, 3);
    }
}
