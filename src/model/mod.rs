//! The canonical compliance model.
//!
//! Every translator reads into or writes out of these types; nothing here
//! knows about XCCDF, CSV or CKL. A [`Profile`] holds [`Control`]s keyed by
//! id in discovery order, each with free text, a numeric impact on the
//! [`Severity`] scale, ordered tags and optional run results.

mod control;
mod metadata;
mod profile;
mod severity;

pub use control::*;
pub use metadata::*;
pub use profile::*;
pub use severity::*;
