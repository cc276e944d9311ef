//! Font pipeline error types.
//!
//! Only [`FontError::Configuration`] aborts a build. Every other variant is
//! collected per asset and surfaces as a warning in the final report.

use std::path::PathBuf;
use thiserror::Error;

use super::asset::Lifecycle;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FontError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("`{}` not found", .0.display())]
    AssetNotFound(PathBuf),

    #[error("failed to subset `{name}`: {reason}")]
    SubsetFailure { name: String, reason: String },

    #[error("`{name}` is declared more than once with identical content, left unmatched")]
    AmbiguousMatch { name: String },

    #[error("`{name}` cannot move from {from} to {to}")]
    InvalidTransition {
        name: String,
        from: Lifecycle,
        to: Lifecycle,
    },

    #[error("output `{0}` was already rewritten")]
    OutputAlreadyWritten(String),
}

impl FontError {
    /// Whether this error must abort the build.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
