//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Figment could not assemble the layered configuration
    #[display("failed to load configuration")]
    Load,
    /// A value was present but unusable
    #[display("invalid configuration value for '{field}': {value}")]
    Invalid {
        field: &'static str,
        value: String,
    },
    /// No home directory, so platform default paths cannot be derived
    #[display("could not determine platform directories; set paths explicitly")]
    NoProjectDirs,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
