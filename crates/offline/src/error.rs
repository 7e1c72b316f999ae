//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! Image validation failures are deliberately fine-grained: they end up in
//! the per-image failure notes a user sees, so "too large" and "wrong
//! content-type" must stay distinguishable.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Request never produced a usable response
    #[display("transfer failed: {_0}")]
    Transport(#[error(not(source))] String),
    /// Image URL answered with a non-200 status
    #[display("unexpected HTTP status {_0}")]
    BadStatus(#[error(not(source))] u16),
    /// Response declared a content-type that is not an image
    #[display("not an image content-type: {_0}")]
    BadContentType(#[error(not(source))] String),
    /// Body smaller than any real image can be
    #[display("image too small ({_0} bytes)")]
    TooSmall(#[error(not(source))] u64),
    /// Body exceeded the size ceiling
    #[display("image too large (over {_0} bytes)")]
    TooLarge(#[error(not(source))] u64),
    /// Body size did not match the declared content-length
    #[display("received {actual} bytes, expected {expected}")]
    LengthMismatch { expected: u64, actual: u64 },
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Entry carries no ID, so it has no place in the library
    #[display("entry is missing a valid identifier")]
    InvalidEntryId,
    /// Entry has neither content nor summary to render
    #[display("entry {_0} has no content to download")]
    EmptyEntry(#[error(not(source))] i64),
    /// Entry directory could not be created
    #[display("failed to prepare the entry directory")]
    Prepare,
    /// Rendered document could not be written
    #[display("failed to save the offline document")]
    WriteDocument,
    /// Metadata sidecar could not be written
    #[display("failed to save entry metadata")]
    Sidecar,
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Io(_) => true,
            Self::BadStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::BadStatus(404).to_string(),
            "unexpected HTTP status 404"
        );
        assert_eq!(
            ErrorKind::TooSmall(4).to_string(),
            "image too small (4 bytes)"
        );
        assert_eq!(
            ErrorKind::TooLarge(52_428_800).to_string(),
            "image too large (over 52428800 bytes)"
        );
        assert_eq!(
            ErrorKind::LengthMismatch { expected: 10, actual: 7 }.to_string(),
            "received 7 bytes, expected 10"
        );
    }

    #[test]
    fn test_value_carrying_kinds_have_no_source() {
        assert!(ErrorKind::BadStatus(500).source().is_none());
        assert!(ErrorKind::TooSmall(1).source().is_none());
        assert!(ErrorKind::TooLarge(1).source().is_none());
        assert!(ErrorKind::Transport("reset".into()).source().is_none());

        let io = ErrorKind::from(IoError::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.source().is_some());
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::Transport("timed out".into()).is_retryable());
        assert!(ErrorKind::BadStatus(503).is_retryable());
        assert!(!ErrorKind::BadStatus(404).is_retryable());
        assert!(!ErrorKind::TooLarge(1).is_retryable());
        assert!(!ErrorKind::EmptyEntry(7).is_retryable());
    }
}
