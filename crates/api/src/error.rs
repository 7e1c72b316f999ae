//! API Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.

use derive_more::{Display, Error};

/// An API error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Server base URL could not be parsed or uses an unsupported scheme
    #[display("invalid server URL: {_0}")]
    InvalidBaseUrl(#[error(not(source))] String),
    /// API token contains bytes that cannot be sent in an HTTP header
    #[display("API token is not a valid header value")]
    InvalidToken,
    /// Request never produced a response (DNS, connect, timeout, TLS)
    #[display("could not reach the server: {_0}")]
    Transport(#[error(not(source))] String),
    /// Credentials were missing or rejected (HTTP 401/403)
    #[display("server rejected the API token")]
    Unauthorized,
    /// Requested resource does not exist on the server (HTTP 404)
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Any other non-success HTTP status
    #[display("server returned HTTP {_0}")]
    Status(#[error(not(source))] u16),
    /// Response body was not the JSON shape this client expects
    #[display("could not decode server response")]
    Decode,
    /// String did not name a known entry status
    #[display("unknown entry status: {_0}")]
    InvalidStatus(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(status) => *status >= 500,
            _ => false,
        }
    }
}
