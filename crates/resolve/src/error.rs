//! Resolve Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A validation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A field the merge depends on was absent (or empty) on the incoming message.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A timestamp on the incoming message is larger than [`MAX_TIMESTAMP`](crate::models::MAX_TIMESTAMP).
    #[display("timestamp out of range: {_0}")]
    OutOfRange(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A malformed message stays malformed no matter how often it is redelivered.
        false
    }
}
