//! Service Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A processing error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a processing failure.
///
/// ### Input Errors
/// - [`ErrorKind::InvalidUpdate`]: rejected before touching the store; never
///   worth redelivering.
///
/// ### Dependency Errors
/// - [`ErrorKind::Store`]: the merge was rolled back. The store error it wraps
///   says whether redelivering the update might succeed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The message could not be turned into an
    /// [`Update`](updater_resolve::models::Update).
    #[display("invalid update")]
    InvalidUpdate,
    /// Applying the merge via the [store](updater_store::Repository) failed.
    #[display("failed to apply update to the store")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// By the time an error reaches this level the service has already used
    /// up its own retries.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
