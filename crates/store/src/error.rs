//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Query failures carry the name of the store operation that failed (`begin`,
/// `get_by_url`, `upsert`, `commit`, ...).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Another transaction held the write lock for longer than the busy timeout.
    #[display("database busy during {_0}")]
    Busy(#[error(not(source))] &'static str),
    /// The connection (or the pool handing them out) is unusable.
    #[display("database connection failed during {_0}")]
    Connection(#[error(not(source))] &'static str),
    #[display("constraint violated during {_0}")]
    Constraint(#[error(not(source))] &'static str),
    #[display("database error during {_0}")]
    Database(#[error(not(source))] &'static str),
    #[display("database migration error")]
    Migration,
    /// A value could not be converted between its model and row representation.
    #[display("invalid store data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// A stored record breaks the merge invariants. Never patched silently.
    #[display("stored record for {_0} violates merge invariants")]
    Integrity(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Connection(_))
    }

    /// Classify a query failure, keeping the original sqlx error as a child
    /// in the error tree.
    #[track_caller]
    pub(crate) fn sqlx(operation: &'static str, err: sqlx::Error) -> Error {
        let kind = match &err {
            sqlx::Error::Database(db) if is_lock_contention(db.code().as_deref()) => Self::Busy(operation),
            sqlx::Error::Database(db)
                if matches!(
                    db.kind(),
                    sqlx::error::ErrorKind::UniqueViolation
                        | sqlx::error::ErrorKind::ForeignKeyViolation
                        | sqlx::error::ErrorKind::NotNullViolation
                        | sqlx::error::ErrorKind::CheckViolation
                ) =>
            {
                Self::Constraint(operation)
            },
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::Connection(operation)
            },
            _ => Self::Database(operation),
        };
        exn::Exn::new(err).raise(kind)
    }
}

/// SQLite reports lock contention as `SQLITE_BUSY` (5) or `SQLITE_LOCKED` (6),
/// possibly as an extended code whose low byte is the primary code.
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok()).is_some_and(|c| matches!(c & 0xff, 5 | 6))
}
