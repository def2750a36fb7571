//! SQLite version store for merged document records.
//!
//! The store keeps exactly one row per url: the merged record produced by
//! [`updater_resolve::resolve`]. It is the sole writer of those rows.
//!
//! # Isolation
//! Merging is a read-modify-write. Two updates for the same url arriving at
//! the same time must never both read the same stored record and overwrite
//! each other's result. Every transaction handed out by
//! [`Repository::with_transaction`] is opened with `BEGIN IMMEDIATE`, which
//! takes the database write lock *before* the read: a concurrent writer waits
//! (up to the configured busy timeout) until the first one commits, and then
//! reads its committed result.
//!
//! The write lock covers the whole database, not a single url: merges for
//! *different* urls also take turns committing. Their work outside the
//! transaction (validation, decoding, publishing) still overlaps, but the
//! store admits one merge at a time.

mod db;
pub mod error;
mod models;
mod repo;
mod tx;

pub use crate::db::{Database, PoolSettings};
pub use crate::repo::Repository;
pub use crate::tx::Transaction;
