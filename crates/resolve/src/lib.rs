//! Merge rules for document updates.
//!
//! Updates for the same document (identified by its url) can arrive in any
//! order, and the transport may deliver the same update more than once. This
//! crate holds the rule that folds each incoming [`Update`](models::Update)
//! into the currently stored [`Document`](models::Document) so that, whatever
//! the arrival order, the stored record converges to:
//!
//! - `text` and `fetch_time` of the most recently *fetched* version, and
//! - `pub_date` and `first_fetch_time` of the earliest fetched version.
//!
//! [`resolve`] is pure: it performs no I/O and never fails. Persisting the
//! result atomically is the job of the store crate.

pub mod error;
pub mod models;
mod resolve;

pub use crate::resolve::{Change, Resolution, resolve};
