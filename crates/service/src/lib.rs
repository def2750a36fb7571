//! # Updater Service
//!
//! Applies incoming document updates to the version store. Each update is
//! merged into the stored record for its url inside one store transaction
//! (read, [resolve](updater_resolve::resolve), write), and the merged record is
//! handed back for publication.
//!
//! Updates may arrive in any order and any number of times: the stored record
//! for a url depends only on the set of updates applied to it.

pub mod error;
mod process;
mod stream;

pub use crate::process::{Options, Updater};
pub use crate::stream::{Event, process_stream};
