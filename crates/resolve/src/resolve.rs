//! Version Merging

use crate::models::{Document, Update};
use tracing::trace;

/// What merging an update did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Nothing was stored for the url; the update became the record.
    Created,
    /// The update was merged into an existing record.
    Merged {
        /// The update was fetched later than anything seen so far, so its
        /// `text` and `fetch_time` were adopted.
        newer_content: bool,
        /// The update was fetched earlier than anything seen so far, so its
        /// `pub_date` and `fetch_time` (as `first_fetch_time`) were adopted.
        earlier_origin: bool,
    },
}
impl Change {
    /// Returns `true` when the merge left the existing record untouched.
    ///
    /// This covers redelivered duplicates as well as versions fetched strictly
    /// between the earliest and the latest known versions.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Merged { newer_content: false, earlier_origin: false })
    }
}

/// The merged record, plus a description of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub document: Document,
    pub change: Change,
}
impl Resolution {
    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Merge an incoming update into the record currently stored for its url.
///
/// `existing` must be a previously resolved record for the same url, or `None`
/// if nothing has been stored yet. The two halves of the record are decided
/// independently:
///
/// 1. If `incoming` was fetched *after* the stored latest version, its `text`
///    and `fetch_time` replace the stored ones (newer content wins).
/// 2. If `incoming` was fetched *before* the stored earliest version, its
///    `pub_date` replaces the stored one and `first_fetch_time` moves back to
///    its `fetch_time` (earlier origin wins).
///
/// Both comparisons are strict, so redelivering an update that has already
/// been merged changes nothing. Since each half is a plain min/max over
/// `fetch_time`, folding any permutation of the same updates (duplicates
/// included) yields the same record.
pub fn resolve(existing: Option<Document>, incoming: &Update) -> Resolution {
    let Some(mut document) = existing else {
        trace!(url = %incoming.url, fetch_time = incoming.fetch_time, "first version of document");
        return Resolution {
            document: Document::first(incoming),
            change: Change::Created,
        };
    };
    debug_assert_eq!(document.url, incoming.url, "merging versions of different documents");

    let newer_content = incoming.fetch_time > document.fetch_time;
    let earlier_origin = incoming.fetch_time < document.first_fetch_time;
    if newer_content {
        document.fetch_time = incoming.fetch_time;
        document.text.clone_from(&incoming.text);
    }
    if earlier_origin {
        document.pub_date = incoming.pub_date;
        document.first_fetch_time = incoming.fetch_time;
    }
    trace!(
        url = %incoming.url,
        fetch_time = incoming.fetch_time,
        newer_content,
        earlier_origin,
        "merged version into document"
    );
    Resolution {
        document,
        change: Change::Merged { newer_content, earlier_origin },
    }
}
