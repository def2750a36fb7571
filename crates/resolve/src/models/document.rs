use super::{Message, Update};
use crate::resolve::resolve;

/// The merged record kept for a url.
///
/// Combines the *latest* fetched version (`text`, `fetch_time`) with the
/// *earliest* fetched version (`pub_date`, `first_fetch_time`). For every url,
/// after any sequence of updates in any order:
///
/// - `first_fetch_time` is the smallest `fetch_time` ever seen,
/// - `fetch_time` is the largest `fetch_time` ever seen,
/// - `text` belongs to the update with the largest `fetch_time`,
/// - `pub_date` belongs to the update with the smallest `fetch_time` (not
///   necessarily the smallest `pub_date`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub pub_date: u64,
    pub fetch_time: u64,
    pub first_fetch_time: u64,
    pub text: String,
}
impl AsRef<Document> for Document {
    fn as_ref(&self) -> &Document {
        self
    }
}
impl Document {
    /// Record created from the very first update seen for a url: the update is
    /// both the earliest and the latest version.
    pub fn first(update: &Update) -> Self {
        Self {
            url: update.url.clone(),
            pub_date: update.pub_date,
            fetch_time: update.fetch_time,
            first_fetch_time: update.fetch_time,
            text: update.text.clone(),
        }
    }

    /// Fold a sequence of updates (all for the same url) into a record,
    /// starting from nothing. Returns `None` for an empty sequence.
    pub fn from_updates<'a>(updates: impl IntoIterator<Item = &'a Update>) -> Option<Self> {
        updates
            .into_iter()
            .fold(None, |existing, update| Some(resolve(existing, update).into_document()))
    }
}
impl From<Document> for Message {
    fn from(document: Document) -> Self {
        Self {
            url: document.url,
            pub_date: document.pub_date,
            fetch_time: Some(document.fetch_time),
            text: document.text,
            first_fetch_time: Some(document.first_fetch_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_is_both_boundaries() {
        let document = Document::first(&Update::new("b", 7, 50, "x"));
        assert_eq!(document.fetch_time, 7);
        assert_eq!(document.first_fetch_time, 7);
        assert_eq!(document.pub_date, 50);
        assert_eq!(document.text, "x");
    }

    #[test]
    fn test_from_updates() {
        assert_eq!(Document::from_updates(Vec::<Update>::new().iter()), None);
        let updates = [Update::new("a", 5, 100, "v5"), Update::new("a", 3, 90, "v3")];
        let document = Document::from_updates(&updates).unwrap();
        assert_eq!(
            document,
            Document {
                url: "a".to_string(),
                pub_date: 90,
                fetch_time: 5,
                first_fetch_time: 3,
                text: "v5".to_string(),
            }
        );
    }

    #[test]
    fn test_into_message_sets_first_fetch_time() {
        let message = Message::from(Document::first(&Update::new("b", 7, 50, "x")));
        assert_eq!(message.fetch_time, Some(7));
        assert_eq!(message.first_fetch_time, Some(7));
    }
}
