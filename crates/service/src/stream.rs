use crate::Updater;
use crate::error::{Error, ErrorKind};
use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{info, warn};
use updater_resolve::models::{Document, Message};

/// The outcome of processing one incoming message.
#[derive(Debug)]
pub enum Event {
    /// The merged record to publish downstream.
    Published(Document),
    /// The update was applied but changed nothing worth publishing.
    Suppressed { url: String },
    /// The message could not be read or was malformed. Redelivering it will
    /// not help.
    Rejected(Error),
    /// The update could not be applied to the store. Nothing was written for
    /// it, and it may be redelivered.
    Failed { url: String, error: Error },
}
impl Event {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Process a stream of incoming messages, yielding one [`Event`] per message.
///
/// Up to `concurrency` messages are in flight at once, so events arrive in
/// completion order rather than input order. Messages for different urls never
/// wait on each other's merge logic, but every merge takes the store's write
/// lock, so their transactions still commit one at a time.
///
/// Items that fail to decode upstream (`Err` items) are reported as
/// [`Event::Rejected`] and do not stop the stream.
pub fn process_stream<'a, S, E>(updater: &'a Updater, messages: S, concurrency: usize) -> impl Stream<Item = Event> + 'a
where
    S: Stream<Item = std::result::Result<Message, E>> + 'a,
    E: std::error::Error + Send + Sync + 'static,
{
    let concurrency = concurrency.max(1);
    stream! {
        let events = messages
            .map(|item| async move {
                match item {
                    Ok(message) => handle(updater, message).await,
                    Err(err) => Event::Rejected(exn::Exn::new(err).raise(ErrorKind::InvalidUpdate)),
                }
            })
            .buffer_unordered(concurrency);
        for await event in events {
            match &event {
                Event::Published(document) => info!(url = %document.url, "publishing merged record"),
                Event::Suppressed { url } => info!(%url, "update changed nothing"),
                Event::Rejected(error) => warn!(?error, "rejected malformed update"),
                Event::Failed { url, error } => warn!(%url, ?error, "failed to apply update"),
            }
            yield event;
        }
    }
}

async fn handle(updater: &Updater, message: Message) -> Event {
    let url = message.url.clone();
    match updater.process(message).await {
        Ok(Some(document)) => Event::Published(document),
        Ok(None) => Event::Suppressed { url },
        Err(error) if matches!(&*error, ErrorKind::InvalidUpdate) => Event::Rejected(error),
        Err(error) => Event::Failed { url, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::io;
    use updater_store::{Database, Repository};

    fn message(url: &str, fetch_time: u64, pub_date: u64, text: &str) -> Message {
        Message {
            url: url.to_string(),
            pub_date,
            fetch_time: Some(fetch_time),
            text: text.to_string(),
            first_fetch_time: None,
        }
    }

    async fn collect(updater: &Updater, items: Vec<io::Result<Message>>, concurrency: usize) -> Vec<Event> {
        process_stream(updater, futures::stream::iter(items), concurrency).collect().await
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::concurrent(4)]
    #[case::zero_treated_as_one(0)]
    #[tokio::test]
    async fn test_stream_converges(#[case] concurrency: usize) {
        let db = Database::connect_in_memory().await.unwrap();
        let updater = Updater::new(Repository::from(&db), Options::default());
        let items = vec![
            Ok(message("a", 5, 100, "a5")),
            Ok(message("b", 2, 20, "b2")),
            Ok(message("a", 3, 90, "a3")),
            Ok(message("a", 7, 110, "a7")),
            Ok(message("b", 1, 10, "b1")),
            Ok(message("a", 5, 100, "a5")),
        ];
        let events = collect(&updater, items, concurrency).await;
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| matches!(e, Event::Published(_))));

        let a = updater.store().get_by_url("a").await.unwrap().unwrap();
        assert_eq!((a.pub_date, a.fetch_time, a.first_fetch_time, a.text.as_str()), (90, 7, 3, "a7"));
        let b = updater.store().get_by_url("b").await.unwrap().unwrap();
        assert_eq!((b.pub_date, b.fetch_time, b.first_fetch_time, b.text.as_str()), (10, 2, 1, "b2"));
    }

    #[tokio::test]
    async fn test_bad_items_do_not_stop_the_stream() {
        let db = Database::connect_in_memory().await.unwrap();
        let updater = Updater::new(Repository::from(&db), Options::default());
        let items = vec![
            Err(io::Error::new(io::ErrorKind::InvalidData, "not json")),
            Ok(Message {
                fetch_time: None,
                ..message("a", 0, 1, "no fetch time")
            }),
            Ok(message("", 4, 1, "no url")),
            Ok(message("a", 4, 1, "ok")),
        ];
        let events = collect(&updater, items, 1).await;
        let rejected = events.iter().filter(|e| matches!(e, Event::Rejected(_))).count();
        assert_eq!(rejected, 3);
        assert!(matches!(events.last(), Some(Event::Published(d)) if d.text == "ok"));
        assert!(!events.iter().any(Event::is_failure));
        assert_eq!(updater.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_suppressed_events_carry_url() {
        let db = Database::connect_in_memory().await.unwrap();
        let options = Options {
            publish_unchanged: false,
            ..Options::default()
        };
        let updater = Updater::new(Repository::from(&db), options);
        let items = vec![Ok(message("x", 1, 1, "x1")), Ok(message("x", 1, 1, "x1"))];
        let events = collect(&updater, items, 1).await;
        let mut kinds: HashMap<&str, usize> = HashMap::new();
        for event in &events {
            let kind = match event {
                Event::Published(_) => "published",
                Event::Suppressed { url } => {
                    assert_eq!(url, "x");
                    "suppressed"
                },
                Event::Rejected(_) => "rejected",
                Event::Failed { .. } => "failed",
            };
            *kinds.entry(kind).or_default() += 1;
        }
        assert_eq!(kinds, HashMap::from([("published", 1), ("suppressed", 1)]));
    }
}
