use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use updater_resolve::models::{Document, Message, Update};
use updater_resolve::{Resolution, resolve};
use updater_store::Repository;
use updater_store::error::Result as StoreResult;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Tuning for [`Updater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Publish the merged record even when the update changed nothing
    /// (a redelivered duplicate, or a version fetched between the earliest
    /// and latest known ones).
    pub publish_unchanged: bool,
    /// Attempts per update when the store reports a transient failure. Values
    /// below 1 behave like 1.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubled for every attempt after that,
    /// up to 10 seconds.
    pub retry_backoff: Duration,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            publish_unchanged: true,
            max_attempts: MAX_ATTEMPTS,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

impl Options {
    /// Wait after the given failed attempt (counting from 1).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_backoff.saturating_mul(factor).min(MAX_RETRY_BACKOFF)
    }
}

/// Applies incoming document updates to the version store.
///
/// The store is injected: its lifetime (and the connection pool behind it)
/// belongs to whoever builds the `Updater`. The `Updater` itself holds no
/// mutable state, so one instance can process any number of updates at once;
/// updates for the same url are serialized by the store's transactions.
#[derive(Debug, Clone)]
pub struct Updater {
    store: Repository,
    options: Options,
}
impl Updater {
    pub fn new(store: Repository, options: Options) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Repository {
        &self.store
    }

    /// Merge one incoming message into the stored record for its url, and
    /// return the record to publish.
    ///
    /// Returns `Ok(None)` when there is nothing to publish: only when the merge
    /// changed nothing and [`Options::publish_unchanged`] is off.
    ///
    /// Malformed messages are rejected with [`ErrorKind::InvalidUpdate`] before
    /// the store is touched. Store failures roll the merge back entirely, so
    /// redelivering the same message later is always safe.
    #[instrument(skip_all, fields(url = %message.url, fetch_time = ?message.fetch_time))]
    pub async fn process(&self, message: Message) -> Result<Option<Document>> {
        let update = Update::try_from(message).or_raise(|| ErrorKind::InvalidUpdate)?;
        let resolution = self.apply(&update).await.or_raise(|| ErrorKind::Store)?;
        if resolution.change.is_noop() && !self.options.publish_unchanged {
            debug!("update changed nothing, not publishing");
            return Ok(None);
        }
        debug!(change = ?resolution.change, "update applied");
        Ok(Some(resolution.into_document()))
    }

    /// Run the merge, retrying the whole transaction on transient failures.
    async fn apply(&self, update: &Update) -> StoreResult<Resolution> {
        let mut attempt = 1;
        loop {
            match self.merge(update).await {
                Err(err) if err.is_retryable() && attempt < self.options.max_attempts => {
                    let backoff = self.options.backoff(attempt);
                    warn!(attempt, ?backoff, error = ?err, "transient store failure, retrying merge");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                },
                result => return result,
            }
        }
    }

    async fn merge(&self, update: &Update) -> StoreResult<Resolution> {
        self.store
            .with_transaction(async |tx| {
                let existing = tx.get_by_url(&update.url).await?;
                let resolution = resolve(existing, update);
                if !resolution.change.is_noop() {
                    tx.upsert(&resolution.document).await?;
                }
                Ok(resolution)
            })
            .await
    }
}
