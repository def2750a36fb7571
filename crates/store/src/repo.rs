//! Repository for merged document records.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::DocumentRow;
use crate::tx::{Transaction, fetch_by_url};
use exn::ResultExt;
use sqlx::SqlitePool;
use tracing::warn;
use updater_resolve::models::Document;

/// Takes the write lock up front, so that the read at the start of a merge
/// already excludes every other writer. A plain (deferred) `BEGIN` would let
/// two merges read the same record before either of them writes.
const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// Repository for managing merged [`Document`] records.
///
/// All writes go through [`with_transaction`](Self::with_transaction); the
/// remaining methods are read-only lookups that run outside of any merge.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In dry-run mode every transaction is rolled back instead of committed:
    /// merges are computed against the stored state but never persisted.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `work` inside a single store transaction.
    ///
    /// If `work` succeeds, everything it wrote is committed atomically. If it
    /// fails, the transaction is rolled back and `work`'s error is returned
    /// (a failing rollback is logged, not reported, since the original error
    /// is the one worth acting on). If the returned future is dropped before
    /// completion, the transaction is rolled back when its handle is dropped.
    ///
    /// Transactions are serialized against each other: see the
    /// [crate documentation](crate) for the isolation guarantees.
    pub async fn with_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<T>,
    {
        let inner = self.pool.begin_with(BEGIN_IMMEDIATE).await.map_err(|e| ErrorKind::sqlx("begin", e))?;
        let mut tx = Transaction::new(inner);
        match work(&mut tx).await {
            Ok(value) if self.dry_run => {
                tx.rollback().await?;
                Ok(value)
            },
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            },
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = ?rollback, "failed to roll back transaction after error");
                }
                Err(err)
            },
        }
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the merged record currently stored for `url`.
    ///
    /// This is a snapshot read outside of any transaction; use
    /// [`Transaction::get_by_url`] when the result feeds into a write.
    pub async fn get_by_url(&self, url: impl AsRef<str>) -> Result<Option<Document>> {
        fetch_by_url(&self.pool, url.as_ref()).await
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List the most recently fetched records, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Document>> {
        let limit = i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("limit"))?;
        let rows: Vec<DocumentRow> = sqlx::query_as(include_str!("../queries/list_recent.sql"))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ErrorKind::sqlx("list_recent", e))?;
        rows.into_iter().map(Document::try_from).collect()
    }

    /// Count the records (one per url) in the store.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_documents.sql"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ErrorKind::sqlx("count", e))?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }
}
