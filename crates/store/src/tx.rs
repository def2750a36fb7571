//! Transaction handle handed to [`Repository::with_transaction`](crate::Repository::with_transaction).

use crate::error::{ErrorKind, Result};
use crate::models::DocumentRow;
use sqlx::{Sqlite, SqliteExecutor};
use updater_resolve::models::Document;

/// An open store transaction holding the database write lock.
///
/// Reads through this handle observe everything committed before the
/// transaction began, and nothing can be committed by anyone else until this
/// transaction ends. Dropping the handle without committing (for instance
/// because the surrounding future was cancelled) rolls the transaction back.
pub struct Transaction {
    inner: sqlx::Transaction<'static, Sqlite>,
}
impl Transaction {
    pub(crate) fn new(inner: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self { inner }
    }

    /// Get the merged record currently stored for `url`, if any.
    pub async fn get_by_url(&mut self, url: impl AsRef<str>) -> Result<Option<Document>> {
        fetch_by_url(&mut *self.inner, url.as_ref()).await
    }

    /// Insert the record for its url, or replace the one already stored.
    pub async fn upsert(&mut self, document: &Document) -> Result<()> {
        let row = DocumentRow::try_from(document)?;
        sqlx::query(include_str!("../queries/upsert_document.sql"))
            .bind(row.url)
            .bind(row.pub_date)
            .bind(row.fetch_time)
            .bind(row.first_fetch_time)
            .bind(row.text)
            .execute(&mut *self.inner)
            .await
            .map_err(|e| ErrorKind::sqlx("upsert", e))?;
        Ok(())
    }

    pub(crate) async fn commit(self) -> Result<()> {
        self.inner.commit().await.map_err(|e| ErrorKind::sqlx("commit", e))
    }

    pub(crate) async fn rollback(self) -> Result<()> {
        self.inner.rollback().await.map_err(|e| ErrorKind::sqlx("rollback", e))
    }
}

pub(crate) async fn fetch_by_url<'e>(executor: impl SqliteExecutor<'e>, url: &str) -> Result<Option<Document>> {
    let row: Option<DocumentRow> = sqlx::query_as(include_str!("../queries/get_by_url.sql"))
        .bind(url)
        .fetch_optional(executor)
        .await
        .map_err(|e| ErrorKind::sqlx("get_by_url", e))?;
    row.map(Document::try_from).transpose()
}
