use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use updater_resolve::models::Document;

/// A row of the `documents` table.
///
/// SQLite only has signed 64-bit integers, so timestamps are stored as `i64`
/// and checked on the way in and out. `first_fetch_time` is nullable at the
/// schema level; a NULL is reported as an integrity failure on read.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub(crate) url: String,
    pub(crate) pub_date: i64,
    pub(crate) fetch_time: i64,
    pub(crate) first_fetch_time: Option<i64>,
    pub(crate) text: String,
}
impl TryFrom<&Document> for DocumentRow {
    type Error = Error;
    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            url: document.url.clone(),
            pub_date: i64::try_from(document.pub_date).or_raise(|| ErrorKind::InvalidData("pub date"))?,
            fetch_time: i64::try_from(document.fetch_time).or_raise(|| ErrorKind::InvalidData("fetch time"))?,
            first_fetch_time: Some(
                i64::try_from(document.first_fetch_time).or_raise(|| ErrorKind::InvalidData("first fetch time"))?,
            ),
            text: document.text.clone(),
        })
    }
}
impl TryFrom<DocumentRow> for Document {
    type Error = Error;
    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let Some(first_fetch_time) = row.first_fetch_time else {
            exn::bail!(ErrorKind::Integrity(row.url));
        };
        if first_fetch_time > row.fetch_time {
            exn::bail!(ErrorKind::Integrity(row.url));
        }
        Ok(Self {
            pub_date: u64::try_from(row.pub_date).or_raise(|| ErrorKind::InvalidData("pub date"))?,
            fetch_time: u64::try_from(row.fetch_time).or_raise(|| ErrorKind::InvalidData("fetch time"))?,
            first_fetch_time: u64::try_from(first_fetch_time).or_raise(|| ErrorKind::InvalidData("first fetch time"))?,
            url: row.url,
            text: row.text,
        })
    }
}
