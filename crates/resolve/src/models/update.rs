use super::Message;
use crate::error::{Error, ErrorKind};
use exn::OptionExt;

/// Largest accepted timestamp. Stores keep timestamps as signed 64-bit
/// integers, so anything above `i64::MAX` could never be persisted.
pub const MAX_TIMESTAMP: u64 = i64::MAX as u64;

/// A single observed version of a document, validated and ready to merge.
///
/// The pair `(url, fetch_time)` is unique per update; `fetch_time` doubles as
/// the version number of the update within its url (higher was fetched later).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub url: String,
    pub pub_date: u64,
    pub fetch_time: u64,
    pub text: String,
}
impl Update {
    pub fn new(url: impl Into<String>, fetch_time: u64, pub_date: u64, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pub_date,
            fetch_time,
            text: text.into(),
        }
    }
}
impl AsRef<Update> for Update {
    fn as_ref(&self) -> &Update {
        self
    }
}
impl TryFrom<Message> for Update {
    type Error = Error;
    fn try_from(message: Message) -> Result<Self, Self::Error> {
        if message.url.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("url"));
        }
        let fetch_time = message.fetch_time.ok_or_raise(|| ErrorKind::MissingField("fetchTime"))?;
        if fetch_time > MAX_TIMESTAMP {
            exn::bail!(ErrorKind::OutOfRange("fetchTime"));
        }
        if message.pub_date > MAX_TIMESTAMP {
            exn::bail!(ErrorKind::OutOfRange("pubDate"));
        }
        // Whatever the sender put in `first_fetch_time` is dropped here.
        Ok(Self {
            url: message.url,
            pub_date: message.pub_date,
            fetch_time,
            text: message.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn message(url: &str, fetch_time: Option<u64>) -> Message {
        Message {
            url: url.to_string(),
            pub_date: 100,
            fetch_time,
            text: "body".to_string(),
            first_fetch_time: Some(1),
        }
    }

    #[test]
    fn test_valid_message() {
        let update = Update::try_from(message("https://example.com/a", Some(5))).unwrap();
        assert_eq!(update, Update::new("https://example.com/a", 5, 100, "body"));
    }

    #[rstest]
    #[case(message("", Some(5)), "url")]
    #[case(message("   ", Some(5)), "url")]
    #[case(message("https://example.com/a", None), "fetchTime")]
    #[case(message("", None), "url")]
    fn test_rejects_malformed(#[case] input: Message, #[case] field: &'static str) {
        let err = Update::try_from(input).unwrap_err();
        assert_eq!(&*err, &ErrorKind::MissingField(field));
        assert!(!err.is_retryable());
    }

    #[rstest]
    #[case::fetch_time(MAX_TIMESTAMP + 1, 100, "fetchTime")]
    #[case::fetch_time_max(u64::MAX, 100, "fetchTime")]
    #[case::pub_date(5, u64::MAX, "pubDate")]
    fn test_rejects_out_of_range(#[case] fetch_time: u64, #[case] pub_date: u64, #[case] field: &'static str) {
        let input = Message {
            pub_date,
            ..message("https://example.com/a", Some(fetch_time))
        };
        let err = Update::try_from(input).unwrap_err();
        assert_eq!(&*err, &ErrorKind::OutOfRange(field));
    }

    #[test]
    fn test_accepts_largest_timestamp() {
        let input = Message {
            pub_date: MAX_TIMESTAMP,
            ..message("https://example.com/a", Some(MAX_TIMESTAMP))
        };
        let update = Update::try_from(input).unwrap();
        assert_eq!((update.fetch_time, update.pub_date), (MAX_TIMESTAMP, MAX_TIMESTAMP));
    }
}
