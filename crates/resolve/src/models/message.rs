/// Wire representation of a document version, as consumed from (and published
/// back to) the message transport.
///
/// Every field is lenient on input so that a malformed message can be reported
/// with the name of the offending field instead of a generic decode failure:
/// converting into an [`Update`](super::Update) is where validation happens.
/// `first_fetch_time` is derived by the merge and is never trusted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Message {
    #[cfg_attr(feature = "serde", serde(default))]
    pub url: String,
    /// Claimed publication time, as supplied by the source.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pub_date: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fetch_time: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub first_fetch_time: Option<u64>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_decode_camel_case() {
        let json = r#"{"url":"https://example.com/a","pubDate":100,"fetchTime":5,"text":"v5"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.url, "https://example.com/a");
        assert_eq!(message.pub_date, 100);
        assert_eq!(message.fetch_time, Some(5));
        assert_eq!(message.text, "v5");
        assert_eq!(message.first_fetch_time, None);
    }

    #[test]
    fn test_decode_missing_fetch_time() {
        let message: Message = serde_json::from_str(r#"{"url":"a","pubDate":1,"text":""}"#).unwrap();
        assert_eq!(message.fetch_time, None);
        let message: Message = serde_json::from_str(r#"{"url":"a","fetchTime":null}"#).unwrap();
        assert_eq!(message.fetch_time, None);
    }

    #[test]
    fn test_encode_skips_absent_first_fetch_time() {
        let message = Message {
            url: "a".to_string(),
            pub_date: 1,
            fetch_time: Some(2),
            text: "t".to_string(),
            first_fetch_time: None,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("firstFetchTime"));
        let json = serde_json::to_string(&Message { first_fetch_time: Some(2), ..message }).unwrap();
        assert!(json.contains(r#""firstFetchTime":2"#));
    }
}
