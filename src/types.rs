//! Core types for inbox-dl

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Unique identifier of a message item
///
/// The API sends these as strings, occasionally as bare numbers; both are accepted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(#[serde(deserialize_with = "string_or_number")] pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a conversation thread
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Create a new ThreadId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject ids that cannot be placed in a single URL path segment
    pub fn validate(&self) -> crate::Result<()> {
        if self.0.trim().is_empty() {
            return Err(crate::Error::config("thread_id", "thread id must not be empty"));
        }
        if self.0.contains(['/', '?', '#']) {
            return Err(crate::Error::config(
                "thread_id",
                format!("thread id '{}' contains URL separators", self.0),
            ));
        }
        Ok(())
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message of a thread, as delivered by the API
///
/// Only the fields every item carries are typed. The type-specific payload
/// (`text`, `media`, `voice_media`, ...) is kept verbatim in `payload` and
/// interpreted by [`crate::format::Content`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique item identifier
    pub item_id: ItemId,

    /// Sender's user id (absent on some system items)
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_id: Option<String>,

    /// Microseconds since the Unix epoch
    #[serde(deserialize_with = "i64_or_string")]
    pub timestamp: i64,

    /// Content-type tag (`text`, `media`, `media_share`, ...); empty when absent or null
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item_type: String,

    /// Remaining type-specific fields
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Timestamp as a UTC date-time, if it is in chrono's range
    pub fn sent_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_micros(self.timestamp)
    }
}

/// A participant of a thread (the logged-in user is not listed)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadUser {
    /// User id, matched against [`Message::user_id`]
    #[serde(deserialize_with = "string_or_number")]
    pub pk: String,

    /// Handle
    #[serde(default)]
    pub username: Option<String>,

    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
}

/// One page of a thread's history
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Messages in server order (newest first)
    pub items: Vec<Message>,
    /// Whether an older page exists
    pub has_older: bool,
    /// Cursor of the next older page (`prev_cursor`, else `oldest_cursor`)
    pub next_cursor: Option<String>,
    /// Cursor of the newest page, used to start pagination after discovery
    pub newest_cursor: Option<String>,
    /// Thread participants
    pub users: Vec<ThreadUser>,
}

/// A thread as shown in the inbox listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    /// Thread id to pass to a fetch run
    pub thread_id: ThreadId,
    /// Group title or the other participant's name
    pub name: String,
}

/// Display names of thread participants keyed by user id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Members(HashMap<String, String>);

impl Members {
    /// Build from the `users` of a thread; each name is the first word of `full_name`
    pub fn from_users(users: &[ThreadUser]) -> Self {
        let names = users
            .iter()
            .map(|user| {
                let name = user
                    .full_name
                    .as_deref()
                    .and_then(|full| full.split_whitespace().next())
                    .or(user.username.as_deref())
                    .unwrap_or("Unknown");
                (user.pk.clone(), name.to_string())
            })
            .collect();
        Self(names)
    }

    /// Display name for a user id
    pub fn name_of(&self, user_id: &str) -> Option<&str> {
        self.0.get(user_id).map(String::as_str)
    }

    /// Number of known participants
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no participant is known
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Uint(u64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Uint(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.into_string())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn i64_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Int(n) => Ok(n),
        StringOrNumber::Uint(n) => i64::try_from(n).map_err(serde::de::Error::custom),
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_accepts_string_and_numeric_fields() {
        let msg: Message = serde_json::from_value(json!({
            "item_id": "31",
            "user_id": 4242,
            "timestamp": "1700000000000000",
            "item_type": "text",
            "text": "hello"
        }))
        .unwrap();

        assert_eq!(msg.item_id, ItemId::new("31"));
        assert_eq!(msg.user_id.as_deref(), Some("4242"));
        assert_eq!(msg.timestamp, 1_700_000_000_000_000);
        assert_eq!(msg.payload["text"], "hello");
        assert!(!msg.payload.contains_key("item_id"));
    }

    #[test]
    fn message_with_numeric_item_id_and_no_sender() {
        let msg: Message = serde_json::from_value(json!({
            "item_id": 5,
            "timestamp": 100,
            "item_type": "action_log"
        }))
        .unwrap();

        assert_eq!(msg.item_id.as_str(), "5");
        assert_eq!(msg.user_id, None);
    }

    #[test]
    fn null_or_missing_item_type_is_empty() {
        let null_tag: Message = serde_json::from_value(json!({
            "item_id": "1",
            "timestamp": 100,
            "item_type": null
        }))
        .unwrap();
        assert_eq!(null_tag.item_type, "");

        let missing_tag: Message = serde_json::from_value(json!({
            "item_id": "2",
            "timestamp": 100
        }))
        .unwrap();
        assert_eq!(missing_tag.item_type, "");
        assert_eq!(crate::format::format_message(&null_tag), "unknown");
    }

    #[test]
    fn message_without_item_id_is_rejected() {
        let result = serde_json::from_value::<Message>(json!({
            "timestamp": 100,
            "item_type": "text"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn sent_at_converts_microseconds() {
        let msg: Message = serde_json::from_value(json!({
            "item_id": "1",
            "timestamp": 1_000_000,
            "item_type": "text"
        }))
        .unwrap();
        assert_eq!(msg.sent_at().unwrap().timestamp(), 1);
    }

    #[test]
    fn members_use_first_word_of_full_name() {
        let users = vec![
            ThreadUser {
                pk: "1".into(),
                username: Some("ada".into()),
                full_name: Some("Ada Lovelace".into()),
            },
            ThreadUser {
                pk: "2".into(),
                username: Some("grace_h".into()),
                full_name: Some("".into()),
            },
            ThreadUser {
                pk: "3".into(),
                username: None,
                full_name: None,
            },
        ];

        let members = Members::from_users(&users);
        assert_eq!(members.len(), 3);
        assert_eq!(members.name_of("1"), Some("Ada"));
        assert_eq!(members.name_of("2"), Some("grace_h"));
        assert_eq!(members.name_of("3"), Some("Unknown"));
        assert_eq!(members.name_of("4"), None);
    }

    #[test]
    fn thread_id_validation() {
        assert!(ThreadId::new("340282366841710300949128").validate().is_ok());
        assert!(ThreadId::new("").validate().is_err());
        assert!(ThreadId::new("  ").validate().is_err());
        assert!(ThreadId::new("12/34").validate().is_err());
        assert!(ThreadId::new("12?x=1").validate().is_err());
    }
}
