//! Transcript rendering and export
//!
//! Messages are printed oldest first as
//! `"{sender}: {text} [dd/mm/YYYY @ HH:MM:SS]"`. The sender is the member's
//! display name, or `You` for anyone not in the members map (the logged-in
//! user is never listed as a member).

use crate::config::ExportFormat;
use crate::error::Result;
use crate::format::format_message;
use crate::pagination::MessageStore;
use crate::types::{Members, Message};
use crate::utils::format_timestamp_in;
use chrono::TimeZone;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Sender label for messages by the logged-in user
pub const SELF_LABEL: &str = "You";

/// One rendered transcript line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptLine {
    /// Display name of the sender
    pub sender: String,
    /// Rendered content
    pub text: String,
    /// Formatted send time
    pub timestamp: String,
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.sender, self.text, self.timestamp)
    }
}

/// Render one message
pub fn render_line<Tz>(message: &Message, members: &Members, tz: &Tz) -> TranscriptLine
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let sender = message
        .user_id
        .as_deref()
        .and_then(|id| members.name_of(id))
        .unwrap_or(SELF_LABEL);
    TranscriptLine {
        sender: sender.to_string(),
        text: format_message(message),
        timestamp: format_timestamp_in(message.timestamp, tz),
    }
}

/// Render a whole store, oldest message first
pub fn render_transcript<Tz>(store: &MessageStore, members: &Members, tz: &Tz) -> Vec<TranscriptLine>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    store
        .chronological()
        .map(|message| render_line(message, members, tz))
        .collect()
}

/// Text file contents: lines joined by `\n` with a trailing newline
pub fn transcript_text(lines: &[TranscriptLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}

/// Raw messages as a pretty JSON array, oldest first
pub fn transcript_json(store: &MessageStore) -> Result<String> {
    let messages: Vec<&Message> = store.chronological().collect();
    Ok(serde_json::to_string_pretty(&messages)?)
}

/// Write the transcript to `path`, replacing any existing file
///
/// The parent directory is created if needed.
pub async fn write_transcript<Tz>(
    path: &Path,
    format: ExportFormat,
    store: &MessageStore,
    members: &Members,
    tz: &Tz,
) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let contents = match format {
        ExportFormat::Text => transcript_text(&render_transcript(store, members, tz)),
        ExportFormat::Json => transcript_json(store)?,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;

    info!(path = %path.display(), messages = store.len(), format = ?format, "Transcript written");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{msg, text_msg, user};
    use chrono::Utc;
    use tempfile::tempdir;

    // 2024-01-02 03:04:05 UTC
    const JAN_2: i64 = 1_704_164_645_000_000;

    fn sample() -> (MessageStore, Members) {
        let mut store = MessageStore::new();
        store.push(text_msg("2", JAN_2 + 60_000_000, None, "hi Ada"));
        store.push(text_msg("1", JAN_2, Some("77"), "hello"));
        (store, Members::from_users(&[user("77", "Ada Lovelace")]))
    }

    #[test]
    fn lines_are_oldest_first_with_sender_names() {
        let (store, members) = sample();
        let lines: Vec<String> = render_transcript(&store, &members, &Utc)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            lines,
            vec![
                "Ada: hello [02/01/2024 @ 03:04:05]",
                "You: hi Ada [02/01/2024 @ 03:05:05]",
            ]
        );
    }

    #[test]
    fn unknown_sender_is_you() {
        let line = render_line(&text_msg("1", JAN_2, Some("999"), "x"), &Members::default(), &Utc);
        assert_eq!(line.sender, SELF_LABEL);
    }

    #[test]
    fn text_has_trailing_newline() {
        let (store, members) = sample();
        let text = transcript_text(&render_transcript(&store, &members, &Utc));
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("03:05:05]\n"));
        assert_eq!(transcript_text(&[]), "\n");
    }

    #[test]
    fn json_is_oldest_first() {
        let mut store = MessageStore::new();
        store.push(msg("b", 200));
        store.push(msg("a", 100));

        let value: serde_json::Value =
            serde_json::from_str(&transcript_json(&store).unwrap()).unwrap();
        let ids: Vec<_> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["item_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(value[0]["text"], "message a");
    }

    #[tokio::test]
    async fn write_transcript_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.txt");
        let (store, members) = sample();

        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "stale contents that are much longer than the transcript\n".repeat(10))
            .await
            .unwrap();

        write_transcript(&path, ExportFormat::Text, &store, &members, &Utc)
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            written,
            "Ada: hello [02/01/2024 @ 03:04:05]\nYou: hi Ada [02/01/2024 @ 03:05:05]\n"
        );
    }

    #[tokio::test]
    async fn write_transcript_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("chat.json");
        let (store, members) = sample();

        write_transcript(&path, ExportFormat::Json, &store, &members, &Utc)
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.trim_start().starts_with('['));
    }
}
