//! Shared test helpers: message builders and a scripted in-memory fetcher.

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::stats::FetchStats;
use crate::types::{ItemId, Message, Page, ThreadId, ThreadSummary, ThreadUser};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Text message with a fixed sender
pub(crate) fn msg(id: &str, timestamp: i64) -> Message {
    text_msg(id, timestamp, Some("77"), &format!("message {}", id))
}

/// Text message with explicit sender and body
pub(crate) fn text_msg(id: &str, timestamp: i64, user_id: Option<&str>, text: &str) -> Message {
    let mut payload = serde_json::Map::new();
    payload.insert("text".to_string(), serde_json::Value::from(text));
    Message {
        item_id: ItemId::new(id),
        user_id: user_id.map(str::to_string),
        timestamp,
        item_type: "text".to_string(),
        payload,
    }
}

pub(crate) fn user(pk: &str, full_name: &str) -> ThreadUser {
    ThreadUser {
        pk: pk.to_string(),
        username: None,
        full_name: Some(full_name.to_string()),
    }
}

/// Page with the given items that points at `next` when it is `Some`
pub(crate) fn page(items: Vec<Message>, next: Option<&str>) -> Page {
    Page {
        items,
        has_older: next.is_some(),
        next_cursor: next.map(str::to_string),
        newest_cursor: None,
        users: Vec::new(),
    }
}

/// Fetcher answering from per-cursor queues of canned responses
///
/// Every call is recorded and counted as a request, like [`crate::HttpFetcher`].
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    pages: Mutex<HashMap<String, VecDeque<Result<Page, FetchError>>>>,
    threads: Mutex<Option<Result<Vec<ThreadSummary>, FetchError>>>,
    calls: Mutex<Vec<String>>,
    pub(crate) stats: FetchStats,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a page for `cursor`
    pub(crate) fn page(self, cursor: &str, page: Page) -> Self {
        self.respond(cursor, Ok(page))
    }

    /// Queue a failure for `cursor`
    pub(crate) fn fail(self, cursor: &str, err: FetchError) -> Self {
        self.respond(cursor, Err(err))
    }

    pub(crate) fn threads(self, threads: Result<Vec<ThreadSummary>, FetchError>) -> Self {
        *self.threads.lock().unwrap() = Some(threads);
        self
    }

    fn respond(self, cursor: &str, response: Result<Page, FetchError>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(cursor.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Cursors requested so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_page(&self, _thread: &ThreadId, cursor: &str) -> Result<Page, FetchError> {
        self.stats.record_request();
        self.calls.lock().unwrap().push(cursor.to_string());
        self.pages
            .lock()
            .unwrap()
            .get_mut(cursor)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(FetchError::Protocol(format!(
                    "no scripted page for cursor '{}'",
                    cursor
                )))
            })
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, FetchError> {
        self.stats.record_request();
        self.threads
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
