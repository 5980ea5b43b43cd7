//! Single-request access to the messaging API.
//!
//! [`Fetcher`] is the seam between the pagination loop and the network: one
//! call is one request, with no retries. [`HttpFetcher`] is the reqwest-backed
//! implementation; tests substitute scripted fetchers.
//!
//! This module also owns the wire shapes of the two endpoints and their
//! conversion into [`Page`] and [`ThreadSummary`].

mod http;

pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::{Message, Page, ThreadId, ThreadSummary, ThreadUser};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// One request against the messaging API
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the page of `thread` at `cursor` (empty = newest page)
    async fn fetch_page(&self, thread: &ThreadId, cursor: &str) -> Result<Page, FetchError>;

    /// List the threads of the inbox, omitting deleted accounts
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, FetchError>;
}

/// Body of `GET /api/v1/direct_v2/threads/{id}/`
#[derive(Debug, Deserialize)]
pub(crate) struct ThreadResponse {
    #[serde(default)]
    pub(crate) thread: Option<ThreadBody>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadBody {
    #[serde(default)]
    items: Vec<Message>,
    #[serde(default)]
    has_older: bool,
    #[serde(default)]
    prev_cursor: Option<String>,
    #[serde(default)]
    oldest_cursor: Option<String>,
    #[serde(default)]
    newest_cursor: Option<String>,
    #[serde(default)]
    users: Vec<ThreadUser>,
}

/// Body of `GET /api/v1/direct_v2/inbox/`
#[derive(Debug, Deserialize)]
pub(crate) struct InboxResponse {
    #[serde(default)]
    pub(crate) inbox: Option<InboxBody>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InboxBody {
    #[serde(default)]
    threads: Vec<InboxThread>,
}

#[derive(Debug, Deserialize)]
struct InboxThread {
    thread_id: String,
    #[serde(default)]
    is_group: bool,
    #[serde(default)]
    thread_title: Option<String>,
    #[serde(default)]
    users: Vec<ThreadUser>,
}

/// Marker the API puts in the names of deleted accounts
const DELETED_MARKER: &str = "__deleted__";

fn non_empty(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.is_empty())
}

/// Message the API sends instead of data when the session is not logged in
fn is_login_required(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.eq_ignore_ascii_case("login_required"))
}

impl ThreadResponse {
    pub(crate) fn into_page(self) -> Result<Page, FetchError> {
        if is_login_required(self.message.as_deref()) {
            return Err(FetchError::Auth {
                reason: "login_required".to_string(),
            });
        }
        let thread = self.thread.ok_or_else(|| {
            FetchError::Protocol(match self.message {
                Some(message) => format!("response has no 'thread' key (server says: {})", message),
                None => "response has no 'thread' key".to_string(),
            })
        })?;

        Ok(Page {
            items: thread.items,
            has_older: thread.has_older,
            next_cursor: non_empty(thread.prev_cursor).or_else(|| non_empty(thread.oldest_cursor)),
            newest_cursor: non_empty(thread.newest_cursor),
            users: thread.users,
        })
    }
}

impl InboxResponse {
    pub(crate) fn into_summaries(self) -> Result<Vec<ThreadSummary>, FetchError> {
        if is_login_required(self.message.as_deref()) {
            return Err(FetchError::Auth {
                reason: "login_required".to_string(),
            });
        }
        let inbox = self.inbox.ok_or_else(|| {
            FetchError::Protocol(match self.message {
                Some(message) => format!("response has no 'inbox' key (server says: {})", message),
                None => "response has no 'inbox' key".to_string(),
            })
        })?;

        let mut summaries = Vec::with_capacity(inbox.threads.len());
        for thread in inbox.threads {
            let name = thread_display_name(&thread);
            if name.contains(DELETED_MARKER) {
                info!(thread_id = %thread.thread_id, name = %name, "Omitting deleted thread");
                continue;
            }
            summaries.push(ThreadSummary {
                thread_id: ThreadId::new(thread.thread_id),
                name,
            });
        }
        Ok(summaries)
    }
}

fn thread_display_name(thread: &InboxThread) -> String {
    if thread.is_group {
        return thread
            .thread_title
            .clone()
            .unwrap_or_else(|| "Unknown Group".to_string());
    }
    match thread.users.first() {
        Some(user) => user
            .full_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        None => "Unknown (No User Info)".to_string(),
    }
}
