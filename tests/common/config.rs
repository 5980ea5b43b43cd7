//! Test configuration helpers for mock and live downloaders

use inbox_dl::{Config, InboxDownloader};
use std::time::Duration;
use wiremock::MockServer;

/// Config pointing at a mock server, with pacing and the progress line off
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::new("1234%3Asecret");
    config.api.base_url = server.uri();
    config.thread_id = Some(super::THREAD_ID.to_string());
    config.pagination.page_delay = Duration::ZERO;
    config.progress.enabled = false;
    config
}

/// Downloader pointing at a mock server
pub fn mock_downloader(server: &MockServer) -> InboxDownloader {
    InboxDownloader::new(mock_config(server)).unwrap_or_else(|e| panic!("mock downloader: {}", e))
}

/// Live credentials from `.env`
///
/// Required environment variables:
/// - `INBOX_DL_SESSIONID` - value of the `sessionid` cookie
///
/// Optional:
/// - `INBOX_DL_THREADID` - thread to fetch in live tests
pub struct LiveCredentials {
    /// Session cookie value
    pub session_id: String,
    /// Thread to fetch
    pub thread_id: Option<String>,
}

/// Load live credentials, or `None` if they are not configured
pub fn live_credentials() -> Option<LiveCredentials> {
    dotenvy::dotenv().ok();
    let session_id = std::env::var("INBOX_DL_SESSIONID").ok()?;
    Some(LiveCredentials {
        session_id,
        thread_id: std::env::var("INBOX_DL_THREADID").ok(),
    })
}
