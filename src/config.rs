//! Configuration types for inbox-dl

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP API settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the web API (default: "https://www.instagram.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Browser user agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Web app id sent as `x-ig-app-id`
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Maximum number of threads requested by the inbox listing (default: 200)
    #[serde(default = "default_inbox_limit")]
    pub inbox_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            app_id: default_app_id(),
            inbox_limit: default_inbox_limit(),
        }
    }
}

/// Pagination behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Pause between page requests to stay under the rate limit (default: 1 second)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub page_delay: Duration,

    /// Stop at the first message older than this instant (None = fetch everything)
    #[serde(default)]
    pub cutoff: Option<DateTime<Utc>>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_delay: default_page_delay(),
            cutoff: None,
        }
    }
}

impl PaginationConfig {
    /// Cutoff as microseconds since the epoch, comparable with [`crate::types::Message::timestamp`]
    pub fn cutoff_micros(&self) -> Option<i64> {
        self.cutoff.map(|c| c.timestamp_micros())
    }
}

/// Progress line settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Show the progress line while fetching (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often the progress line is redrawn (default: 1 second)
    #[serde(default = "default_progress_interval", with = "duration_serde")]
    pub interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_progress_interval(),
        }
    }
}

/// Transcript file format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One rendered line per message
    #[default]
    Text,
    /// Raw messages as a JSON array, oldest first
    Json,
}

/// Export destination settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// File to write the transcript to (None = console only)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// File format
    #[serde(default)]
    pub format: ExportFormat,

    /// Also print the transcript to the console when writing a file
    #[serde(default)]
    pub echo: bool,
}

/// Main configuration for InboxDownloader
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Value of the `sessionid` cookie
    pub session_id: String,

    /// Thread to download (not needed for listing threads)
    #[serde(default)]
    pub thread_id: Option<String>,

    /// Verbose mode: debug logging, no progress line, transcript always printed
    #[serde(default)]
    pub verbose: bool,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Pagination behaviour
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Progress line settings
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Create a config with defaults for everything but the session id
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Check the settings that would otherwise fail on the first request
    pub fn validate(&self) -> Result<()> {
        let session = self.session_id.trim();
        if session.is_empty() {
            return Err(Error::config("session_id", "no session id was provided"));
        }
        if reqwest::header::HeaderValue::from_str(&format!("sessionid={}", session)).is_err()
            || session.contains(';')
        {
            return Err(Error::config(
                "session_id",
                "session id contains characters not allowed in a cookie",
            ));
        }

        url::Url::parse(&self.api.base_url).map_err(|e| {
            Error::config("api.base_url", format!("invalid base URL '{}': {}", self.api.base_url, e))
        })?;

        if self.api.inbox_limit == 0 {
            return Err(Error::config("api.inbox_limit", "inbox limit must be at least 1"));
        }

        if let Some(thread_id) = &self.thread_id {
            crate::types::ThreadId::new(thread_id.as_str()).validate()?;
        }

        Ok(())
    }

    /// Whether the progress line should run
    pub fn progress_enabled(&self) -> bool {
        self.progress.enabled && !self.verbose
    }

    /// Whether the transcript should be printed to the console
    pub fn prints_transcript(&self) -> bool {
        self.export.output.is_none() || self.export.echo || self.verbose
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_app_id() -> String {
    "936619743392459".to_string()
}

fn default_inbox_limit() -> u32 {
    200
}

fn default_page_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds, fractions allowed so sub-second delays survive)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
