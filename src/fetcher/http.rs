//! reqwest-backed [`Fetcher`].

use super::{Fetcher, InboxResponse, ThreadResponse};
use crate::config::ApiConfig;
use crate::error::{Error, FetchError, Result};
use crate::stats::FetchStats;
use crate::types::{Page, ThreadId, ThreadSummary};
use crate::utils::excerpt;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Longest response excerpt carried in an error
const ERROR_EXCERPT_BYTES: usize = 300;

/// Fetcher talking to the web API with a session cookie
///
/// Every request sent bumps the shared request counter, whatever its outcome.
/// Redirects are not followed: the API only redirects unauthenticated sessions
/// to the login page.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
    inbox_limit: u32,
    stats: FetchStats,
}

impl HttpFetcher {
    /// Create a fetcher for the given API settings and session cookie
    ///
    /// # Errors
    /// Returns a configuration error if the session id cannot be sent as a
    /// cookie, the base URL is invalid, or the HTTP client cannot be built.
    pub fn new(api: &ApiConfig, session_id: &str, stats: FetchStats) -> Result<Self> {
        let base_url = Url::parse(&api.base_url).map_err(|e| {
            Error::config("api.base_url", format!("invalid base URL '{}': {}", api.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(
                "api.base_url",
                format!("base URL '{}' cannot carry a path", api.base_url),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(api.timeout)
            .user_agent(api.user_agent.as_str())
            .default_headers(default_headers(api, session_id)?)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            inbox_limit: api.inbox_limit,
            stats,
        })
    }

    /// URL of `base_url` extended with path segments and a trailing slash
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<T, FetchError> {
        self.stats.record_request();
        let response = request.send().await?;
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received API response");

        if let Some(err) = status_error(status, &body, location.as_deref()) {
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            FetchError::Protocol(format!(
                "invalid JSON response ({}): {}",
                e,
                excerpt(&body, ERROR_EXCERPT_BYTES)
            ))
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(
        &self,
        thread: &ThreadId,
        cursor: &str,
    ) -> std::result::Result<Page, FetchError> {
        let url = self.endpoint(&["api", "v1", "direct_v2", "threads", thread.as_str()]);
        debug!(thread_id = %thread, cursor = %cursor, "Requesting thread page");

        let response: ThreadResponse = self
            .get_json(self.client.get(url).query(&[("cursor", cursor)]))
            .await?;
        response.into_page()
    }

    async fn list_threads(&self) -> std::result::Result<Vec<ThreadSummary>, FetchError> {
        let url = self.endpoint(&["api", "v1", "direct_v2", "inbox"]);
        debug!(limit = self.inbox_limit, "Requesting inbox");

        let limit = self.inbox_limit.to_string();
        let response: InboxResponse = self
            .get_json(self.client.get(url).query(&[
                ("persistentBadging", "true"),
                ("folder", ""),
                ("limit", limit.as_str()),
            ]))
            .await?;
        response.into_summaries()
    }
}

/// Browser-like headers the web API expects, plus the session cookie
fn default_headers(api: &ApiConfig, session_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.instagram.com/"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-asbd-id"),
        HeaderValue::from_static("129477"),
    );
    headers.insert(
        HeaderName::from_static("x-ig-www-claim"),
        HeaderValue::from_static("0"),
    );
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers.insert(
        HeaderName::from_static("x-ig-app-id"),
        HeaderValue::from_str(&api.app_id)
            .map_err(|_| Error::config("api.app_id", "app id is not a valid header value"))?,
    );

    let mut cookie = HeaderValue::from_str(&format!("sessionid={}", session_id.trim()))
        .map_err(|_| {
            Error::config(
                "session_id",
                "session id contains characters not allowed in a cookie",
            )
        })?;
    cookie.set_sensitive(true);
    headers.insert(header::COOKIE, cookie);

    Ok(headers)
}

/// Map a non-success status to its failure kind
pub(crate) fn status_error(
    status: StatusCode,
    body: &str,
    location: Option<&str>,
) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let err = match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::BAD_REQUEST => FetchError::BadRequest {
            message: format!(
                "HTTP 400 (invalid thread id, expired session format, or changed API): {}",
                excerpt(body, ERROR_EXCERPT_BYTES)
            ),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Auth {
            reason: format!(
                "HTTP {}: session id is invalid or expired",
                status.as_u16()
            ),
        },
        s if s.is_redirection() => FetchError::Auth {
            reason: format!(
                "HTTP {} redirect to {}: session is not logged in",
                s.as_u16(),
                location.unwrap_or("unknown location")
            ),
        },
        s if s.is_server_error() => FetchError::Transient(format!(
            "HTTP {} {}",
            s.as_u16(),
            s.canonical_reason().unwrap_or("server error")
        )),
        s => FetchError::Protocol(format!(
            "unexpected HTTP {} {}: {}",
            s.as_u16(),
            s.canonical_reason().unwrap_or(""),
            excerpt(body, ERROR_EXCERPT_BYTES)
        )),
    };
    Some(err)
}
