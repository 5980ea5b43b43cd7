//! Error types for inbox-dl
//!
//! This module provides the error taxonomy for the library:
//! - [`FetchError`] - the distinguishable failures of a single API request
//! - [`Aborted`] - a pagination run that stopped on a fetch failure, carrying
//!   everything collected before the failure
//! - [`Error`] - the crate-wide error used by configuration, export and the facade

use crate::pagination::RunReport;
use thiserror::Error;

/// Result type alias for inbox-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for inbox-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "session_id")
        key: Option<String>,
    },

    /// A single API request failed outside of a pagination run (e.g. inbox listing)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Pagination run aborted; partial results are attached
    #[error(transparent)]
    Aborted(Box<Aborted>),

    /// Cutoff date could not be parsed
    #[error("invalid date '{input}': expected dd/mm/YYYY or dd/mm/YYYY@HH:MM:SS")]
    InvalidDate {
        /// The rejected input
        input: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used as a structured logging field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Fetch(e) => e.error_code(),
            Error::Aborted(a) => a.cause.error_code(),
            Error::InvalidDate { .. } => "invalid_date",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Aborted> for Error {
    fn from(aborted: Aborted) -> Self {
        Error::Aborted(Box::new(aborted))
    }
}

/// Failure of one API request
///
/// Every variant is fatal to a pagination run: nothing is retried, and
/// `RateLimited` in particular must stop further requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Session cookie rejected (HTTP 401/403 or `login_required`)
    #[error("unauthorized: {reason}")]
    Auth {
        /// What the server reported
        reason: String,
    },

    /// HTTP 400, usually a malformed thread id or a changed API shape
    #[error("bad request: {message}")]
    BadRequest {
        /// Server response excerpt
        message: String,
    },

    /// HTTP 429
    #[error("rate limited by server (HTTP 429)")]
    RateLimited,

    /// Timeout, connection failure or server-side 5xx
    #[error("transient network failure: {0}")]
    Transient(String),

    /// Response did not have the expected structure
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FetchError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::Auth { .. } => "auth_error",
            FetchError::BadRequest { .. } => "bad_request",
            FetchError::RateLimited => "rate_limited",
            FetchError::Transient(_) => "transient",
            FetchError::Protocol(_) => "protocol_error",
        }
    }

    /// Whether the failure is of a kind that could succeed on a later attempt.
    ///
    /// Informational only: runs never retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Protocol(format!("failed to decode response: {}", e))
        } else if e.is_timeout() {
            FetchError::Transient(format!("request timed out: {}", e))
        } else if e.is_connect() {
            FetchError::Transient(format!("connection failed: {}", e))
        } else {
            FetchError::Transient(e.to_string())
        }
    }
}

/// A pagination run that stopped because a request failed
///
/// The partial report holds every message accepted before the failure, so
/// callers can still export it.
#[derive(Debug, Error)]
#[error("pagination aborted after {count} messages: {cause}", count = .partial.store.len())]
pub struct Aborted {
    /// The request failure that ended the run
    #[source]
    pub cause: FetchError,
    /// Everything collected up to the failure
    pub partial: RunReport,
}

impl Aborted {
    /// Whether the run was stopped by the server's rate limiter
    pub fn is_rate_limited(&self) -> bool {
        self.cause == FetchError::RateLimited
    }
}
