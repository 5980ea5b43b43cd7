//! # inbox-dl
//!
//! Download the full message history of a direct-message thread through the
//! web API, authenticated with a browser session cookie.
//!
//! ## Design Philosophy
//!
//! inbox-dl is designed to be:
//! - **Library-first** - the CLI is a thin wrapper over [`InboxDownloader`]
//! - **Fail-fast** - a failed request ends the run, but never loses what was collected
//! - **Pluggable transport** - pagination only sees the [`Fetcher`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use inbox_dl::{Config, InboxDownloader, ThreadId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("your-sessionid-cookie");
//!     config.progress.enabled = false;
//!
//!     let downloader = InboxDownloader::new(config)?;
//!
//!     for thread in downloader.list_threads().await? {
//!         println!("{} - {}", thread.name, thread.thread_id);
//!     }
//!
//!     let report = downloader
//!         .fetch_thread(&ThreadId::new("340282366841710300949128"))
//!         .await?;
//!     for line in inbox_dl::export::render_transcript(&report.store, &report.members, &chrono::Local) {
//!         println!("{}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// High-level downloader
pub mod downloader;
/// Error types
pub mod error;
/// Transcript rendering and file export
pub mod export;
/// API access behind the `Fetcher` trait
pub mod fetcher;
/// Per-message display text
pub mod format;
/// Backward pagination and deduplication
pub mod pagination;
/// Live status line
pub mod progress;
/// Shared run counters
pub mod stats;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ExportFormat};
pub use downloader::InboxDownloader;
pub use error::{Aborted, Error, FetchError, Result};
pub use fetcher::{Fetcher, HttpFetcher};
pub use pagination::{MessageStore, RunReport, StopReason};
pub use stats::{FetchStats, StatsSnapshot};
pub use types::{ItemId, Members, Message, Page, ThreadId, ThreadSummary};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns early without cancelling if the token is cancelled by someone else.
///
/// # Example
///
/// ```no_run
/// use inbox_dl::{Config, InboxDownloader, cancel_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = InboxDownloader::new(Config::new("sessionid"))?;
///     tokio::spawn(cancel_on_signal(downloader.cancellation_token()));
///
///     // Ctrl+C now interrupts the run and keeps what was fetched
///     let _report = downloader.download().await;
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = wait_for_signal() => {
            tracing::warn!("Interrupted, keeping messages fetched so far");
            token.cancel();
        }
    }
}

/// Resolves on the first SIGTERM or SIGINT; [`cancel_on_signal`] turns it into a run interrupt
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolves on Ctrl+C; [`cancel_on_signal`] turns it into a run interrupt
#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
