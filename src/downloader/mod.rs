//! High-level entry point tying fetcher, pagination, progress and export together.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::write_transcript;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::pagination::{Paginator, RunReport};
use crate::progress::ProgressReporter;
use crate::stats::FetchStats;
use crate::types::{ThreadId, ThreadSummary};
use chrono::Local;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Statistics describe the latest run: [`InboxDownloader::fetch_thread`]
/// resets them before its first request.
#[derive(Clone)]
pub struct InboxDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Transport used for every request
    fetcher: Arc<dyn Fetcher>,
    /// Counters shared with the fetcher and the progress line
    stats: FetchStats,
    /// Cancels runs in progress (Ctrl-C handling hooks in here)
    cancel: CancellationToken,
}

impl InboxDownloader {
    /// Create a downloader talking to the web API
    ///
    /// # Errors
    /// Returns a configuration error if the config does not validate or the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let stats = FetchStats::new();
        let fetcher = HttpFetcher::new(&config.api, &config.session_id, stats.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), stats))
    }

    /// Create a downloader over any [`Fetcher`]
    ///
    /// `stats` should be the handle the fetcher records requests on.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>, stats: FetchStats) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            stats,
            cancel: CancellationToken::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the run counters
    pub fn stats(&self) -> FetchStats {
        self.stats.clone()
    }

    /// Token that interrupts runs of this downloader when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Interrupt any run in progress; collected messages are kept
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.cancel.cancel();
    }

    /// List the threads of the inbox
    pub async fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        let threads = self.fetcher.list_threads().await?;
        info!(threads = threads.len(), "Fetched inbox");
        Ok(threads)
    }

    /// Download one thread's history
    ///
    /// A failed request ends the run with [`Error::Aborted`], which carries
    /// the messages collected up to that point.
    pub async fn fetch_thread(&self, thread: &ThreadId) -> Result<RunReport> {
        thread.validate()?;
        self.stats.reset();

        let progress = self.config.progress_enabled().then(|| {
            let token = self.cancel.child_token();
            let handle = ProgressReporter::new(self.stats.clone(), self.config.progress.interval)
                .spawn(token.clone());
            (token, handle)
        });

        let paginator = Paginator::new(
            self.fetcher.as_ref(),
            self.config.pagination.clone(),
            self.stats.clone(),
            self.cancel.clone(),
        );
        let result = paginator.run(thread).await;

        if let Some((token, handle)) = progress {
            token.cancel();
            let _ = handle.await;
        }

        Ok(result?)
    }

    /// Download the configured thread and write the export file, if any
    ///
    /// An aborted run still exports what it collected before the error is
    /// returned.
    pub async fn download(&self) -> Result<RunReport> {
        let thread = self
            .config
            .thread_id
            .as_deref()
            .map(ThreadId::new)
            .ok_or_else(|| Error::config("thread_id", "no thread id was provided"))?;

        match self.fetch_thread(&thread).await {
            Ok(report) => {
                self.export(&report).await?;
                Ok(report)
            }
            Err(Error::Aborted(aborted)) => {
                if let Err(e) = self.export(&aborted.partial).await {
                    error!(error = %e, "Failed to export partial transcript");
                }
                Err(Error::Aborted(aborted))
            }
            Err(e) => Err(e),
        }
    }

    /// Write `report` to the configured output file; no-op without one
    pub async fn export(&self, report: &RunReport) -> Result<()> {
        let Some(path) = &self.config.export.output else {
            return Ok(());
        };
        write_transcript(
            path,
            self.config.export.format,
            &report.store,
            &report.members,
            &Local,
        )
        .await
    }
}
