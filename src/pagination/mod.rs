//! Backward pagination through a thread's history.
//!
//! A run has two phases:
//! 1. **Discovery** - the newest page is fetched with an empty cursor. Its
//!    participants become the [`Members`] map, its first item seeds the store
//!    and its `newest_cursor` is where pagination starts.
//! 2. **Pagination** - a state machine over [`PaginationState`]:
//!    - `Fetching` requests the page at the current cursor, deduplicates its
//!      items into the [`MessageStore`] and applies the date cutoff
//!    - `Draining` means the cutoff was hit; the current page is finished and
//!      the run ends
//!    - `Done` carries the [`StopReason`]
//!
//! Any fetch failure aborts the run immediately (no retries) with an
//! [`Aborted`] error that still carries every message collected so far.

use crate::config::PaginationConfig;
use crate::error::{Aborted, FetchError};
use crate::fetcher::Fetcher;
use crate::stats::FetchStats;
use crate::types::{ItemId, Members, Message, Page, ThreadId};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Messages accepted during a run, newest first
///
/// Append-only; an identifier is never stored twice.
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<ItemId>,
}

/// What happened to one page's items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Items appended to the store
    pub added: usize,
    /// Items skipped because their id was already stored
    pub duplicates: usize,
    /// An item older than the cutoff was met; it and the rest of the page were dropped
    pub cutoff_reached: bool,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message with this id is stored
    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    /// Append a message unless its id is already stored; returns whether it was added
    pub fn push(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.item_id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in accumulation order (newest first)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.iter()
    }

    /// Messages oldest first, the order transcripts are printed in
    pub fn chronological(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }

    /// Merge one page in server order
    ///
    /// Scanning stops at the first item strictly older than `cutoff_micros`;
    /// items before it are still deduplicated and appended.
    pub fn absorb(&mut self, items: Vec<Message>, cutoff_micros: Option<i64>) -> PageOutcome {
        let mut outcome = PageOutcome::default();
        for item in items {
            if cutoff_micros.is_some_and(|cutoff| item.timestamp < cutoff) {
                debug!(item_id = %item.item_id, timestamp = item.timestamp, "Reached cutoff date");
                outcome.cutoff_reached = true;
                break;
            }
            let id = item.item_id.clone();
            if self.push(item) {
                debug!(item_id = %id, "Message added");
                outcome.added += 1;
            } else {
                debug!(item_id = %id, "Duplicate message, skipping");
                outcome.duplicates += 1;
            }
        }
        outcome
    }
}

/// Why a run stopped without failing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The server reported no older page
    Exhausted,
    /// A page came back without items
    EmptyPage,
    /// A message older than the cutoff was reached
    CutoffReached,
    /// No cursor to continue from
    NoCursor,
    /// The server handed back a cursor already fetched in this run
    RepeatedCursor,
    /// Cancellation was requested
    Interrupted,
}

/// Pagination state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaginationState {
    /// Next request goes to `cursor`
    Fetching {
        /// Cursor of the page to request
        cursor: String,
    },
    /// Cutoff reached; the run ends once the current page is recorded
    Draining,
    /// Finished
    Done(StopReason),
}

impl PaginationState {
    /// Initial state for a discovered newest cursor
    pub fn start(newest_cursor: Option<String>) -> Self {
        match newest_cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => PaginationState::Fetching { cursor },
            None => PaginationState::Done(StopReason::NoCursor),
        }
    }

    /// State after a non-empty page was merged
    ///
    /// `visited` holds every cursor already requested in the run.
    pub fn after_page(page: &Page, outcome: &PageOutcome, visited: &HashSet<String>) -> Self {
        if outcome.cutoff_reached {
            return PaginationState::Draining;
        }
        if !page.has_older {
            return PaginationState::Done(StopReason::Exhausted);
        }
        match &page.next_cursor {
            None => PaginationState::Done(StopReason::NoCursor),
            Some(cursor) if visited.contains(cursor) => {
                PaginationState::Done(StopReason::RepeatedCursor)
            }
            Some(cursor) => PaginationState::Fetching {
                cursor: cursor.clone(),
            },
        }
    }
}

/// Messages per second for one page
///
/// Uses whole milliseconds; a page processed in under a millisecond repeats
/// the previous sample.
pub fn page_rate(added: usize, elapsed: Duration, previous: f64) -> f64 {
    let elapsed_ms = elapsed.as_millis();
    if elapsed_ms > 0 {
        (1000.0 * added as f64) / elapsed_ms as f64
    } else {
        previous
    }
}

/// Result of a pagination run
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Accepted messages, newest first
    pub store: MessageStore,
    /// Participants discovered on the first page
    pub members: Members,
    /// Why the run stopped; `None` when it was aborted
    pub stop: Option<StopReason>,
    /// Rate samples, starting with the `0.0` seed
    pub rate_samples: Vec<f64>,
    /// Time spent fetching and merging pages (excludes pacing)
    pub elapsed: Duration,
    /// Pages requested, discovery included
    pub pages_fetched: u64,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            store: MessageStore::new(),
            members: Members::default(),
            stop: None,
            rate_samples: vec![0.0],
            elapsed: Duration::ZERO,
            pages_fetched: 0,
        }
    }
}

impl RunReport {
    /// Arithmetic mean of all rate samples, seed included
    pub fn average_rate(&self) -> f64 {
        if self.rate_samples.is_empty() {
            return 0.0;
        }
        self.rate_samples.iter().sum::<f64>() / self.rate_samples.len() as f64
    }

    /// Most recent rate sample
    pub fn latest_rate(&self) -> f64 {
        self.rate_samples.last().copied().unwrap_or(0.0)
    }
}

/// What discovery learned about a thread
#[derive(Clone, Debug, Default)]
pub struct ThreadSnapshot {
    /// Participants
    pub members: Members,
    /// Cursor pagination starts from
    pub newest_cursor: Option<String>,
    /// Newest message, used to seed the store
    pub newest_message: Option<Message>,
}

impl ThreadSnapshot {
    /// Extract discovery data from the newest page
    pub fn from_page(page: Page) -> Self {
        Self {
            members: Members::from_users(&page.users),
            newest_cursor: page.newest_cursor,
            newest_message: page.items.into_iter().next(),
        }
    }
}

/// Drives a [`Fetcher`] backward through one thread
pub struct Paginator<'a> {
    fetcher: &'a dyn Fetcher,
    config: PaginationConfig,
    stats: FetchStats,
    cancel: CancellationToken,
}

impl<'a> Paginator<'a> {
    /// Create a paginator
    ///
    /// `stats` is updated as pages are merged; `cancel` stops the run before
    /// the next request or during the pacing pause.
    pub fn new(
        fetcher: &'a dyn Fetcher,
        config: PaginationConfig,
        stats: FetchStats,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            config,
            stats,
            cancel,
        }
    }

    /// Fetch the newest page of a thread
    pub async fn discover(&self, thread: &ThreadId) -> Result<ThreadSnapshot, FetchError> {
        let page = self.fetcher.fetch_page(thread, "").await?;
        let snapshot = ThreadSnapshot::from_page(page);
        info!(
            thread_id = %thread,
            members = snapshot.members.len(),
            has_cursor = snapshot.newest_cursor.is_some(),
            "Discovered thread"
        );
        Ok(snapshot)
    }

    /// Discover the thread, then page back through its history
    pub async fn run(&self, thread: &ThreadId) -> Result<RunReport, Aborted> {
        if self.cancel.is_cancelled() {
            return Ok(RunReport {
                stop: Some(StopReason::Interrupted),
                ..Default::default()
            });
        }
        match self.discover(thread).await {
            Ok(snapshot) => match self.paginate(thread, snapshot).await {
                Ok(mut report) => {
                    report.pages_fetched += 1;
                    Ok(report)
                }
                Err(mut aborted) => {
                    aborted.partial.pages_fetched += 1;
                    Err(aborted)
                }
            },
            Err(cause) => {
                warn!(thread_id = %thread, error = %cause, code = cause.error_code(), "Thread discovery failed");
                Err(Aborted {
                    cause,
                    partial: RunReport::default(),
                })
            }
        }
    }

    /// Page back from a discovered snapshot
    pub async fn paginate(
        &self,
        thread: &ThreadId,
        snapshot: ThreadSnapshot,
    ) -> Result<RunReport, Aborted> {
        let cutoff = self.config.cutoff_micros();
        let mut report = RunReport {
            members: snapshot.members,
            ..Default::default()
        };

        let seed = match snapshot.newest_message {
            Some(newest) => report.store.absorb(vec![newest], cutoff),
            None => PageOutcome::default(),
        };
        self.stats.set_messages(report.store.len());

        let mut visited: HashSet<String> = HashSet::new();
        let mut state = if seed.cutoff_reached {
            PaginationState::Done(StopReason::CutoffReached)
        } else {
            PaginationState::start(snapshot.newest_cursor)
        };

        info!(thread_id = %thread, cutoff = ?self.config.cutoff, "Fetching messages");

        let stop = loop {
            state = match state {
                PaginationState::Done(reason) => break reason,
                PaginationState::Draining => PaginationState::Done(StopReason::CutoffReached),
                PaginationState::Fetching { cursor } => {
                    if self.cancel.is_cancelled() {
                        PaginationState::Done(StopReason::Interrupted)
                    } else {
                        match self.step(thread, cursor, &mut visited, &mut report).await {
                            Ok(next) => next,
                            Err(cause) => {
                                warn!(
                                    thread_id = %thread,
                                    error = %cause,
                                    code = cause.error_code(),
                                    messages = report.store.len(),
                                    "Aborting pagination"
                                );
                                return Err(Aborted {
                                    cause,
                                    partial: report,
                                });
                            }
                        }
                    }
                }
            };
        };

        if stop == StopReason::CutoffReached {
            warn!(thread_id = %thread, "Reached cutoff date, stopping");
        }
        info!(
            thread_id = %thread,
            messages = report.store.len(),
            pages = report.pages_fetched,
            average_rate = report.average_rate(),
            stop = ?stop,
            "Pagination finished"
        );
        report.stop = Some(stop);
        Ok(report)
    }

    /// Fetch and merge the page at `cursor`, then pace if another page follows
    async fn step(
        &self,
        thread: &ThreadId,
        cursor: String,
        visited: &mut HashSet<String>,
        report: &mut RunReport,
    ) -> Result<PaginationState, FetchError> {
        let started = Instant::now();
        let mut page = self.fetcher.fetch_page(thread, &cursor).await?;
        visited.insert(cursor);
        report.pages_fetched += 1;

        if page.items.is_empty() {
            debug!(thread_id = %thread, "Empty page");
            return Ok(PaginationState::Done(StopReason::EmptyPage));
        }

        let items = std::mem::take(&mut page.items);
        let outcome = report.store.absorb(items, self.config.cutoff_micros());

        let elapsed = started.elapsed();
        let rate = page_rate(outcome.added, elapsed, report.latest_rate());
        report.rate_samples.push(rate);
        report.elapsed += elapsed;

        self.stats.set_messages(report.store.len());
        self.stats.add_elapsed(elapsed);
        self.stats.set_rate(rate);

        debug!(
            added = outcome.added,
            duplicates = outcome.duplicates,
            cutoff_reached = outcome.cutoff_reached,
            elapsed_ms = elapsed.as_millis() as u64,
            "Merged page"
        );

        let next = PaginationState::after_page(&page, &outcome, visited);
        if matches!(next, PaginationState::Fetching { .. }) && !self.pace().await {
            return Ok(PaginationState::Done(StopReason::Interrupted));
        }
        Ok(next)
    }

    /// Sleep between pages; false if cancelled meanwhile
    async fn pace(&self) -> bool {
        if self.config.page_delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.page_delay) => true,
        }
    }
}
