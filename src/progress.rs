//! Live "Fetching messages..." status line
//!
//! A background task redraws one carriage-return-terminated line from a
//! [`FetchStats`] handle until its token is cancelled.

use crate::stats::{FetchStats, StatsSnapshot};
use std::io::Write;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Hours, minutes and seconds of a duration, hours wrapping at 24
pub fn split_hms(elapsed: Duration) -> (u64, u64, u64) {
    let secs = elapsed.as_secs();
    ((secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Render the status line for a snapshot, without the trailing `\r`
///
/// The dot animation cycles with elapsed seconds and is padded to a
/// fixed width so the counters do not jump.
pub fn status_line(snapshot: &StatsSnapshot) -> String {
    let (hours, minutes, seconds) = split_hms(snapshot.elapsed);
    let dot_count = (snapshot.elapsed.as_secs() % 3) as usize + 1;
    format!(
        "Fetching messages{}{}({}h{}m{}s) ({} messages in {} requests) (Rate: {:.2} msg/s)",
        ".".repeat(dot_count),
        " ".repeat(4 - dot_count),
        hours,
        minutes,
        seconds,
        snapshot.messages,
        snapshot.requests,
        snapshot.rate
    )
}

/// Periodically redraws the status line
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    stats: FetchStats,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter over shared stats
    pub fn new(stats: FetchStats, interval: Duration) -> Self {
        Self { stats, interval }
    }

    /// Draw to stderr until `token` is cancelled
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        self.spawn_with_writer(std::io::stderr(), token)
    }

    /// Draw to `writer` until `token` is cancelled
    ///
    /// Write errors are ignored; the line is cosmetic.
    pub fn spawn_with_writer<W>(self, mut writer: W, token: CancellationToken) -> JoinHandle<()>
    where
        W: Write + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(10)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let line = status_line(&self.stats.snapshot());
                        let _ = write!(writer, "{}\r", line);
                        let _ = writer.flush();
                    }
                }
            }
            // leave the cursor on a fresh line for whatever prints next
            let _ = writeln!(writer);
            let _ = writer.flush();
        })
    }
}
