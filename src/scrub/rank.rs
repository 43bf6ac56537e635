//! Rank scrubber - drives one scrub to completion on one MDS rank
//!
//! Starts an asynchronous scrub, then polls `scrub status` until the tag is
//! gone, the MDS goes idle, or the attempt budget runs out. Running out of
//! attempts is not an error: the scrub is assumed done.

use super::reply::{parse_start_reply, parse_status_reply, ScrubProgress};
use super::stats::ScrubStats;
use crate::cluster::{Filesystem, Rank};
use crate::config::ScrubConfig;
use crate::error::{Result, ThrashError};
use crate::thrasher::FailureSlot;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Scrub root used by the thrasher
pub const SCRUB_ROOT: &str = "/";

/// A scrub launched on one rank, identified by its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubTask {
    pub fs: String,
    pub rank: Rank,
    pub tag: String,
    pub started_at: DateTime<Utc>,
}

/// How a rank scrubber ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubOutcome {
    /// Status reported the scrub finished
    Completed,
    /// Attempt budget exhausted; assumed done
    TimedOut,
    /// Stopped by the owning coordinator
    Cancelled,
    /// Failure captured in the scrubber's failure slot
    Failed,
}

/// Options for `scrub start`
pub fn scrub_options(recursive: bool) -> &'static [&'static str] {
    if recursive {
        &["recursive", "force"]
    } else {
        &["force"]
    }
}

/// Drives one scrub on one rank
pub struct RankScrubber {
    fs: Arc<dyn Filesystem>,
    rank: Rank,
    poll_interval: Duration,
    max_attempts: u64,
    cancel: CancellationToken,
    failure: Arc<FailureSlot>,
    stats: Arc<ScrubStats>,
}

impl RankScrubber {
    /// Create a new rank scrubber
    pub fn new(
        fs: Arc<dyn Filesystem>,
        rank: Rank,
        config: &ScrubConfig,
        stats: Arc<ScrubStats>,
    ) -> Self {
        Self {
            fs,
            rank,
            poll_interval: config.poll_interval(),
            max_attempts: config.poll_attempt_budget(),
            cancel: CancellationToken::new(),
            failure: Arc::new(FailureSlot::new()),
            stats,
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Token that cancels this scrubber at its next suspension point
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Slot holding the failure captured by [`run`](Self::run)
    pub fn failure(&self) -> Arc<FailureSlot> {
        Arc::clone(&self.failure)
    }

    /// Scrub the whole filesystem recursively and record the outcome
    ///
    /// Never returns an error: failures go to the failure slot so sibling
    /// scrubbers are unaffected.
    pub async fn run(self) -> ScrubOutcome {
        let outcome = match self.do_scrub(SCRUB_ROOT, true).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancellation() => ScrubOutcome::Cancelled,
            Err(e) => {
                error!(rank = self.rank, error = %e, "exception:");
                self.failure.record(e);
                ScrubOutcome::Failed
            }
        };

        match outcome {
            ScrubOutcome::Completed => self.stats.record_completed(),
            ScrubOutcome::TimedOut => self.stats.record_timed_out(),
            ScrubOutcome::Cancelled => self.stats.record_cancelled(),
            ScrubOutcome::Failed => self.stats.record_failed(),
        }
        outcome
    }

    /// Start a scrub at `path` and wait for it
    pub async fn do_scrub(&self, path: &str, recursive: bool) -> Result<ScrubOutcome> {
        let mut command = vec!["scrub".to_string(), "start".to_string(), path.to_string()];
        command.extend(scrub_options(recursive).iter().map(|opt| opt.to_string()));

        let reply = self.tell(&command).await?;
        let started = parse_start_reply(reply.as_ref())?;
        self.stats.record_started();

        let task = ScrubTask {
            fs: self.fs.name().to_string(),
            rank: self.rank,
            tag: started.tag,
            started_at: Utc::now(),
        };
        info!(fs = %task.fs, rank = task.rank, tag = %task.tag, path, "scrub started");

        self.wait_until_scrub_complete(&task).await
    }

    /// Poll `scrub status` until the task's tag is done or attempts run out
    pub async fn wait_until_scrub_complete(&self, task: &ScrubTask) -> Result<ScrubOutcome> {
        let command = vec!["scrub".to_string(), "status".to_string()];

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                self.sleep(self.poll_interval).await?;
            }

            let reply = match self.tell(&command).await {
                Ok(reply) => reply,
                Err(ThrashError::Command(e)) if e.is_transient() => {
                    self.stats.record_poll_error();
                    warn!(rank = task.rank, attempt, error = %e, "exception while getting scrub status");
                    info!("retrying scrub status command in a while");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match parse_status_reply(reply.as_ref(), &task.tag)? {
                ScrubProgress::NoneActive => {
                    info!(rank = task.rank, "all active scrubs completed");
                    return Ok(ScrubOutcome::Completed);
                }
                ScrubProgress::Finished => {
                    info!(rank = task.rank, tag = %task.tag, "scrub has completed");
                    return Ok(ScrubOutcome::Completed);
                }
                ScrubProgress::Running(status) => {
                    info!(rank = task.rank, tag = %task.tag, attempt, %status, "scrub status");
                }
            }
        }

        let waited = Utc::now() - task.started_at;
        info!(
            rank = task.rank,
            tag = %task.tag,
            waited_secs = waited.num_seconds(),
            "timed out waiting for scrub to complete"
        );
        Ok(ScrubOutcome::TimedOut)
    }

    async fn tell(&self, command: &[String]) -> Result<Option<serde_json::Value>> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ThrashError::Cancelled),
            reply = self.fs.rank_tell(command, self.rank) => Ok(reply?),
        }
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ThrashError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
