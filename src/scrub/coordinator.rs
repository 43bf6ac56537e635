//! Scrub coordinator - forward scrubbing of one filesystem
//!
//! Each iteration discovers the current MDS ranks, fans out one
//! [`RankScrubber`] per rank, joins them all, and fails the coordinator if
//! any of them captured a failure. Iterations repeat until [`stop`] is
//! called.
//!
//! The in-flight set is the only state shared with `stop()`. Appending,
//! draining, and cancelling all happen under one lock, and a unit is never
//! appended once the stopping flag is set, so `stop()` cannot miss a unit.
//!
//! [`stop`]: ScrubCoordinator::stop

use super::rank::RankScrubber;
use super::stats::{ScrubStats, ScrubStatsSnapshot};
use crate::cluster::{Filesystem, Rank};
use crate::config::ScrubConfig;
use crate::error::{CoordinationError, Result, ThrashError};
use crate::thrasher::{FailureSlot, Thrasher};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

/// Thrasher kind for forward scrubbers
pub const FWD_SCRUB_KIND: &str = "fwd_scrub";

/// A rank scrubber that has been started and not yet joined
struct InFlightScrub {
    rank: Rank,
    cancel: CancellationToken,
    failure: Arc<FailureSlot>,
}

/// Forward scrubber for one filesystem
pub struct ScrubCoordinator {
    name: String,
    fs: Arc<dyn Filesystem>,
    config: ScrubConfig,
    stopping: CancellationToken,
    in_flight: Mutex<Vec<InFlightScrub>>,
    failure: FailureSlot,
    stats: Arc<ScrubStats>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScrubCoordinator {
    /// Create a coordinator for one filesystem
    pub fn new(fs: Arc<dyn Filesystem>, config: ScrubConfig) -> Self {
        Self {
            name: format!("thrasher.fs.[{}]", fs.name()),
            fs,
            config,
            stopping: CancellationToken::new(),
            in_flight: Mutex::new(Vec::new()),
            failure: FailureSlot::new(),
            stats: Arc::new(ScrubStats::default()),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the scrub loop as a background task
    ///
    /// Only the first call spawns; later calls are ignored, so `join()`
    /// always waits on the one loop.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            debug!(fs = %self.fs.name(), "scrub loop already started");
            return;
        }
        let this = Arc::clone(self);
        let span = info_span!("fwd_scrub", fs = %self.fs.name());
        *handle = Some(tokio::spawn(async move { this.run().await }.instrument(span)));
    }

    /// Run the scrub loop to completion, capturing any failure
    pub async fn run(&self) {
        if let Err(e) = self.do_scrub().await {
            if !e.is_cancellation() {
                error!(error = %e, "exception:");
                self.failure.record(e);
            }
        }
    }

    /// Stop scrubbing and cancel every in-flight rank scrubber
    ///
    /// Idempotent. Never fails; check [`exception`](Thrasher::exception)
    /// after joining.
    pub fn stop(&self) {
        self.stopping.cancel();
        let in_flight = self.in_flight.lock();
        info!(fs = %self.fs.name(), count = in_flight.len(), "killing all scrubbers");
        for unit in in_flight.iter() {
            unit.cancel.cancel();
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    /// Number of rank scrubbers started and not yet joined
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn stats(&self) -> ScrubStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.fs
    }

    /// Perform the filesystem scrubbing until stopped
    async fn do_scrub(&self) -> Result<()> {
        info!(fs = %self.fs.name(), fscid = self.fs.id(), "starting do_scrub");

        while !self.stopping.is_cancelled() {
            let ranks = tokio::select! {
                _ = self.stopping.cancelled() => break,
                ranks = self.fs.get_all_mds_rank() => ranks?,
            };
            self.stats.record_iteration();

            let mut handles = Vec::with_capacity(ranks.len());
            for rank in ranks {
                let scrubber =
                    RankScrubber::new(Arc::clone(&self.fs), rank, &self.config, Arc::clone(&self.stats));
                {
                    let mut in_flight = self.in_flight.lock();
                    if self.stopping.is_cancelled() {
                        break;
                    }
                    in_flight.push(InFlightScrub {
                        rank,
                        cancel: scrubber.cancel_token(),
                        failure: scrubber.failure(),
                    });
                }
                let span = info_span!("rank", rank);
                handles.push((rank, tokio::spawn(scrubber.run().instrument(span))));
            }

            debug!(count = handles.len(), "joining all scrubbers");
            let mut panicked = None;
            for (rank, handle) in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() && panicked.is_none() {
                        panicked = Some((rank, e.to_string()));
                    }
                }
            }

            let finished = std::mem::take(&mut *self.in_flight.lock());
            if let Some((rank, source)) = finished
                .iter()
                .find_map(|unit| unit.failure.get().map(|err| (unit.rank, err)))
            {
                return Err(CoordinationError::UnitFailed {
                    fs: self.fs.name().to_string(),
                    rank,
                    source,
                }
                .into());
            }
            if let Some((rank, message)) = panicked {
                return Err(CoordinationError::UnitPanicked {
                    fs: self.fs.name().to_string(),
                    rank,
                    message,
                }
                .into());
            }

            tokio::select! {
                _ = self.stopping.cancelled() => break,
                _ = tokio::time::sleep(self.config.sleep_between_iterations()) => {}
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Thrasher for ScrubCoordinator {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        FWD_SCRUB_KIND
    }

    fn stop(&self) {
        ScrubCoordinator::stop(self);
    }

    async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    self.failure.record(ThrashError::ScrubThrashing(format!(
                        "{} panicked: {}",
                        self.name, e
                    )));
                }
            }
        }
    }

    fn exception(&self) -> Option<Arc<ThrashError>> {
        self.failure.get()
    }
}
