//! Forward scrub task driver
//!
//! Waits for the MDS cluster to settle, starts one [`ScrubCoordinator`] per
//! filesystem, and registers each with the run's [`ThrasherRegistry`].
//! Teardown stops and joins every forward scrubber and turns the first
//! captured failure into a single run-ending error.

use crate::cluster::{Cluster, ClusterStatus};
use crate::config::ScrubConfig;
use crate::error::{ConfigError, Result, ThrashError};
use crate::scrub::{ScrubCoordinator, ScrubStatsSnapshot, FWD_SCRUB_KIND};
use crate::thrasher::ThrasherRegistry;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Wait until every MDS is active, standby, or standby-replay
///
/// Fails up front if the cluster has no MDS at all.
pub async fn wait_for_steady_state(
    cluster: &dyn Cluster,
    config: &ScrubConfig,
) -> Result<ClusterStatus> {
    info!("Wait for all MDSs to reach steady state...");
    let mut status = cluster.status().await?;
    if status.mds.is_empty() {
        return Err(ConfigError::NoMetadataServers.into());
    }

    while let Some(info) = status.first_unsteady() {
        debug!(mds = %info.name, state = %info.state, "MDS not in steady state");
        tokio::time::sleep(config.steady_state_interval()).await;
        status = cluster.status().await?;
    }

    Ok(status)
}

/// Stop and join every forward scrubber in the registry
///
/// Every scrubber is stopped and joined even if an earlier one failed; the
/// first captured failure is returned afterwards.
pub async fn stop_all_fwd_scrubbers(thrashers: &ThrasherRegistry) -> Result<()> {
    let mut first_failure: Option<Arc<ThrashError>> = None;

    for thrasher in thrashers.of_kind(FWD_SCRUB_KIND) {
        thrasher.stop();
        if let Some(err) = thrasher.exception() {
            error!(thrasher = %thrasher.name(), error = %err, "scrub thrasher failed");
            first_failure.get_or_insert(err);
        }
        thrasher.join().await;
        if let Some(err) = thrasher.exception() {
            first_failure.get_or_insert(err);
        }
        thrashers.remove(thrasher.name());
    }

    match first_failure {
        Some(err) => Err(ThrashError::ScrubThrashing(format!(
            "error during scrub thrashing: {err}"
        ))),
        None => Ok(()),
    }
}

/// Forward scrubbers started for one run
pub struct ScrubRegistry {
    thrashers: Arc<ThrasherRegistry>,
    coordinators: Vec<Arc<ScrubCoordinator>>,
}

impl ScrubRegistry {
    /// Wait for a steady, clean cluster and start scrubbing every filesystem
    pub async fn start(
        cluster: Arc<dyn Cluster>,
        config: ScrubConfig,
        thrashers: Arc<ThrasherRegistry>,
    ) -> Result<Self> {
        let status = wait_for_steady_state(cluster.as_ref(), &config).await?;
        info!("Ready to start scrub thrashing");

        cluster.wait_for_clean().await?;
        if !cluster.is_clean().await? {
            return Err(ThrashError::ClusterNotClean(
                "storage not clean after wait_for_clean".into(),
            ));
        }

        let mut coordinators = Vec::with_capacity(status.filesystems.len());
        for fs in &status.filesystems {
            let coordinator = Arc::new(ScrubCoordinator::new(cluster.filesystem(fs), config.clone()));
            coordinator.start();
            info!(fs = %fs.name, fscid = fs.id, "started forward scrubber");
            thrashers.add(coordinator.clone());
            coordinators.push(coordinator);
        }

        Ok(Self {
            thrashers,
            coordinators,
        })
    }

    pub fn coordinators(&self) -> &[Arc<ScrubCoordinator>] {
        &self.coordinators
    }

    /// Per-filesystem counters
    pub fn stats(&self) -> Vec<(String, ScrubStatsSnapshot)> {
        self.coordinators
            .iter()
            .map(|c| (c.filesystem().name().to_string(), c.stats()))
            .collect()
    }

    /// Counters summed across all filesystems
    pub fn total_stats(&self) -> ScrubStatsSnapshot {
        let mut total = ScrubStatsSnapshot::default();
        for (_, stats) in self.stats() {
            total.merge(&stats);
        }
        total
    }

    /// Stop and join all forward scrubbers
    pub async fn teardown(&self) -> Result<()> {
        info!("joining ForwardScrubbers");
        let result = stop_all_fwd_scrubbers(&self.thrashers).await;
        for (fs, stats) in self.stats() {
            info!(
                fs = %fs,
                iterations = stats.iterations,
                started = stats.scrubs_started,
                completed = stats.scrubs_completed,
                timed_out = stats.scrubs_timed_out,
                cancelled = stats.scrubs_cancelled,
                failed = stats.scrubs_failed,
                "scrub thrashing summary"
            );
        }
        info!("done joining");
        result
    }
}
