//! Integration tests for fwd-scrub
//!
//! These run the driver against in-memory fakes; no Ceph cluster is needed.

mod common;

use common::{mds, FakeCluster, FakeFs};
use fwd_scrub::cluster::ClusterStatus;
use fwd_scrub::error::{ConfigError, ThrashError};
use fwd_scrub::{wait_for_steady_state, ScrubConfig, ScrubRegistry, Thrasher, ThrasherRegistry};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn start_registry(
    cluster: FakeCluster,
) -> impl std::future::Future<Output = fwd_scrub::Result<ScrubRegistry>> {
    ScrubRegistry::start(
        Arc::new(cluster),
        ScrubConfig::default(),
        Arc::new(ThrasherRegistry::new()),
    )
}

#[test]
fn test_config_file_loading() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"scrub_timeout": 120, "cluster": "backup"}}"#).unwrap();

    let config = ScrubConfig::load(file.path()).unwrap();
    assert_eq!(config.scrub_timeout, 120);
    assert_eq!(config.cluster, "backup");
    assert_eq!(config.poll_interval, 30);
    assert_eq!(config.poll_attempt_budget(), 4);
}

#[test]
fn test_config_file_must_be_a_map() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[1, 2, 3]").unwrap();

    let err = ScrubConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotAMap));
    assert!(err.to_string().contains("dict"));
}

#[test]
fn test_config_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScrubConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_steady_state() {
    let fs = Arc::new(FakeFs::new("cephfs", vec![0]));
    let joining = ClusterStatus {
        mds: vec![mds("a", "up:active"), mds("b", "up:rejoin")],
        filesystems: vec![],
    };
    let cluster = FakeCluster::steady(vec![fs]).with_statuses_before(vec![joining.clone(), joining]);

    let status = wait_for_steady_state(&cluster, &ScrubConfig::default())
        .await
        .unwrap();

    assert!(status.is_steady());
    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_metadata_servers() {
    let cluster = FakeCluster::steady(vec![]).with_status(ClusterStatus::default());

    let err = wait_for_steady_state(&cluster, &ScrubConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ThrashError::Config(ConfigError::NoMetadataServers)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unclean_cluster_starts_nothing() {
    let fs = Arc::new(FakeFs::new("cephfs", vec![0]));
    let cluster = FakeCluster::steady(vec![fs.clone()]).unclean();

    let err = start_registry(cluster).await.err().unwrap();
    assert!(matches!(err, ThrashError::ClusterNotClean(_)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fs.starts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_clean_storage() {
    let fs = Arc::new(FakeFs::new("cephfs", vec![0]));
    let cluster = Arc::new(FakeCluster::steady(vec![fs.clone()]).clean_after(3));
    let started = tokio::time::Instant::now();

    let registry = ScrubRegistry::start(
        cluster.clone(),
        ScrubConfig::default(),
        Arc::new(ThrasherRegistry::new()),
    )
    .await
    .unwrap();

    // three dirty checks, the clean one ending the wait, then the final check
    assert_eq!(cluster.clean_checks(), 5);
    assert!(started.elapsed() >= Duration::from_secs(9));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fs.starts(), 1);
    registry.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_one_scrubber_per_filesystem() {
    let a = Arc::new(FakeFs::new("cephfs", vec![0, 1]));
    let b = Arc::new(FakeFs::new("backup", vec![0]).with_id(2));
    let thrashers = Arc::new(ThrasherRegistry::new());

    let registry = ScrubRegistry::start(
        Arc::new(FakeCluster::steady(vec![a.clone(), b.clone()])),
        ScrubConfig::default(),
        thrashers.clone(),
    )
    .await
    .unwrap();

    assert_eq!(registry.coordinators().len(), 2);
    assert_eq!(thrashers.len(), 2);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    registry.teardown().await.unwrap();

    assert!(thrashers.is_empty());
    assert_eq!(a.starts(), 4);
    assert_eq!(b.starts(), 2);
    let total = registry.total_stats();
    assert_eq!(total.iterations, 4);
    assert_eq!(total.scrubs_completed, 6);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_reports_failure_and_stops_everything() {
    let broken = Arc::new(FakeFs::new("cephfs", vec![0]).start_reply(0, None));
    let healthy = Arc::new(FakeFs::new("backup", vec![0]).with_id(2).never_finishes());
    let thrashers = Arc::new(ThrasherRegistry::new());

    let registry = ScrubRegistry::start(
        Arc::new(FakeCluster::steady(vec![broken, healthy])),
        ScrubConfig::default(),
        thrashers.clone(),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_secs(45)).await;
    let err = registry.teardown().await.unwrap_err();

    assert!(err.to_string().starts_with("error during scrub thrashing"));
    assert!(err.to_string().contains("rank 0"));
    assert!(thrashers.is_empty());
    for coordinator in registry.coordinators() {
        assert!(coordinator.is_stopping());
        assert_eq!(coordinator.in_flight_len(), 0);
    }

    let stats = registry.stats();
    let backup = &stats.iter().find(|(fs, _)| fs == "backup").unwrap().1;
    assert_eq!(backup.scrubs_cancelled, 1);
    assert_eq!(backup.scrubs_failed, 0);
}

/// Some other fault injector sharing the registry
struct Killer;

#[async_trait::async_trait]
impl Thrasher for Killer {
    fn name(&self) -> &str {
        "thrasher.mds_killer"
    }

    fn kind(&self) -> &'static str {
        "mds_thrash"
    }

    fn stop(&self) {}

    async fn join(&self) {}

    fn exception(&self) -> Option<Arc<ThrashError>> {
        None
    }
}

#[tokio::test(start_paused = true)]
async fn test_teardown_leaves_other_thrashers() {
    let fs = Arc::new(FakeFs::new("cephfs", vec![0]));
    let thrashers = Arc::new(ThrasherRegistry::new());
    thrashers.add(Arc::new(Killer));

    let registry = ScrubRegistry::start(
        Arc::new(FakeCluster::steady(vec![fs])),
        ScrubConfig::default(),
        thrashers.clone(),
    )
    .await
    .unwrap();
    assert_eq!(thrashers.len(), 2);

    registry.teardown().await.unwrap();
    assert_eq!(thrashers.len(), 1);
    assert_eq!(thrashers.snapshot()[0].name(), "thrasher.mds_killer");
}
