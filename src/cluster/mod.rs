//! Cluster collaborator interfaces
//!
//! The scrub thrasher only needs a narrow view of the cluster:
//! - Run an MDS `tell` command against one rank of a filesystem
//! - List the ranks currently held by a filesystem
//! - Snapshot MDS daemon states and the active filesystems
//! - Check that the underlying storage is clean
//!
//! These are traits so the coordinator can be driven by the `ceph` CLI in
//! production and by scripted fakes in tests.

mod status;

pub use status::{ClusterStatus, FsInfo, MdsInfo, STEADY_STATES};

use crate::error::{CommandResult, Result};
use std::sync::Arc;

/// Identifier of one MDS rank within a filesystem
pub type Rank = u32;

/// Filesystem identifier (fscid)
pub type FsId = i64;

/// One filesystem under test
#[async_trait::async_trait]
pub trait Filesystem: Send + Sync {
    /// Filesystem name, used for logging and for addressing MDS ranks
    fn name(&self) -> &str;

    /// Filesystem identifier
    fn id(&self) -> FsId;

    /// Ranks currently held by an MDS; may change between calls (failover)
    async fn get_all_mds_rank(&self) -> CommandResult<Vec<Rank>>;

    /// Run an MDS command on one rank
    ///
    /// `Ok(None)` means the command ran but produced no reply.
    async fn rank_tell(&self, command: &[String], rank: Rank)
        -> CommandResult<Option<serde_json::Value>>;
}

/// Cluster-wide health and topology
#[async_trait::async_trait]
pub trait Cluster: Send + Sync {
    /// Snapshot of MDS daemon states and filesystems
    async fn status(&self) -> CommandResult<ClusterStatus>;

    /// Block until storage reports clean
    async fn wait_for_clean(&self) -> Result<()>;

    /// Whether storage is clean right now
    async fn is_clean(&self) -> CommandResult<bool>;

    /// Handle for one filesystem from the status snapshot
    fn filesystem(&self, fs: &FsInfo) -> Arc<dyn Filesystem>;
}
