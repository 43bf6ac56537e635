//! MDS cluster status snapshot

use super::{FsId, Rank};

/// MDS states in which fault injection may begin
pub const STEADY_STATES: [&str; 3] = ["up:active", "up:standby", "up:standby-replay"];

/// One MDS daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdsInfo {
    /// Daemon name
    pub name: String,
    /// State string, e.g. `up:active`
    pub state: String,
    /// Held rank, if any
    pub rank: Option<Rank>,
}

impl MdsInfo {
    pub fn is_steady(&self) -> bool {
        STEADY_STATES.contains(&self.state.as_str())
    }
}

/// One filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsInfo {
    pub id: FsId,
    pub name: String,
}

/// Snapshot of every MDS daemon and every filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStatus {
    pub mds: Vec<MdsInfo>,
    pub filesystems: Vec<FsInfo>,
}

impl ClusterStatus {
    /// True when every MDS is active, standby, or standby-replay
    pub fn is_steady(&self) -> bool {
        self.mds.iter().all(MdsInfo::is_steady)
    }

    /// First daemon that is not in a steady state
    pub fn first_unsteady(&self) -> Option<&MdsInfo> {
        self.mds.iter().find(|info| !info.is_steady())
    }
}
