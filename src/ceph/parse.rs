//! JSON replies from the ceph CLI

use crate::cluster::{ClusterStatus, FsId, FsInfo, MdsInfo, Rank};
use crate::error::{CommandError, CommandResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

const STANDBY_REPLAY: &str = "up:standby-replay";
const ACTIVE_CLEAN: &str = "active+clean";

#[derive(Debug, Deserialize)]
struct MdsEntry {
    name: String,
    state: String,
    #[serde(default = "no_rank")]
    rank: i64,
}

fn no_rank() -> i64 {
    -1
}

impl MdsEntry {
    fn into_info(self) -> MdsInfo {
        MdsInfo {
            name: self.name,
            state: self.state,
            rank: Rank::try_from(self.rank).ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MdsMap {
    #[serde(default)]
    fs_name: String,
    #[serde(default)]
    info: HashMap<String, MdsEntry>,
}

#[derive(Debug, Deserialize)]
struct FsEntry {
    id: FsId,
    mdsmap: MdsMap,
}

#[derive(Debug, Deserialize)]
struct FsDump {
    #[serde(default)]
    standbys: Vec<MdsEntry>,
    #[serde(default)]
    filesystems: Vec<FsEntry>,
}

#[derive(Debug, Deserialize)]
struct PgStateCount {
    name: String,
    num: u64,
}

#[derive(Debug, Deserialize)]
struct PgSummary {
    #[serde(default)]
    num_pg_by_state: Vec<PgStateCount>,
    num_pgs: u64,
}

#[derive(Debug, Deserialize)]
struct PgStat {
    pg_summary: PgSummary,
}

fn decode<T: for<'de> Deserialize<'de>>(command: &str, value: &Value) -> CommandResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| CommandError::InvalidOutput {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

fn require<'a>(command: &str, value: Option<&'a Value>) -> CommandResult<&'a Value> {
    value.ok_or_else(|| CommandError::InvalidOutput {
        command: command.to_string(),
        reason: "empty output".into(),
    })
}

/// Parse command stdout; empty output is an absent reply
pub fn parse_json_output(command: &str, stdout: &[u8]) -> CommandResult<Option<Value>> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| CommandError::InvalidOutput {
            command: command.to_string(),
            reason: e.to_string(),
        })
}

/// Ranks held in a `fs get` reply, skipping standby-replay daemons
pub fn mds_ranks(command: &str, value: Option<&Value>) -> CommandResult<Vec<Rank>> {
    let entry: FsEntry = decode(command, require(command, value)?)?;
    let ranks: BTreeSet<Rank> = entry
        .mdsmap
        .info
        .into_values()
        .filter(|mds| mds.state != STANDBY_REPLAY)
        .filter_map(|mds| Rank::try_from(mds.rank).ok())
        .collect();
    Ok(ranks.into_iter().collect())
}

/// MDS daemons and filesystems from an `fs dump` reply
pub fn cluster_status(command: &str, value: Option<&Value>) -> CommandResult<ClusterStatus> {
    let dump: FsDump = decode(command, require(command, value)?)?;

    let mut status = ClusterStatus::default();
    status
        .mds
        .extend(dump.standbys.into_iter().map(MdsEntry::into_info));

    for fs in dump.filesystems {
        status.filesystems.push(FsInfo {
            id: fs.id,
            name: fs.mdsmap.fs_name,
        });
        let mut daemons: Vec<MdsInfo> = fs.mdsmap.info.into_values().map(MdsEntry::into_info).collect();
        daemons.sort_by(|a, b| a.name.cmp(&b.name));
        status.mds.extend(daemons);
    }

    Ok(status)
}

/// Whether a `pg stat` reply shows every PG active+clean
pub fn pgs_clean(command: &str, value: Option<&Value>) -> CommandResult<bool> {
    let stat: PgStat = decode(command, require(command, value)?)?;
    let clean: u64 = stat
        .pg_summary
        .num_pg_by_state
        .iter()
        .filter(|s| s.name == ACTIVE_CLEAN)
        .map(|s| s.num)
        .sum();
    Ok(clean == stat.pg_summary.num_pgs)
}
