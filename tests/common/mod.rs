//! In-memory cluster fakes for integration tests

#![allow(dead_code)]

use fwd_scrub::cluster::{Cluster, ClusterStatus, Filesystem, FsId, FsInfo, MdsInfo, Rank};
use fwd_scrub::error::{CommandError, CommandResult, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Scripted filesystem
///
/// Every scrub start succeeds with a fresh tag unless a rank has a start
/// override. Status polls report the tag as running for `polls_until_done`
/// polls and then drop it from the map.
pub struct FakeFs {
    name: String,
    id: FsId,
    rank_script: Mutex<VecDeque<Vec<Rank>>>,
    last_ranks: Mutex<Vec<Rank>>,
    start_overrides: Mutex<HashMap<Rank, Option<Value>>>,
    status_errors: Mutex<u64>,
    polls_until_done: u64,
    start_barrier: Option<Arc<Barrier>>,
    discovery_fails_after: Option<u64>,
    panic_on_status: bool,
    next_tag: AtomicU64,
    tag_polls: Mutex<HashMap<String, u64>>,
    pub discoveries: AtomicU64,
    pub starts: AtomicU64,
    pub polls: AtomicU64,
}

impl FakeFs {
    pub fn new(name: &str, ranks: Vec<Rank>) -> Self {
        Self {
            name: name.to_string(),
            id: 1,
            rank_script: Mutex::new(VecDeque::new()),
            last_ranks: Mutex::new(ranks),
            start_overrides: Mutex::new(HashMap::new()),
            status_errors: Mutex::new(0),
            polls_until_done: 0,
            start_barrier: None,
            discovery_fails_after: None,
            panic_on_status: false,
            next_tag: AtomicU64::new(1),
            tag_polls: Mutex::new(HashMap::new()),
            discoveries: AtomicU64::new(0),
            starts: AtomicU64::new(0),
            polls: AtomicU64::new(0),
        }
    }

    pub fn with_id(mut self, id: FsId) -> Self {
        self.id = id;
        self
    }

    /// Status reports the tag as running for this many polls
    pub fn polls_until_done(mut self, polls: u64) -> Self {
        self.polls_until_done = polls;
        self
    }

    /// Status never drops the tag
    pub fn never_finishes(self) -> Self {
        self.polls_until_done(u64::MAX)
    }

    /// Ranks returned by successive discoveries; the last one repeats
    pub fn rank_script(self, script: Vec<Vec<Rank>>) -> Self {
        *self.rank_script.lock() = script.into();
        self
    }

    /// Replace the start reply for one rank
    pub fn start_reply(self, rank: Rank, reply: Option<Value>) -> Self {
        self.start_overrides.lock().insert(rank, reply);
        self
    }

    /// Fail this many status polls with a transport error first
    pub fn status_errors(self, count: u64) -> Self {
        *self.status_errors.lock() = count;
        self
    }

    /// Every scrub start waits until `parties` starts are in flight
    pub fn start_barrier(mut self, parties: usize) -> Self {
        self.start_barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Rank discovery fails once this many discoveries have succeeded
    pub fn discovery_fails_after(mut self, successes: u64) -> Self {
        self.discovery_fails_after = Some(successes);
        self
    }

    /// Status polls panic instead of replying
    pub fn panic_on_status(mut self) -> Self {
        self.panic_on_status = true;
        self
    }

    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn discoveries(&self) -> u64 {
        self.discoveries.load(Ordering::SeqCst)
    }

    async fn start(&self, rank: Rank) -> CommandResult<Option<Value>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.start_barrier {
            barrier.wait().await;
        }
        if let Some(reply) = self.start_overrides.lock().get(&rank) {
            return Ok(reply.clone());
        }
        let tag = format!("tag-{}", self.next_tag.fetch_add(1, Ordering::SeqCst));
        Ok(Some(json!({"scrub_tag": tag, "return_code": 0, "mode": "asynchronous"})))
    }

    fn status(&self) -> CommandResult<Option<Value>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_status {
            panic!("status handler crashed");
        }
        {
            let mut errors = self.status_errors.lock();
            if *errors > 0 {
                *errors -= 1;
                return Err(CommandError::Failed {
                    command: "scrub status".into(),
                    status: 110,
                    stderr: "Connection timed out".into(),
                });
            }
        }

        let mut tag_polls = self.tag_polls.lock();
        let issued = self.next_tag.load(Ordering::SeqCst);
        let mut scrubs = serde_json::Map::new();
        for n in 1..issued {
            let tag = format!("tag-{n}");
            let seen = tag_polls.entry(tag.clone()).or_insert(0);
            *seen += 1;
            if *seen <= self.polls_until_done {
                scrubs.insert(tag.clone(), json!({"path": "/", "tag": tag, "options": "recursive,force"}));
            }
        }
        Ok(Some(json!({"status": "scrub active", "scrubs": scrubs})))
    }
}

#[async_trait::async_trait]
impl Filesystem for FakeFs {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> FsId {
        self.id
    }

    async fn get_all_mds_rank(&self) -> CommandResult<Vec<Rank>> {
        let done = self.discoveries.fetch_add(1, Ordering::SeqCst);
        if self.discovery_fails_after.is_some_and(|limit| done >= limit) {
            return Err(CommandError::Failed {
                command: format!("fs get {}", self.name),
                status: 2,
                stderr: "Error ENOENT: filesystem not found".into(),
            });
        }
        let next = self.rank_script.lock().pop_front();
        let mut last = self.last_ranks.lock();
        if let Some(ranks) = next {
            *last = ranks;
        }
        Ok(last.clone())
    }

    async fn rank_tell(&self, command: &[String], rank: Rank) -> CommandResult<Option<Value>> {
        match command.get(1).map(String::as_str) {
            Some("start") => self.start(rank).await,
            Some("status") => self.status(),
            _ => Err(CommandError::InvalidOutput {
                command: command.join(" "),
                reason: "unknown command".into(),
            }),
        }
    }
}

/// Scripted cluster holding a set of fake filesystems
pub struct FakeCluster {
    statuses: Mutex<VecDeque<ClusterStatus>>,
    last_status: Mutex<ClusterStatus>,
    clean: bool,
    unclean_checks: AtomicU64,
    filesystems: HashMap<String, Arc<FakeFs>>,
    pub status_calls: AtomicU64,
    clean_checks: AtomicU64,
}

impl FakeCluster {
    /// Steady cluster with one active MDS per filesystem
    pub fn steady(filesystems: Vec<Arc<FakeFs>>) -> Self {
        let status = ClusterStatus {
            mds: filesystems
                .iter()
                .map(|fs| mds(&format!("{}-a", fs.name()), "up:active"))
                .collect(),
            filesystems: filesystems
                .iter()
                .map(|fs| FsInfo {
                    id: fs.id(),
                    name: fs.name().to_string(),
                })
                .collect(),
        };
        Self {
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(status),
            clean: true,
            unclean_checks: AtomicU64::new(0),
            filesystems: filesystems
                .into_iter()
                .map(|fs| (fs.name().to_string(), fs))
                .collect(),
            status_calls: AtomicU64::new(0),
            clean_checks: AtomicU64::new(0),
        }
    }

    /// Statuses returned before the steady one
    pub fn with_statuses_before(self, statuses: Vec<ClusterStatus>) -> Self {
        *self.statuses.lock() = statuses.into();
        self
    }

    pub fn with_status(self, status: ClusterStatus) -> Self {
        *self.last_status.lock() = status;
        self
    }

    /// The first `count` clean checks report dirty storage
    pub fn clean_after(self, count: u64) -> Self {
        self.unclean_checks.store(count, Ordering::SeqCst);
        self
    }

    pub fn clean_checks(&self) -> u64 {
        self.clean_checks.load(Ordering::SeqCst)
    }

    pub fn unclean(mut self) -> Self {
        self.clean = false;
        self
    }

    pub fn steady_status(&self) -> ClusterStatus {
        self.last_status.lock().clone()
    }
}

#[async_trait::async_trait]
impl Cluster for FakeCluster {
    async fn status(&self) -> CommandResult<ClusterStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.last_status.lock().clone()))
    }

    async fn wait_for_clean(&self) -> Result<()> {
        if !self.clean {
            return Ok(());
        }
        while !self.is_clean().await? {
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        Ok(())
    }

    async fn is_clean(&self) -> CommandResult<bool> {
        self.clean_checks.fetch_add(1, Ordering::SeqCst);
        let dirty = self
            .unclean_checks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(self.clean && !dirty)
    }

    fn filesystem(&self, fs: &FsInfo) -> Arc<dyn Filesystem> {
        self.filesystems[&fs.name].clone()
    }
}

pub fn mds(name: &str, state: &str) -> MdsInfo {
    MdsInfo {
        name: name.to_string(),
        state: state.to_string(),
        rank: None,
    }
}
