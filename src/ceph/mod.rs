//! ceph CLI backed cluster access
//!
//! Every call runs `ceph --cluster <name> <args...> --format=json` through
//! `tokio::process`. The child is killed if the calling future is dropped,
//! so cancelling a rank scrubber mid-command does not leak processes.

pub mod parse;

use crate::cluster::{Cluster, ClusterStatus, Filesystem, FsId, FsInfo, Rank};
use crate::config::ScrubConfig;
use crate::error::{CommandError, CommandResult, Result, ThrashError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Settings for the ceph CLI
#[derive(Debug, Clone)]
pub struct CephCliConfig {
    /// Path to the ceph binary
    pub binary: String,
    /// Cluster name passed as `--cluster`
    pub cluster: String,
    /// Per-command timeout
    pub command_timeout: Duration,
    /// Give up waiting for clean storage after this long
    pub clean_timeout: Option<Duration>,
    /// Interval between clean checks
    pub clean_poll_interval: Duration,
}

impl CephCliConfig {
    pub fn new(binary: impl Into<String>, config: &ScrubConfig, command_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            cluster: config.cluster.clone(),
            command_timeout,
            clean_timeout: config.clean_timeout(),
            clean_poll_interval: config.clean_poll_interval(),
        }
    }
}

/// Cluster access through the ceph CLI
#[derive(Debug, Clone)]
pub struct CephCli {
    config: Arc<CephCliConfig>,
}

impl CephCli {
    pub fn new(config: CephCliConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run a ceph command and parse its JSON output
    pub async fn run_json(&self, args: &[String]) -> CommandResult<Option<Value>> {
        let cmdline = format!("{} {}", self.config.binary, args.join(" "));
        debug!(command = %cmdline, "running ceph command");

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--cluster")
            .arg(&self.config.cluster)
            .args(args)
            .arg("--format=json")
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.command_timeout, cmd.output()).await {
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: cmdline,
                    after: self.config.command_timeout,
                })
            }
            Ok(Err(e)) => {
                return Err(CommandError::Spawn {
                    command: cmdline,
                    reason: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: cmdline,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse::parse_json_output(&cmdline, &output.stdout)
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }
}

#[async_trait::async_trait]
impl Cluster for CephCli {
    async fn status(&self) -> CommandResult<ClusterStatus> {
        let reply = self.run_json(&Self::args(&["fs", "dump"])).await?;
        parse::cluster_status("fs dump", reply.as_ref())
    }

    async fn wait_for_clean(&self) -> Result<()> {
        let start = Instant::now();
        info!("waiting for clean");

        loop {
            match self.is_clean().await {
                Ok(true) => {
                    info!(elapsed = ?start.elapsed(), "cluster is clean");
                    return Ok(());
                }
                Ok(false) => debug!("not clean yet"),
                Err(e) if e.is_transient() => warn!(error = %e, "failed to check pg state"),
                Err(e) => return Err(e.into()),
            }

            if let Some(limit) = self.config.clean_timeout {
                if start.elapsed() >= limit {
                    return Err(ThrashError::ClusterNotClean(format!(
                        "not clean after {limit:?}"
                    )));
                }
            }
            tokio::time::sleep(self.config.clean_poll_interval).await;
        }
    }

    async fn is_clean(&self) -> CommandResult<bool> {
        let reply = self.run_json(&Self::args(&["pg", "stat"])).await?;
        parse::pgs_clean("pg stat", reply.as_ref())
    }

    fn filesystem(&self, fs: &FsInfo) -> Arc<dyn Filesystem> {
        Arc::new(CephFilesystem {
            cli: self.clone(),
            info: fs.clone(),
        })
    }
}

/// One filesystem addressed through the ceph CLI
#[derive(Debug, Clone)]
pub struct CephFilesystem {
    cli: CephCli,
    info: FsInfo,
}

#[async_trait::async_trait]
impl Filesystem for CephFilesystem {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn id(&self) -> FsId {
        self.info.id
    }

    async fn get_all_mds_rank(&self) -> CommandResult<Vec<Rank>> {
        let reply = self
            .cli
            .run_json(&CephCli::args(&["fs", "get", &self.info.name]))
            .await?;
        parse::mds_ranks("fs get", reply.as_ref())
    }

    async fn rank_tell(&self, command: &[String], rank: Rank) -> CommandResult<Option<Value>> {
        let mut args = vec!["tell".to_string(), format!("mds.{}:{}", self.info.name, rank)];
        args.extend_from_slice(command);
        self.cli.run_json(&args).await
    }
}
