//! Configuration types for fwd-scrub
//!
//! Defines CLI arguments and the task configuration accepted from a JSON
//! file. Values given on the command line override the file.

use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default scrub completion timeout in seconds
pub const DEFAULT_SCRUB_TIMEOUT_SECS: u64 = 300;

/// Default pause between coordinator iterations in seconds
pub const DEFAULT_SLEEP_BETWEEN_ITERATIONS_SECS: u64 = 1;

/// Default interval between scrub status polls in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default cluster name
pub const DEFAULT_CLUSTER: &str = "ceph";

/// Forward-scrub thrasher for CephFS metadata servers
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fwd-scrub",
    version,
    about = "Repeatedly scrub every active MDS rank while other workloads run",
    long_about = "Stress test the MDS by running recursive forward scrubs on every\n\
                  active rank of every filesystem, in a loop, until stopped.\n\n\
                  Waits for all MDS daemons to reach a steady state and for the\n\
                  cluster to be clean before any scrub is started.",
    after_help = "EXAMPLES:\n    \
        # Scrub until Ctrl+C\n    \
        fwd-scrub\n\n    \
        # Scrub for ten minutes with a custom config\n    \
        fwd-scrub --config fwd_scrub.json --duration 600\n\n    \
        # Faster status polling against a named cluster\n    \
        fwd-scrub --cluster backup --poll-interval 5"
)]
pub struct CliArgs {
    /// JSON task configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cluster name
    #[arg(long, value_name = "NAME")]
    pub cluster: Option<String>,

    /// Seconds to wait for one scrub before assuming it is done
    #[arg(long, value_name = "SECS")]
    pub scrub_timeout: Option<u64>,

    /// Seconds to sleep between scrub iterations
    #[arg(long, value_name = "SECS")]
    pub sleep_between_iterations: Option<u64>,

    /// Seconds between scrub status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Path to the ceph CLI
    #[arg(long, env = "CEPH_BIN", default_value = "ceph", value_name = "PATH")]
    pub ceph_bin: String,

    /// Timeout for a single ceph command in seconds
    #[arg(long, default_value = "120", value_name = "SECS")]
    pub command_timeout: u64,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Scrub thrasher task configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Seconds to wait for a scrub to finish before assuming it is done
    pub scrub_timeout: u64,
    /// Seconds to sleep between coordinator iterations
    pub sleep_between_iterations: u64,
    /// Cluster name
    pub cluster: String,
    /// Seconds between scrub status polls
    pub poll_interval: u64,
    /// Seconds between MDS steady-state checks
    pub steady_state_interval: u64,
    /// Give up waiting for clean storage after this many seconds
    pub clean_timeout: Option<u64>,
    /// Seconds between clean checks
    pub clean_poll_interval: u64,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            scrub_timeout: DEFAULT_SCRUB_TIMEOUT_SECS,
            sleep_between_iterations: DEFAULT_SLEEP_BETWEEN_ITERATIONS_SECS,
            cluster: DEFAULT_CLUSTER.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            steady_state_interval: 2,
            clean_timeout: None,
            clean_poll_interval: 3,
        }
    }
}

impl ScrubConfig {
    /// Build from a task configuration value, which must be a JSON object
    ///
    /// `null` is accepted and yields the defaults.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let value = match value {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            serde_json::Value::Object(_) => value,
            _ => return Err(ConfigError::NotAMap),
        };

        let config: Self = serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_json_value(value)
    }

    /// Create from CLI args, reading `--config` first if given
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(cluster) = &args.cluster {
            config.cluster = cluster.clone();
        }
        if let Some(secs) = args.scrub_timeout {
            config.scrub_timeout = secs;
        }
        if let Some(secs) = args.sleep_between_iterations {
            config.sleep_between_iterations = secs;
        }
        if let Some(secs) = args.poll_interval {
            config.poll_interval = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the scrub loop meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        if self.cluster.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cluster".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.clean_poll_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "clean_poll_interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    /// Number of status polls before a scrub is assumed done
    pub fn poll_attempt_budget(&self) -> u64 {
        self.scrub_timeout / self.poll_interval
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn sleep_between_iterations(&self) -> Duration {
        Duration::from_secs(self.sleep_between_iterations)
    }

    pub fn steady_state_interval(&self) -> Duration {
        Duration::from_secs(self.steady_state_interval)
    }

    pub fn clean_timeout(&self) -> Option<Duration> {
        self.clean_timeout.map(Duration::from_secs)
    }

    pub fn clean_poll_interval(&self) -> Duration {
        Duration::from_secs(self.clean_poll_interval)
    }
}
