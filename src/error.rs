//! Error types for fwd-scrub
//!
//! This module defines the error hierarchy for the scrub thrasher:
//! - Protocol errors: a scrub reply that is missing or signals rejection
//! - Command errors: the remote command could not be run at all
//! - Coordination errors: a fanned-out rank scrubber recorded a failure
//! - Configuration errors
//!
//! Protocol errors are always fatal to the scrubber that sees them. Command
//! errors raised while polling are retried. Cancellation is its own variant
//! so teardown can tell it apart from a genuine failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cluster::Rank;

/// Top-level error type for fwd-scrub
#[derive(Error, Debug)]
pub enum ThrashError {
    /// Malformed or rejecting scrub reply
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Remote command could not be executed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// A rank scrubber failed during a coordinator iteration
    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage did not become clean before scrubbing could start
    #[error("Cluster is not clean: {0}")]
    ClusterNotClean(String),

    /// Run-ending error surfaced at teardown
    #[error("{0}")]
    ScrubThrashing(String),

    /// Unit was stopped by its owner
    #[error("Operation cancelled")]
    Cancelled,
}

impl ThrashError {
    /// True for the controlled teardown signal, which is never a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ThrashError::Cancelled)
    }
}

/// Scrub start/status reply errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The command produced no reply
    #[error("No response to '{command}'")]
    MissingResponse { command: String },

    /// Start reply carried no scrub tag
    #[error("Scrub start response has no scrub_tag")]
    MissingTag,

    /// Start reply signalled rejection
    #[error("Scrub start returned non-zero return_code {code}")]
    NonZeroReturnCode { code: i64 },

    /// Start reply was not asynchronous
    #[error("Scrub start mode is '{mode}', expected 'asynchronous'")]
    UnexpectedMode { mode: String },

    /// Reply could not be interpreted
    #[error("Malformed response to '{command}': {reason}")]
    MalformedResponse { command: String, reason: String },
}

/// Remote command execution errors
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// Could not launch the command
    #[error("Failed to run '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// Command exited non-zero
    #[error("'{command}' exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// Command did not finish in time
    #[error("'{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    /// Command output was not the expected JSON
    #[error("Invalid output from '{command}': {reason}")]
    InvalidOutput { command: String, reason: String },
}

impl CommandError {
    /// Transport-level failures worth retrying on the next poll
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CommandError::Failed { .. } | CommandError::Timeout { .. } | CommandError::Spawn { .. }
        )
    }
}

/// Errors raised by a coordinator after joining its rank scrubbers
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// A rank scrubber captured a failure
    #[error("error during scrub thrashing on fs '{fs}' rank {rank}: {source}")]
    UnitFailed {
        fs: String,
        rank: Rank,
        source: Arc<ThrashError>,
    },

    /// A rank scrubber task panicked
    #[error("rank scrubber for fs '{fs}' rank {rank} panicked: {message}")]
    UnitPanicked {
        fs: String,
        rank: Rank,
        message: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Task configuration was not a JSON object
    #[error("fwd_scrub task only accepts a dict for configuration")]
    NotAMap,

    /// No metadata server in the target topology
    #[error("fwd_scrub task requires at least 1 metadata server")]
    NoMetadataServers,

    /// A field had an unusable value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Configuration file could not be read or parsed
    #[error("Cannot read configuration '{path}': {reason}")]
    Read { path: PathBuf, reason: String },
}

/// Result type alias for ThrashError
pub type Result<T> = std::result::Result<T, ThrashError>;

/// Result type alias for CommandError
pub type CommandResult<T> = std::result::Result<T, CommandError>;
