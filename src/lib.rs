//! fwd-scrub - Forward scrub thrasher for CephFS
//!
//! Stress tests the metadata servers by repeatedly running asynchronous
//! recursive scrubs on every active MDS rank while other workloads run,
//! to shake out concurrency and consistency bugs under load.
//!
//! # Features
//!
//! - **Per-rank scrubbing**: one scrubber task per active rank, started
//!   together and joined together on every iteration.
//!
//! - **Bounded status polling**: each scrub is polled until its tag is gone;
//!   after `scrub_timeout` the scrub is assumed done rather than failed.
//!
//! - **Race-free cancellation**: `stop()` cancels every in-flight scrubber
//!   at its next suspension point without reporting a failure.
//!
//! - **First-failure-wins**: failures are captured where they happen and
//!   surfaced once, at teardown.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ScrubRegistry                            │
//! │   wait for steady MDS state + clean storage, then per fs:       │
//! └───────────────┬─────────────────────────────┬───────────────────┘
//!                 │                             │
//!                 ▼                             ▼
//!      ┌─────────────────────┐       ┌─────────────────────┐
//!      │  ScrubCoordinator   │  ...  │  ScrubCoordinator   │
//!      │   (fs "cephfs")     │       │   (fs "backup")     │
//!      └──────────┬──────────┘       └─────────────────────┘
//!                 │ per iteration
//!       ┌─────────┼──────────┐
//!       ▼         ▼          ▼
//!  ┌─────────┐┌─────────┐┌─────────┐
//!  │ rank 0  ││ rank 1  ││ rank N  │   scrub start / scrub status
//!  └─────────┘└─────────┘└─────────┘   via `ceph tell mds.<fs>:<rank>`
//! ```
//!
//! # Example
//!
//! ```bash
//! # Scrub until Ctrl+C
//! fwd-scrub
//!
//! # Scrub for ten minutes, polling status every 10 seconds
//! fwd-scrub --duration 600 --poll-interval 10
//! ```

pub mod ceph;
pub mod cluster;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod scrub;
pub mod thrasher;

pub use config::{CliArgs, ScrubConfig};
pub use driver::{stop_all_fwd_scrubbers, wait_for_steady_state, ScrubRegistry};
pub use error::{Result, ThrashError};
pub use scrub::{RankScrubber, ScrubCoordinator, ScrubOutcome};
pub use thrasher::{FailureSlot, Thrasher, ThrasherRegistry};
