//! Forward scrub thrashing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          ScrubCoordinator (one per filesystem)      │
//! ├─────────────────────────────────────────────────────┤
//! │  loop until stopped:                                │
//! │    get_all_mds_rank()                               │
//! │         │                                           │
//! │         ▼                                           │
//! │  ┌────────────┐ ┌────────────┐      ┌────────────┐  │
//! │  │RankScrubber│ │RankScrubber│ ...  │RankScrubber│  │
//! │  │  rank 0    │ │  rank 1    │      │  rank N    │  │
//! │  │ start+poll │ │ start+poll │      │ start+poll │  │
//! │  └─────┬──────┘ └─────┬──────┘      └─────┬──────┘  │
//! │        └──────────────┼───────────────────┘         │
//! │                       ▼                             │
//! │            join all, check failure slots            │
//! │                       │                             │
//! │            sleep_between_iterations                 │
//! └─────────────────────────────────────────────────────┘
//! ```

mod coordinator;
mod rank;
mod reply;
mod stats;

pub use coordinator::{ScrubCoordinator, FWD_SCRUB_KIND};
pub use rank::{scrub_options, RankScrubber, ScrubOutcome, ScrubTask, SCRUB_ROOT};
pub use reply::{
    parse_start_reply, parse_status_reply, ScrubProgress, ScrubStarted, ASYNC_MODE,
    NO_ACTIVE_SCRUBS,
};
pub use stats::{ScrubStats, ScrubStatsSnapshot};
