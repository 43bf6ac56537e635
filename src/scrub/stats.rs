//! Scrub thrashing counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a coordinator and its rank scrubbers
#[derive(Debug, Default)]
pub struct ScrubStats {
    pub iterations: AtomicU64,
    pub scrubs_started: AtomicU64,
    pub scrubs_completed: AtomicU64,
    pub scrubs_timed_out: AtomicU64,
    pub scrubs_cancelled: AtomicU64,
    pub scrubs_failed: AtomicU64,
    pub poll_errors: AtomicU64,
}

impl ScrubStats {
    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_started(&self) {
        self.scrubs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.scrubs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.scrubs_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.scrubs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.scrubs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScrubStatsSnapshot {
        ScrubStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            scrubs_started: self.scrubs_started.load(Ordering::Relaxed),
            scrubs_completed: self.scrubs_completed.load(Ordering::Relaxed),
            scrubs_timed_out: self.scrubs_timed_out.load(Ordering::Relaxed),
            scrubs_cancelled: self.scrubs_cancelled.load(Ordering::Relaxed),
            scrubs_failed: self.scrubs_failed.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ScrubStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrubStatsSnapshot {
    pub iterations: u64,
    pub scrubs_started: u64,
    pub scrubs_completed: u64,
    pub scrubs_timed_out: u64,
    pub scrubs_cancelled: u64,
    pub scrubs_failed: u64,
    pub poll_errors: u64,
}

impl ScrubStatsSnapshot {
    pub fn merge(&mut self, other: &ScrubStatsSnapshot) {
        self.iterations += other.iterations;
        self.scrubs_started += other.scrubs_started;
        self.scrubs_completed += other.scrubs_completed;
        self.scrubs_timed_out += other.scrubs_timed_out;
        self.scrubs_cancelled += other.scrubs_cancelled;
        self.scrubs_failed += other.scrubs_failed;
        self.poll_errors += other.poll_errors;
    }
}
