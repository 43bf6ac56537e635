//! Thrasher framework
//!
//! A thrasher is a long-running fault-injection unit. Every thrasher can be
//! stopped, joined, and asked for the first failure it captured, so a
//! teardown sequence can handle different kinds of thrashers the same way.
//!
//! Thrashers never propagate failures across the task boundary. They record
//! them in a [`FailureSlot`] and the owner inspects the slot after `join`.

use crate::error::ThrashError;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

/// A registrable fault-injection unit
#[async_trait::async_trait]
pub trait Thrasher: Send + Sync {
    /// Unique display name
    fn name(&self) -> &str;

    /// Thrasher family, used by teardown to pick the units it owns
    fn kind(&self) -> &'static str;

    /// Request shutdown; must be idempotent and never fail
    fn stop(&self);

    /// Wait until the unit has fully exited
    async fn join(&self);

    /// First failure captured by the unit, if any
    fn exception(&self) -> Option<Arc<ThrashError>>;
}

/// Set-once failure slot: the first recorded failure wins
#[derive(Debug, Default)]
pub struct FailureSlot {
    inner: OnceLock<Arc<ThrashError>>,
}

impl FailureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; returns false if one was already recorded
    ///
    /// Cancellation is a teardown signal and is never recorded.
    pub fn record(&self, err: ThrashError) -> bool {
        if err.is_cancellation() {
            return false;
        }
        self.inner.set(Arc::new(err)).is_ok()
    }

    pub fn get(&self) -> Option<Arc<ThrashError>> {
        self.inner.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// Registry of the thrashers active during a run
///
/// Owned by the top-level driver and passed down explicitly.
#[derive(Default)]
pub struct ThrasherRegistry {
    thrashers: Mutex<Vec<Arc<dyn Thrasher>>>,
}

impl ThrasherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, thrasher: Arc<dyn Thrasher>) {
        self.thrashers.lock().push(thrasher);
    }

    /// Remove a thrasher by name
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Thrasher>> {
        let mut thrashers = self.thrashers.lock();
        let idx = thrashers.iter().position(|t| t.name() == name)?;
        Some(thrashers.remove(idx))
    }

    /// Copy of the current registrations, safe to iterate across awaits
    pub fn snapshot(&self) -> Vec<Arc<dyn Thrasher>> {
        self.thrashers.lock().clone()
    }

    /// Registered thrashers of one kind
    pub fn of_kind(&self, kind: &str) -> Vec<Arc<dyn Thrasher>> {
        self.thrashers
            .lock()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.thrashers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.thrashers.lock().is_empty()
    }
}
