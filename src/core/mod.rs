//! Monitoring core collaborator
//!
//! The engine does not own monitoring state. It borrows it from a [`Core`]
//! through a scoped [`StateGuard`] held for exactly one table scan, and reads
//! named counters as point-in-time snapshots.
//!
//! # Consistency
//!
//! - One scan sees one consistent state (no change mid-scan)
//! - Separate queries may observe different states
//! - Row handles never outlive the guard they were produced under

mod counters;
mod errors;
mod memory;
mod state;

use std::ops::Deref;

use parking_lot::RwLockReadGuard;

pub use counters::{Counter, CounterRegistry, CounterSnapshot};
pub use errors::{CoreError, CoreResult};
pub use memory::{HostRecord, MemoryCore, ServiceRecord, Snapshot, DEFAULT_LOCK_TIMEOUT};
pub use state::{CoreState, Host, ProgramStatus, Service};

/// State access interface offered by the monitoring core
pub trait Core: Send + Sync {
    /// Acquires the read side of the core state lock.
    ///
    /// Fails with [`CoreError::LockTimeout`] when the lock is not granted in
    /// time; that is the only transient failure.
    fn read_state(&self) -> CoreResult<StateGuard<'_>>;

    /// Current values of every named counter
    fn counters(&self) -> CounterSnapshot;
}

/// Scoped read access to the core state
#[derive(Debug)]
pub struct StateGuard<'a> {
    inner: RwLockReadGuard<'a, CoreState>,
}

impl<'a> StateGuard<'a> {
    pub fn new(inner: RwLockReadGuard<'a, CoreState>) -> Self {
        Self { inner }
    }
}

impl Deref for StateGuard<'_> {
    type Target = CoreState;

    fn deref(&self) -> &CoreState {
        &self.inner
    }
}
