//! In-process core collaborator
//!
//! Holds the monitoring state behind a `parking_lot` read/write lock.
//! Readers wait at most `lock_timeout` for the guard; writers batch their
//! mutations through [`MemoryCore::update`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use super::counters::{CounterRegistry, CounterSnapshot};
use super::errors::{CoreError, CoreResult};
use super::state::{CoreState, Host, ProgramStatus};
use super::{Core, StateGuard};

/// Default wait for the state lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Service entry of a snapshot file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRecord {
    pub description: String,
    #[serde(default)]
    pub state: i32,
    #[serde(default)]
    pub has_been_checked: bool,
    #[serde(default, with = "chrono::serde::ts_seconds")]
    pub last_check: DateTime<Utc>,
    #[serde(default)]
    pub latency: f64,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,
    #[serde(default)]
    pub plugin_output: String,
    #[serde(default)]
    pub perf_data: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub acknowledged: bool,
}

fn default_check_interval() -> f64 {
    1.0
}

/// Host entry of a snapshot file, services nested
#[derive(Debug, Clone, Deserialize)]
pub struct HostRecord {
    #[serde(flatten)]
    pub host: Host,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
}

/// JSON snapshot of a core state
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub program: ProgramStatus,
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> CoreResult<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::InvalidSnapshot(e.to_string()))
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidSnapshot(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Builds the core state. Duplicate host names are rejected.
    pub fn into_state(self) -> CoreResult<CoreState> {
        let mut state = CoreState::new(self.program);
        let mut pending = Vec::with_capacity(self.hosts.len());
        for record in self.hosts {
            if state.host(&record.host.name).is_some() {
                return Err(CoreError::InvalidSnapshot(format!(
                    "duplicate host '{}'",
                    record.host.name
                )));
            }
            let name = record.host.name.clone();
            state.add_host(record.host);
            pending.push((name, record.services));
        }

        for (host_name, services) in pending {
            for record in services {
                let service =
                    state.add_service(&host_name, &record.description).ok_or_else(|| {
                        CoreError::InvalidSnapshot(format!("unknown host '{}'", host_name))
                    })?;
                service.state = record.state;
                service.has_been_checked = record.has_been_checked;
                service.last_check = record.last_check;
                service.latency = record.latency;
                service.execution_time = record.execution_time;
                service.check_interval = record.check_interval;
                service.plugin_output = record.plugin_output;
                service.perf_data = record.perf_data;
                service.contacts = record.contacts;
                service.groups = record.groups;
                service.acknowledged = record.acknowledged;
            }
        }
        Ok(state)
    }
}

/// Core collaborator backed by process memory
#[derive(Debug)]
pub struct MemoryCore {
    state: RwLock<CoreState>,
    counters: CounterRegistry,
    lock_timeout: Duration,
}

impl MemoryCore {
    pub fn new(state: CoreState) -> Self {
        Self::with_lock_timeout(state, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(state: CoreState, lock_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(state),
            counters: CounterRegistry::new(),
            lock_timeout,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot, lock_timeout: Duration) -> CoreResult<Self> {
        Ok(Self::with_lock_timeout(snapshot.into_state()?, lock_timeout))
    }

    /// Applies one batch of mutations under the write lock.
    ///
    /// Readers never observe a half-applied batch.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CoreState) -> R,
    {
        let mut state = self.state.write();
        let result = f(&mut state);
        state.relink();
        result
    }

    /// Counter registry for the core's own bookkeeping
    pub fn counter_registry(&self) -> &CounterRegistry {
        &self.counters
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}

impl Core for MemoryCore {
    fn read_state(&self) -> CoreResult<StateGuard<'_>> {
        self.state
            .try_read_for(self.lock_timeout)
            .map(StateGuard::new)
            .ok_or(CoreError::LockTimeout(self.lock_timeout.as_millis() as u64))
    }

    fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}
