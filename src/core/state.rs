//! Backing structures owned by the monitoring core
//!
//! Tables never own these values. They borrow them through a
//! [`StateGuard`](super::StateGuard) for the duration of one scan.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Global program status block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramStatus {
    pub program_version: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub program_start: DateTime<Utc>,
    pub pid: i64,
    pub interval_length: i64,
    pub enable_notifications: bool,
    pub execute_service_checks: bool,
    pub execute_host_checks: bool,
    pub enable_flap_detection: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_command_check: DateTime<Utc>,
}

impl Default for ProgramStatus {
    fn default() -> Self {
        Self {
            program_version: String::new(),
            program_start: DateTime::<Utc>::default(),
            pid: 0,
            interval_length: 60,
            enable_notifications: true,
            execute_service_checks: true,
            execute_host_checks: true,
            enable_flap_detection: false,
            last_command_check: DateTime::<Utc>::default(),
        }
    }
}

/// One monitored host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub address: String,
    /// 0 = UP, 1 = DOWN, 2 = UNREACHABLE
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
    #[serde(default)]
    pub mk_inventory: Vec<u8>,
}

impl Host {
    /// Creates a host in its initial, never-checked state
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            address: String::new(),
            state: 0,
            has_been_checked: false,
            last_check: DateTime::<Utc>::default(),
            latency: 0.0,
            execution_time: 0.0,
            plugin_output: String::new(),
            perf_data: String::new(),
            contacts: Vec::new(),
            groups: Vec::new(),
            acknowledged: false,
            mk_inventory: Vec::new(),
        }
    }

    pub fn has_contact(&self, contact: &str) -> bool {
        self.contacts.iter().any(|c| c == contact)
    }
}

/// One monitored service, bound to its host
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub host: Arc<Host>,
    pub description: String,
    /// 0 = OK, 1 = WARN, 2 = CRIT, 3 = UNKNOWN
    pub state: i32,
    pub has_been_checked: bool,
    pub last_check: DateTime<Utc>,
    pub latency: f64,
    pub execution_time: f64,
    pub check_interval: f64,
    pub plugin_output: String,
    pub perf_data: String,
    pub contacts: Vec<String>,
    pub groups: Vec<String>,
    pub acknowledged: bool,
}

impl Service {
    pub fn new(host: Arc<Host>, description: impl Into<String>) -> Self {
        Self {
            host,
            description: description.into(),
            state: 0,
            has_been_checked: false,
            last_check: DateTime::<Utc>::default(),
            latency: 0.0,
            execution_time: 0.0,
            check_interval: 1.0,
            plugin_output: String::new(),
            perf_data: String::new(),
            contacts: Vec::new(),
            groups: Vec::new(),
            acknowledged: false,
        }
    }

    pub fn has_contact(&self, contact: &str) -> bool {
        self.contacts.iter().any(|c| c == contact)
    }
}

/// Complete core state visible to tables
///
/// Services hold an `Arc` to their host. Host mutations go through
/// [`CoreState::host_mut`], which copies on write, so every mutation batch
/// must end with [`CoreState::relink`] (done by `MemoryCore::update`).
#[derive(Debug, Clone, Default)]
pub struct CoreState {
    pub program: ProgramStatus,
    hosts: Vec<Arc<Host>>,
    services: Vec<Service>,
    host_index: HashMap<String, usize>,
    services_by_host: HashMap<String, Vec<usize>>,
}

impl CoreState {
    pub fn new(program: ProgramStatus) -> Self {
        Self {
            program,
            ..Default::default()
        }
    }

    /// Adds a host. A host with the same name is replaced.
    pub fn add_host(&mut self, host: Host) {
        match self.host_index.get(&host.name) {
            Some(&idx) => self.hosts[idx] = Arc::new(host),
            None => {
                self.host_index.insert(host.name.clone(), self.hosts.len());
                self.hosts.push(Arc::new(host));
            }
        }
        self.relink();
    }

    /// Adds a service to an existing host and returns it for further setup.
    ///
    /// Returns `None` when the host is unknown.
    pub fn add_service(&mut self, host_name: &str, description: &str) -> Option<&mut Service> {
        let host = Arc::clone(&self.hosts[*self.host_index.get(host_name)?]);
        let idx = self.services.len();
        self.services.push(Service::new(host, description));
        self.services_by_host
            .entry(host_name.to_string())
            .or_default()
            .push(idx);
        self.services.last_mut()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter().map(|h| h.as_ref())
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.host_index.get(name).map(|&idx| self.hosts[idx].as_ref())
    }

    pub fn host_mut(&mut self, name: &str) -> Option<&mut Host> {
        let idx = *self.host_index.get(name)?;
        Some(Arc::make_mut(&mut self.hosts[idx]))
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut [Service] {
        &mut self.services
    }

    /// Services of one host, in insertion order
    pub fn services_of<'a>(&'a self, host_name: &str) -> impl Iterator<Item = &'a Service> + 'a {
        self.services_by_host
            .get(host_name)
            .map(|idxs| idxs.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&idx| &self.services[idx])
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn num_services(&self) -> usize {
        self.services.len()
    }

    /// Re-points every service at the current `Arc` of its host and
    /// rebuilds the lookup indexes. Services of removed hosts are dropped.
    pub fn relink(&mut self) {
        self.host_index = self
            .hosts
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.name.clone(), idx))
            .collect();

        let hosts = &self.hosts;
        let index = &self.host_index;
        self.services.retain(|s| index.contains_key(&s.host.name));
        for service in &mut self.services {
            let current = &hosts[index[&service.host.name]];
            if !Arc::ptr_eq(current, &service.host) {
                service.host = Arc::clone(current);
            }
        }

        self.services_by_host.clear();
        for (idx, service) in self.services.iter().enumerate() {
            self.services_by_host
                .entry(service.host.name.clone())
                .or_default()
                .push(idx);
        }
    }

    /// Removes a host and all of its services
    pub fn remove_host(&mut self, name: &str) -> bool {
        let before = self.hosts.len();
        self.hosts.retain(|h| h.name != name);
        let removed = self.hosts.len() != before;
        if removed {
            self.relink();
        }
        removed
    }
}
