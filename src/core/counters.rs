//! Named core counters
//!
//! Counters are monotonic and live outside the state lock. Each counter
//! also carries an averaged per-second rate, refreshed by the core's
//! housekeeping through [`CounterRegistry::update_rates`].

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Counters exposed by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    NebCallbacks,
    Requests,
    Connections,
    ServiceChecks,
    HostChecks,
    Forks,
    LogMessages,
    ExternalCommands,
}

impl Counter {
    pub const ALL: [Counter; 8] = [
        Counter::NebCallbacks,
        Counter::Requests,
        Counter::Connections,
        Counter::ServiceChecks,
        Counter::HostChecks,
        Counter::Forks,
        Counter::LogMessages,
        Counter::ExternalCommands,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Column base name
    pub fn column_name(self) -> &'static str {
        match self {
            Counter::NebCallbacks => "neb_callbacks",
            Counter::Requests => "requests",
            Counter::Connections => "connections",
            Counter::ServiceChecks => "service_checks",
            Counter::HostChecks => "host_checks",
            Counter::Forks => "forks",
            Counter::LogMessages => "log_messages",
            Counter::ExternalCommands => "external_commands",
        }
    }

    /// Fragment used in generated column descriptions
    pub fn description(self) -> &'static str {
        match self {
            Counter::NebCallbacks => "NEB callbacks",
            Counter::Requests => "requests to Livestatus",
            Counter::Connections => "client connections to Livestatus",
            Counter::ServiceChecks => "completed service checks",
            Counter::HostChecks => "host checks",
            Counter::Forks => "process creations",
            Counter::LogMessages => "new log messages",
            Counter::ExternalCommands => "external commands",
        }
    }
}

const NUM_COUNTERS: usize = Counter::ALL.len();

/// Point-in-time copy of every counter and rate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CounterSnapshot {
    values: [u64; NUM_COUNTERS],
    rates: [f64; NUM_COUNTERS],
}

impl CounterSnapshot {
    pub fn value(&self, which: Counter) -> u64 {
        self.values[which.index()]
    }

    pub fn rate(&self, which: Counter) -> f64 {
        self.rates[which.index()]
    }
}

#[derive(Debug, Default)]
struct RateState {
    last_values: [u64; NUM_COUNTERS],
    rates: [f64; NUM_COUNTERS],
}

/// Thread-safe counter registry
///
/// Increments use Relaxed ordering; a snapshot is not a consistent cut
/// across counters.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    values: [AtomicU64; NUM_COUNTERS],
    rates: Mutex<RateState>,
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, which: Counter) {
        self.add(which, 1);
    }

    pub fn add(&self, which: Counter, amount: u64) {
        self.values[which.index()].fetch_add(amount, Ordering::Relaxed);
    }

    pub fn value(&self, which: Counter) -> u64 {
        self.values[which.index()].load(Ordering::Relaxed)
    }

    /// Folds the increments since the previous call into the averaged rates.
    ///
    /// The first observed rate is taken as is, later ones are averaged with
    /// the previous rate. Non-positive intervals are ignored.
    pub fn update_rates(&self, elapsed_seconds: f64) {
        if elapsed_seconds <= 0.0 {
            return;
        }
        let mut state = self.rates.lock();
        for which in Counter::ALL {
            let idx = which.index();
            let current = self.value(which);
            let delta = current.saturating_sub(state.last_values[idx]);
            let rate = delta as f64 / elapsed_seconds;
            state.rates[idx] = if state.rates[idx] == 0.0 {
                rate
            } else {
                (state.rates[idx] + rate) / 2.0
            };
            state.last_values[idx] = current;
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let rates = self.rates.lock().rates;
        let mut values = [0u64; NUM_COUNTERS];
        for which in Counter::ALL {
            values[which.index()] = self.value(which);
        }
        CounterSnapshot { values, rates }
    }
}
