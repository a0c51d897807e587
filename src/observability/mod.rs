//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Engine counters
//! - Lifecycle and per-query event tracing
//!
//! Observability is read-only: nothing here influences query results.
//!
//! ```ignore
//! use livequery::observability::{Logger, ObservationScope};
//!
//! Logger::info("SNAPSHOT_LOADED", &[("hosts", "42")]);
//!
//! let scope = ObservationScope::with_fields("QUERY", &[("table", "hosts")]);
//! // ... answer the query ...
//! scope.complete_with_fields(&[("rows_returned", "3")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

fn severity_of(event: Event) -> Severity {
    match event {
        Event::QueryRejected => Severity::Warn,
        Event::LockTimeout => Severity::Warn,
        e if e.is_per_query() => Severity::Trace,
        _ => Severity::Info,
    }
}

pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
