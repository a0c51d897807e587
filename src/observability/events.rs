//! Catalogue of engine events
//!
//! Query lifecycle lines (`QUERY_BEGIN`, `QUERY_COMPLETE`, `QUERY_FAILED`)
//! come from [`ObservationScope`](super::ObservationScope); this enum names
//! everything else.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ConfigLoaded,
    SnapshotLoaded,
    TableRegistered,
    /// Request accepted by the header parser
    QueryParsed,
    /// Request text that never became a query
    QueryRejected,
    /// State lock not granted in time
    LockTimeout,
    ExplainComplete,
    /// Engine counters at the end of a CLI command
    EngineMetrics,
}

impl Event {
    pub const ALL: [Event; 8] = [
        Event::ConfigLoaded,
        Event::SnapshotLoaded,
        Event::TableRegistered,
        Event::QueryParsed,
        Event::QueryRejected,
        Event::LockTimeout,
        Event::ExplainComplete,
        Event::EngineMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SnapshotLoaded => "SNAPSHOT_LOADED",
            Event::TableRegistered => "TABLE_REGISTERED",
            Event::QueryParsed => "QUERY_PARSED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::LockTimeout => "CORE_LOCK_TIMEOUT",
            Event::ExplainComplete => "EXPLAIN_COMPLETE",
            Event::EngineMetrics => "ENGINE_METRICS",
        }
    }

    /// Logged once per request, at trace level
    pub fn is_per_query(&self) -> bool {
        matches!(self, Event::QueryParsed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_screaming_snake_case() {
        let names: HashSet<&str> = Event::ALL.iter().map(Event::as_str).collect();
        assert_eq!(names.len(), Event::ALL.len());
        for name in names {
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{}", name);
        }
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Event::LockTimeout.to_string(), "CORE_LOCK_TIMEOUT");
        assert!(Event::QueryParsed.is_per_query());
        assert!(!Event::QueryRejected.is_per_query());
        assert!(!Event::EngineMetrics.is_per_query());
    }
}
