//! Structured JSON logger
//!
//! One line per event. `event` comes first, then `severity`, then the
//! caller's fields in key order, so two lines for the same event diff
//! cleanly. Writes are synchronous and lines below the process-wide
//! threshold are dropped before formatting.
//!
//! Logs go to stderr; stdout carries query responses.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;

/// Log severity, ordered from chattiest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-query detail
    Trace = 0,
    Info = 1,
    /// The request failed, the engine did not
    Warn = 2,
    Error = 3,
    /// The process is about to exit
    Fatal = 4,
}

impl Severity {
    const LEVELS: [Severity; 5] = [
        Severity::Trace,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a configuration level name, ignoring case
    pub fn parse(level: &str) -> Option<Self> {
        Self::LEVELS
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(level))
    }

    fn from_u8(level: u8) -> Self {
        Self::LEVELS
            .get(level as usize)
            .copied()
            .unwrap_or(Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

pub struct Logger;

impl Logger {
    /// Sets the process-wide threshold
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if Self::enabled(severity) {
            Self::log_to_writer(severity, event, fields, &mut io::stderr().lock());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        // A failing log sink never fails the request
        let _ = writer
            .write_all(Self::format_line(severity, event, fields).as_bytes())
            .and_then(|()| writer.flush());
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted = fields.to_vec();
        sorted.sort_by_key(|&(key, _)| key);

        let mut line = format!(
            "{{\"event\":{},\"severity\":\"{}\"",
            json_string(event),
            severity.as_str()
        );
        for (key, value) in sorted {
            line.push(',');
            line.push_str(&json_string(key));
            line.push(':');
            line.push_str(&json_string(value));
        }
        line.push_str("}\n");
        line
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }
}

/// Quoted and escaped JSON string literal
fn json_string(text: &str) -> String {
    Value::from(text).to_string()
}

/// Formats one line regardless of the threshold
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_round_trip() {
        for (index, severity) in Severity::LEVELS.iter().enumerate() {
            assert_eq!(Severity::from_u8(index as u8), *severity);
            assert_eq!(Severity::parse(&severity.as_str().to_lowercase()), Some(*severity));
        }
        assert_eq!(Severity::from_u8(200), Severity::Fatal);
        assert!(Severity::Trace < Severity::Warn);
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        assert_eq!(Severity::parse("Warn"), Some(Severity::Warn));
        assert_eq!(Severity::parse("debug"), None);
        assert_eq!(Severity::parse(""), None);
    }

    #[test]
    fn test_line_layout() {
        let line = capture_log(
            Severity::Warn,
            "QUERY_FAILED",
            &[("table", "hosts"), ("code", "LQ_QUERY_UNKNOWN_TABLE")],
        );
        assert_eq!(
            line,
            concat!(
                "{\"event\":\"QUERY_FAILED\",\"severity\":\"WARN\",",
                "\"code\":\"LQ_QUERY_UNKNOWN_TABLE\",\"table\":\"hosts\"}\n"
            )
        );
    }

    #[test]
    fn test_field_order_is_independent_of_input_order() {
        let a = capture_log(Severity::Info, "QUERY_COMPLETE", &[("rows", "2"), ("bytes", "10")]);
        let b = capture_log(Severity::Info, "QUERY_COMPLETE", &[("bytes", "10"), ("rows", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_request_text_stays_on_one_line() {
        let text = "GET hosts\nFilter: name = \"x\"\t\u{1}";
        let line = capture_log(Severity::Trace, "QUERY_PARSED", &[("request", text)]);
        assert_eq!(line.matches('\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["request"], text);
        assert_eq!(parsed["severity"], "TRACE");
    }

    #[test]
    fn test_threshold() {
        // Other tests leave the default threshold alone
        assert!(Logger::enabled(Severity::Fatal));
        assert!(Logger::enabled(Severity::Error));
    }
}
