//! Paired begin/end logging around one unit of work
//!
//! A scope logs `{name}_BEGIN` when opened and exactly one closing line:
//! `{name}_COMPLETE`, `{name}_FAILED`, or `{name}_INCOMPLETE` if it is
//! dropped while still open. Opening fields repeat on the closing line so
//! each line can be read on its own.

use std::time::Instant;

use super::logger::{Logger, Severity};

pub struct ObservationScope<'a> {
    name: &'a str,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
    open: bool,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name,
            fields: fields.iter().map(|&(key, value)| (key, value.to_string())).collect(),
            timer: Timer::new(),
            open: true,
        }
    }

    pub fn is_completed(&self) -> bool {
        !self.open
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.close(Severity::Info, "COMPLETE", extra);
    }

    /// Closes a scope whose request was refused. Logged at WARN: the
    /// engine keeps serving.
    pub fn fail_with_fields(mut self, reason: &str, extra: &[(&str, &str)]) {
        let mut fields = extra.to_vec();
        fields.push(("reason", reason));
        self.close(Severity::Warn, "FAILED", &fields);
    }

    fn close(&mut self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        self.open = false;
        let elapsed = self.timer.elapsed_ms();
        let fields = self.closing_fields(extra, &elapsed);
        Logger::log(severity, &format!("{}_{}", self.name, suffix), &fields);
    }

    fn closing_fields<'f>(
        &'f self,
        extra: &[(&'f str, &'f str)],
        elapsed: &'f str,
    ) -> Vec<(&'f str, &'f str)> {
        self.fields
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .chain(extra.iter().copied())
            .chain(std::iter::once(("elapsed_ms", elapsed)))
            .collect()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.close(Severity::Warn, "INCOMPLETE", &[]);
        }
    }
}

/// Wall-clock timer for `elapsed_ms` fields
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_line_repeats_opening_fields() {
        let scope =
            ObservationScope::with_fields("QUERY", &[("request_id", "r1"), ("table", "hosts")]);
        let fields = scope.closing_fields(&[("rows_returned", "3")], "7");
        assert_eq!(
            fields,
            vec![
                ("request_id", "r1"),
                ("table", "hosts"),
                ("rows_returned", "3"),
                ("elapsed_ms", "7"),
            ]
        );
        assert!(!scope.is_completed());
        scope.complete_with_fields(&[]);
    }

    #[test]
    fn test_close_marks_scope_done() {
        let mut scope = ObservationScope::new("EXPLAIN");
        scope.close(Severity::Info, "COMPLETE", &[]);
        assert!(scope.is_completed());
        // Dropping a closed scope logs nothing further
        drop(scope);
    }

    #[test]
    fn test_fail_and_drop_do_not_panic() {
        ObservationScope::new("QUERY")
            .fail_with_fields("unknown table", &[("code", "LQ_QUERY_UNKNOWN_TABLE")]);
        drop(ObservationScope::new("QUERY"));
    }

    #[test]
    fn test_timer_is_monotonic() {
        let timer = Timer::default();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 5);
    }
}
