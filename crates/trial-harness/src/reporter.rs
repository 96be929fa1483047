//! Reporting collaborators.
//!
//! A [`Reporter`] receives the verdict text of every case. Passing cases go
//! to [`Reporter::log`], failing ones to [`Reporter::fail`]; isolated runs
//! wrap each case in a [`Reporter::unit`].

use parking_lot::Mutex;
use serde::Serialize;

use crate::structured_log::{LogEntry, LogHandle, LogLevel};

/// Sink for case verdicts. Shared across case threads in parallel runs.
pub trait Reporter: Send + Sync {
    /// Record an informational message (passing case).
    fn log(&self, message: &str);

    /// Record a failure; the run continues.
    fn fail(&self, message: &str);

    /// Run `body` as a named sub-unit whose messages belong to `name`.
    fn unit(&self, name: &str, body: &mut dyn FnMut(&dyn Reporter));
}

// ---------------------------------------------------------------------------
// Collecting reporter
// ---------------------------------------------------------------------------

/// One message received by a [`CollectingReporter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Enclosing unit path (`parent/child`), if any.
    pub unit: Option<String>,
    pub failed: bool,
    pub message: String,
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl CollectingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().clone()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.failed)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.lock().iter().any(|e| e.failed)
    }

    fn push(&self, unit: Option<&str>, failed: bool, message: &str) {
        self.entries.lock().push(ReportEntry {
            unit: unit.map(str::to_string),
            failed,
            message: message.to_string(),
        });
    }
}

impl Reporter for CollectingReporter {
    fn log(&self, message: &str) {
        self.push(None, false, message);
    }

    fn fail(&self, message: &str) {
        self.push(None, true, message);
    }

    fn unit(&self, name: &str, body: &mut dyn FnMut(&dyn Reporter)) {
        body(&UnitScope {
            parent: self,
            path: name.to_string(),
        });
    }
}

/// View of a [`CollectingReporter`] inside a named unit.
struct UnitScope<'a> {
    parent: &'a CollectingReporter,
    path: String,
}

impl Reporter for UnitScope<'_> {
    fn log(&self, message: &str) {
        self.parent.push(Some(&self.path), false, message);
    }

    fn fail(&self, message: &str) {
        self.parent.push(Some(&self.path), true, message);
    }

    fn unit(&self, name: &str, body: &mut dyn FnMut(&dyn Reporter)) {
        body(&UnitScope {
            parent: self.parent,
            path: format!("{}/{name}", self.path),
        });
    }
}

// ---------------------------------------------------------------------------
// Console reporter
// ---------------------------------------------------------------------------

/// Prints to stderr; failures optionally in red.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    color: bool,
    prefix: String,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

impl Reporter for ConsoleReporter {
    fn log(&self, message: &str) {
        eprintln!("{}{message}", self.prefix);
    }

    fn fail(&self, message: &str) {
        if self.color {
            eprintln!("{}{}", self.prefix, paint_red(message));
        } else {
            eprintln!("{}{message}", self.prefix);
        }
    }

    fn unit(&self, name: &str, body: &mut dyn FnMut(&dyn Reporter)) {
        eprintln!("{}--- {name}", self.prefix);
        body(&Self {
            color: self.color,
            prefix: format!("{}    ", self.prefix),
        });
    }
}

/// Wrap in ANSI red / default-foreground escapes.
#[must_use]
pub fn paint_red(message: &str) -> String {
    format!("\x1b[31m{message}\x1b[39m")
}

// ---------------------------------------------------------------------------
// Log reporter
// ---------------------------------------------------------------------------

/// Forwards every message to a structured log as `report_log` /
/// `report_fail` events.
#[derive(Clone)]
pub struct LogReporter {
    log: LogHandle,
    unit: Option<String>,
}

impl LogReporter {
    #[must_use]
    pub fn new(log: LogHandle) -> Self {
        Self { log, unit: None }
    }

    fn write(&self, level: LogLevel, event: &str, message: &str) {
        let mut entry = LogEntry::new("", level, event).with_message(message);
        if let Some(unit) = &self.unit {
            entry = entry.with_details(serde_json::json!({ "unit": unit }));
        }
        // Reporting must not fail a run; a broken log sink only loses lines.
        let _ = self.log.emit_entry(entry);
    }
}

impl Reporter for LogReporter {
    fn log(&self, message: &str) {
        self.write(LogLevel::Info, "report_log", message);
    }

    fn fail(&self, message: &str) {
        self.write(LogLevel::Error, "report_fail", message);
    }

    fn unit(&self, name: &str, body: &mut dyn FnMut(&dyn Reporter)) {
        let unit = match &self.unit {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        };
        body(&Self {
            log: self.log.clone(),
            unit: Some(unit),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;
    use crate::structured_log::{validate_log_text, LogEmitter};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn collecting_reporter_keeps_order_and_units() {
        let reporter = CollectingReporter::new();
        reporter.log("PASS: \"a\"");
        reporter.unit("outer", &mut |r: &dyn Reporter| {
            r.fail("bad");
            r.unit("inner", &mut |r: &dyn Reporter| r.log("fine"));
        });

        let entries = reporter.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].unit, None);
        assert_eq!(entries[1].unit.as_deref(), Some("outer"));
        assert!(entries[1].failed);
        assert_eq!(entries[2].unit.as_deref(), Some("outer/inner"));
        assert!(reporter.has_failures());
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn red_paint_wraps_message() {
        assert_eq!(paint_red("x"), "\x1b[31mx\x1b[39m");
    }

    #[test]
    fn log_reporter_writes_valid_entries() {
        let buffer = Buffer::default();
        let handle = LogHandle::new(LogEmitter::to_writer(buffer.clone(), "divide", "r1"));
        let reporter = LogReporter::new(handle);
        reporter.log("PASS: \"a\"");
        reporter.unit("b", &mut |r: &dyn Reporter| r.fail("oops"));

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let (count, errors) = validate_log_text(&text);
        assert_eq!(count, 2);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(text.contains("\"event\":\"report_fail\""));
        assert!(text.contains("\"unit\":\"b\""));
        assert!(text.contains("divide::r1::002"));
    }
}
