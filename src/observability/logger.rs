//! Structured JSON logger for the gateway
//!
//! - One log line = one event
//! - `event` first, then `severity` and `ts`, then fields sorted by key
//! - Synchronous, no buffering
//! - ERROR and FATAL go to stderr, everything else to stdout

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Client-caused or recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Process cannot continue
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn uses_stderr(&self) -> bool {
        *self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless structured logger.
pub struct Logger;

impl Logger {
    /// Log a typed event at its default severity
    pub fn event(event: Event, fields: &[(&str, &str)]) {
        Self::log(event.severity(), event.as_str(), fields);
    }

    /// Log a free-form event name with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = render(severity, event, &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true), fields);
        if severity.uses_stderr() {
            write_line(&mut io::stderr().lock(), &line);
        } else {
            write_line(&mut io::stdout().lock(), &line);
        }
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // Logging must never take the gateway down.
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

/// Render one log line, newline included.
fn render(severity: Severity, event: &str, ts: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("{\"event\":");
    push_json_str(&mut out, event);
    out.push_str(",\"severity\":\"");
    out.push_str(severity.as_str());
    out.push_str("\",\"ts\":");
    push_json_str(&mut out, ts);

    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    for (key, value) in sorted {
        out.push(',');
        push_json_str(&mut out, key);
        out.push(':');
        push_json_str(&mut out, value);
    }

    out.push_str("}\n");
    out
}

fn push_json_str(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}
