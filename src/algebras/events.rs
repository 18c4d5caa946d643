//! Structured event reporting.
//!
//! The remote client and the crawler never call a process-wide logger
//! directly; they receive an [`EventSink`] and report through it. The
//! binary wires in [`LogSink`], which forwards to the `log` facade, and
//! tests use [`MemorySink`] to assert on what was reported.

use log::Level;
use parking_lot::Mutex;
use std::fmt;

/// A single `key=value` pair attached to an event.
pub type Field<'a> = (&'a str, String);

/// Observability capability.
///
/// # Laws
///
/// - **L1 (Non-failing)**: `record` never fails and never panics; a sink that
///   cannot deliver an event drops it.
/// - **L2 (Order)**: events recorded by one caller are observed in call order.
///
/// This trait is **object-safe** and can be used as `dyn EventSink`.
pub trait EventSink: Send + Sync {
    fn record(&self, level: Level, message: &str, fields: &[Field<'_>]);
}

const LOG_TARGET: &str = "notion_puller";

/// Forwards events to the `log` facade with fields appended as `key=value`.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogSink {
    fn record(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        if !log::log_enabled!(target: LOG_TARGET, level) {
            return;
        }
        log::log!(target: LOG_TARGET, level, "{}", render_fields(message, fields));
    }
}

fn render_fields(message: &str, fields: &[Field<'_>]) -> String {
    let mut line = String::with_capacity(message.len() + fields.len() * 24);
    line.push_str(message);
    for (key, value) in fields {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        if value.contains(char::is_whitespace) {
            line.push_str(&format!("{:?}", value));
        } else {
            line.push_str(value);
        }
    }
    line
}

/// An event captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl RecordedEvent {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for RecordedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<Field<'_>> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        write!(f, "[{}] {}", self.level, render_fields(&self.message, &fields))
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events whose message equals `message`, in recording order.
    pub fn events_named(&self, message: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        self.events.lock().push(RecordedEvent {
            level,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}
