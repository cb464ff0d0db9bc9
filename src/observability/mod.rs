//! Observability subsystem for slotdb
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle and store events
//! - Store counters
//!
//! # Usage
//!
//! ```ignore
//! use slotdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::RecordUpdated, &[("slot", "3"), ("version", "8")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, StoreMetrics};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
///
/// Fatal events are emitted at FATAL, everything else at INFO.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log an event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
