//! The append-only activity log of the dashboard.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Number of entries a lagging subscriber can fall behind before it starts missing
/// some.
const SUBSCRIBER_CAPACITY: usize = 64;

/// Severity of a log entry.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[display(fmt = "info")]
    Info,
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "error")]
    Error,
}

/// A human readable record of something the dashboard did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// Entries are only ever appended. Every appended entry is also emitted as a
/// `tracing` event and broadcast to the subscribers.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
    tx: broadcast::Sender<LogEntry>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            entries: Vec::new(),
            tx,
        }
    }
}

impl ActivityLog {
    /// Append a new entry, timestamped now.
    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        };
        match severity {
            Severity::Error => error!(severity = %severity, "{}", entry.message),
            _ => info!(severity = %severity, "{}", entry.message),
        }
        // nobody listening is fine
        let _ = self.tx.send(entry.clone());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Get a receiver for the entries appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_appends_in_order() {
        let mut log = ActivityLog::default();
        assert!(log.entries().is_empty());

        log.push("first", Severity::Info);
        log.push("second", Severity::Error);

        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(log.entries()[1].severity, Severity::Error);
        assert!(log.entries()[0].timestamp <= log.entries()[1].timestamp);
    }

    #[tokio::test]
    async fn test_subscribe() {
        let mut log = ActivityLog::default();
        log.push("before", Severity::Info);

        let mut rx = log.subscribe();
        log.push("after", Severity::Success);

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.message, "after");
        assert_eq!(entry.severity, Severity::Success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&Severity::Success).unwrap(),
            r#""success""#
        );
    }
}
