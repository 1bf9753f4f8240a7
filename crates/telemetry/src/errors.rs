//! Categorized error log with subscriber notifications.
//!
//! [`ErrorTracker`] is the funnel for every fault the client absorbs:
//! transport failures, protocol parse errors, frame decode errors. It
//! keeps the last [`LOG_CAPACITY`] entries newest-first and notifies
//! subscribers with the full current list on every change, so an error
//! panel can render directly from the notification payload.
//!
//! Shared via `Arc` for the life of the client session; reset only via
//! [`ErrorTracker::clear`].

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use vista_core::Timestamp;

/// Entries retained before the oldest is dropped.
pub const LOG_CAPACITY: usize = 100;

/// Buffer capacity for subscriber notifications.
const NOTIFY_CHANNEL_CAPACITY: usize = 64;

/// Severity of a captured entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
}

/// One captured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogEntry {
    /// Unique id, synthesized at capture time.
    pub id: String,

    pub timestamp: Timestamp,

    pub message: String,

    /// Source-error chain, when the entry was captured from an error value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Free-form structured context supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    pub level: ErrorLevel,
}

/// Bounded, newest-first error log with fan-out notifications.
pub struct ErrorTracker {
    entries: Mutex<VecDeque<ErrorLogEntry>>,
    notify_tx: broadcast::Sender<Vec<ErrorLogEntry>>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(VecDeque::new()),
            notify_tx,
        }
    }

    /// Capture an entry at the given level.
    ///
    /// Synthesizes the id and timestamp, prepends the entry (dropping the
    /// oldest past capacity), and notifies every subscriber with the full
    /// newest-first list.
    pub fn capture(
        &self,
        level: ErrorLevel,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
    ) {
        self.push(ErrorLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            message: message.into(),
            stack: None,
            context,
            level,
        });
    }

    /// Capture an error value, recording its source chain alongside the
    /// message.
    pub fn capture_failure(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: Option<serde_json::Value>,
    ) {
        let mut stack = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push(cause.to_string());
            source = cause.source();
        }

        self.push(ErrorLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            message: error.to_string(),
            stack: if stack.is_empty() {
                None
            } else {
                Some(stack.join("\ncaused by: "))
            },
            context,
            level: ErrorLevel::Error,
        });
    }

    pub fn capture_error(&self, message: impl Into<String>, context: Option<serde_json::Value>) {
        self.capture(ErrorLevel::Error, message, context);
    }

    pub fn capture_warning(&self, message: impl Into<String>, context: Option<serde_json::Value>) {
        self.capture(ErrorLevel::Warning, message, context);
    }

    pub fn capture_info(&self, message: impl Into<String>, context: Option<serde_json::Value>) {
        self.capture(ErrorLevel::Info, message, context);
    }

    /// Subscribe to change notifications. Each notification carries the
    /// full newest-first list; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<ErrorLogEntry>> {
        self.notify_tx.subscribe()
    }

    /// The current entries, newest first.
    pub fn snapshot(&self) -> Vec<ErrorLogEntry> {
        self.entries
            .lock()
            .expect("error log lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Drop every entry and notify subscribers with the empty list.
    pub fn clear(&self) {
        self.entries.lock().expect("error log lock poisoned").clear();
        let _ = self.notify_tx.send(Vec::new());
    }

    fn push(&self, entry: ErrorLogEntry) {
        match entry.level {
            ErrorLevel::Error => {
                tracing::error!(id = %entry.id, message = %entry.message, "Captured error")
            }
            ErrorLevel::Warning => {
                tracing::warn!(id = %entry.id, message = %entry.message, "Captured warning")
            }
            ErrorLevel::Info => {
                tracing::debug!(id = %entry.id, message = %entry.message, "Captured info")
            }
        }

        let snapshot = {
            let mut entries = self.entries.lock().expect("error log lock poisoned");
            entries.push_front(entry);
            entries.truncate(LOG_CAPACITY);
            entries.iter().cloned().collect::<Vec<_>>()
        };

        // Ignore the SendError — it only means there are zero subscribers.
        let _ = self.notify_tx.send(snapshot);
    }
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new()
    }
}
