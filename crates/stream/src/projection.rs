//! Latest-known view model folded from routed envelopes.

use serde::Serialize;

use vista_core::{normalize_candidates, Candidate, Identity};

use crate::messages::StreamEnvelope;

/// Log lines kept for the log panel.
pub const LOG_WINDOW: usize = 10;

/// The latest-known view of the stream, updated by partial merge: a
/// field absent from an envelope leaves the corresponding value exactly
/// as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub fps: f64,
    pub latency_ms: f64,

    pub top_label: String,
    pub top_confidence_pct: f64,
    pub candidates: Vec<Candidate>,
    pub history_window: i64,
    pub identity: Option<Identity>,

    /// Most recent log lines, oldest first.
    pub log_lines: Vec<String>,

    /// Envelopes applied to this view.
    pub messages_received: u64,
    /// Frames handed to the render pipeline.
    pub frames_submitted: u64,
}

impl ViewState {
    /// Fold one envelope into the view.
    ///
    /// Envelopes carrying a server error are terminal and apply nothing;
    /// the dispatcher records them separately.
    pub fn apply(&mut self, envelope: &StreamEnvelope) {
        if envelope.error_message.is_some() {
            return;
        }

        self.messages_received += 1;

        if let Some(fps) = envelope.fps {
            self.fps = fps;
        }
        if let Some(latency) = envelope.latency_ms {
            self.latency_ms = latency;
        }
        if let Some(label) = &envelope.top_label {
            self.top_label = label.clone();
        }
        if let Some(pct) = envelope.top_confidence_pct {
            self.top_confidence_pct = pct;
        }
        if let Some(stats) = &envelope.detection_stats {
            self.candidates = normalize_candidates(stats);
        }
        if let Some(history) = envelope.history_window {
            self.history_window = history;
        }
        if let Some(identity) = &envelope.identity {
            self.identity = identity.clone();
        }
        if let Some(line) = &envelope.log_line {
            self.push_log(line.clone());
        }
    }

    /// Append a line to the log window, dropping the oldest past
    /// [`LOG_WINDOW`].
    pub fn push_log(&mut self, line: String) {
        self.log_lines.push(line);
        if self.log_lines.len() > LOG_WINDOW {
            let excess = self.log_lines.len() - LOG_WINDOW;
            self.log_lines.drain(..excess);
        }
    }
}
