//! Inbound message envelope and tolerant field narrowing.
//!
//! The backend multiplexes every update kind over one JSON object per
//! WebSocket text frame, with every key optional:
//!
//! ```json
//! {"fps": 24.0, "latency": 42.5, "frame": "<base64 jpeg>",
//!  "predicted": "alice", "predicted_percentage": 87.5,
//!  "prediction_stats": {"alice": {"count": 9, "percentage": 87.5}},
//!  "history_size": 12, "log": "...", "error": "...", "user": {...}}
//! ```
//!
//! Presence governs the partial merge downstream: an absent key leaves
//! the projected state untouched. Because the backend evolves
//! independently of this client, narrowing is deliberately tolerant — a
//! key carrying the wrong JSON type is treated as absent rather than as
//! an error, and unknown keys are ignored. Only a payload that is not a
//! JSON object at all is a decode failure.

use serde_json::{Map, Value};

use vista_core::{DetectionStat, Identity};

/// One decoded message, every field independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamEnvelope {
    pub fps: Option<f64>,
    pub latency_ms: Option<f64>,

    /// Base64 JPEG frame payload.
    pub frame: Option<String>,

    /// Label of the top prediction.
    pub top_label: Option<String>,

    /// Confidence percentage of the top prediction.
    pub top_confidence_pct: Option<f64>,

    /// Per-label detection aggregates, in wire order. Present-but-empty
    /// is distinguishable from absent: it clears the candidate list.
    pub detection_stats: Option<Vec<(String, DetectionStat)>>,

    /// Number of detections in the backend's rolling window.
    pub history_window: Option<i64>,

    /// Database record for the top prediction. The outer level is key
    /// presence; the inner level distinguishes a record from `null`.
    pub identity: Option<Option<Identity>>,

    pub log_line: Option<String>,

    /// Server-reported error. Terminal for the message: when present, no
    /// other field carries a semantic update.
    pub error_message: Option<String>,
}

/// Decode failures. Anything parseable as a JSON object succeeds.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Parse one raw text payload into a [`StreamEnvelope`].
///
/// Never panics past this boundary; malformed input yields a typed
/// failure for the caller to log and discard.
pub fn parse_envelope(text: &str) -> Result<StreamEnvelope, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = match value {
        Value::Object(obj) => obj,
        _ => return Err(ProtocolError::NotAnObject),
    };

    Ok(StreamEnvelope {
        fps: number_field(&obj, "fps"),
        latency_ms: number_field(&obj, "latency"),
        frame: string_field(&obj, "frame").filter(|s| !s.is_empty()),
        top_label: string_field(&obj, "predicted"),
        top_confidence_pct: number_field(&obj, "predicted_percentage"),
        detection_stats: obj.get("prediction_stats").and_then(detection_stats_field),
        history_window: integer_field(&obj, "history_size"),
        identity: identity_field(&obj),
        log_line: string_field(&obj, "log").filter(|s| !s.is_empty()),
        error_message: string_field(&obj, "error").filter(|s| !s.is_empty()),
    })
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn integer_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Narrow `prediction_stats` to the entries that carry a usable count
/// and percentage; malformed entries are skipped individually. Wire
/// order is preserved.
fn detection_stats_field(value: &Value) -> Option<Vec<(String, DetectionStat)>> {
    let entries = value.as_object()?;

    let mut stats = Vec::with_capacity(entries.len());
    for (label, entry) in entries {
        let entry = match entry.as_object() {
            Some(entry) => entry,
            None => continue,
        };
        let count = match entry.get("count").and_then(Value::as_i64) {
            Some(count) => count,
            None => continue,
        };
        let percentage = match entry.get("percentage").and_then(Value::as_f64) {
            Some(pct) => pct,
            None => continue,
        };
        let user = entry
            .get("user")
            .and_then(|u| serde_json::from_value::<Identity>(u.clone()).ok());

        stats.push((
            label.clone(),
            DetectionStat {
                count,
                percentage,
                user,
            },
        ));
    }

    Some(stats)
}

fn identity_field(obj: &Map<String, Value>) -> Option<Option<Identity>> {
    match obj.get("user")? {
        Value::Null => Some(None),
        value @ Value::Object(_) => serde_json::from_value::<Identity>(value.clone())
            .ok()
            .map(Some),
        _ => None,
    }
}
