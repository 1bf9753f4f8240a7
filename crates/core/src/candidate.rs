//! Recognition candidate normalization.
//!
//! The backend reports a `prediction_stats` mapping of label to per-label
//! aggregates over its detection window. [`normalize_candidates`] converts
//! that mapping into a ranked candidate list for display: percentages
//! become unit-interval confidences and entries are sorted best-first.

use serde::{Deserialize, Serialize};

use crate::types::Identity;

/// Per-label aggregate as reported in the `prediction_stats` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionStat {
    /// Number of detections for this label in the backend's window.
    pub count: i64,

    /// Confidence percentage. Nominally 0-100, but the backend is not
    /// trusted to stay in range.
    pub percentage: f64,

    /// Database record for the detected person, when the backend found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

/// A ranked recognition candidate derived from [`DetectionStat`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub label: String,

    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Convert detection stats into a candidate list sorted descending by
/// confidence.
///
/// Percentages are divided by 100 and clamped to `0.0..=1.0`, so
/// out-of-range input degrades to the nearest bound instead of producing
/// an impossible confidence. The sort is stable: entries with equal
/// confidence keep the order they arrived in. An empty slice yields an
/// empty list.
pub fn normalize_candidates(stats: &[(String, DetectionStat)]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = stats
        .iter()
        .map(|(label, stat)| Candidate {
            label: if label.is_empty() {
                "Unknown".to_string()
            } else {
                label.clone()
            },
            confidence: (stat.percentage / 100.0).clamp(0.0, 1.0),
            count: Some(stat.count),
            identity: stat.user.clone(),
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}
