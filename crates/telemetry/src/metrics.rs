//! Bounded performance metric series.
//!
//! [`MetricsRecorder`] keeps one rolling window per metric kind. Appends
//! evict the oldest sample once the window is full, so memory stays
//! constant under sustained streaming. Pure and synchronous: no I/O, no
//! async.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

use vista_core::Timestamp;

/// Samples retained per metric kind (~1 minute at one sample per second).
pub const SERIES_CAPACITY: usize = 60;

/// The metric series the viewer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Fps,
    Latency,
    Memory,
}

/// One timestamped scalar sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Windowed statistics over a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// The most recently recorded value.
    pub current: f64,
}

impl MetricStats {
    /// The stats of an empty series. Not an error: a series that has seen
    /// no samples yet reads as all zeroes.
    pub const ZERO: MetricStats = MetricStats {
        min: 0.0,
        max: 0.0,
        avg: 0.0,
        current: 0.0,
    };
}

/// Rolling, capacity-bounded store for scalar performance samples.
///
/// Shared via `Arc`; interior locking keeps the append path cheap.
pub struct MetricsRecorder {
    series: Mutex<HashMap<MetricKind, VecDeque<MetricSample>>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
        }
    }

    /// Append a sample to the given series, evicting the oldest sample
    /// when the window is full.
    pub fn record(&self, kind: MetricKind, value: f64) {
        let mut series = self.series.lock().expect("metrics lock poisoned");
        let window = series.entry(kind).or_default();
        window.push_back(MetricSample {
            timestamp: chrono::Utc::now(),
            value,
        });
        if window.len() > SERIES_CAPACITY {
            window.pop_front();
        }
    }

    /// Windowed stats for a series; [`MetricStats::ZERO`] when empty.
    pub fn stats(&self, kind: MetricKind) -> MetricStats {
        let series = self.series.lock().expect("metrics lock poisoned");
        let window = match series.get(&kind) {
            Some(window) if !window.is_empty() => window,
            _ => return MetricStats::ZERO,
        };

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for sample in window {
            min = min.min(sample.value);
            max = max.max(sample.value);
            sum += sample.value;
        }

        MetricStats {
            min,
            max,
            avg: sum / window.len() as f64,
            current: window.back().map(|s| s.value).unwrap_or(0.0),
        }
    }

    /// Snapshot of a series in append order, oldest first.
    pub fn series(&self, kind: MetricKind) -> Vec<MetricSample> {
        let series = self.series.lock().expect("metrics lock poisoned");
        series
            .get(&kind)
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every sample from every series.
    pub fn reset(&self) {
        self.series.lock().expect("metrics lock poisoned").clear();
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_over_recorded_samples() {
        let recorder = MetricsRecorder::new();
        recorder.record(MetricKind::Fps, 10.0);
        recorder.record(MetricKind::Fps, 30.0);
        recorder.record(MetricKind::Fps, 20.0);

        let stats = recorder.stats(MetricKind::Fps);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert_eq!(stats.avg, 20.0);
        assert_eq!(stats.current, 20.0);
    }

    #[test]
    fn empty_series_reads_as_zero() {
        let recorder = MetricsRecorder::new();
        assert_eq!(recorder.stats(MetricKind::Latency), MetricStats::ZERO);
    }

    #[test]
    fn window_evicts_oldest_past_capacity() {
        let recorder = MetricsRecorder::new();
        for i in 0..=SERIES_CAPACITY {
            recorder.record(MetricKind::Fps, i as f64);
        }

        let series = recorder.series(MetricKind::Fps);
        assert_eq!(series.len(), SERIES_CAPACITY);
        // Sample 0 was evicted; the window now starts at 1.
        assert_eq!(series[0].value, 1.0);
        assert_eq!(
            recorder.stats(MetricKind::Fps).current,
            SERIES_CAPACITY as f64
        );
    }

    #[test]
    fn series_are_independent() {
        let recorder = MetricsRecorder::new();
        recorder.record(MetricKind::Fps, 24.0);
        recorder.record(MetricKind::Latency, 120.0);

        assert_eq!(recorder.stats(MetricKind::Fps).current, 24.0);
        assert_eq!(recorder.stats(MetricKind::Latency).current, 120.0);
        assert_eq!(recorder.stats(MetricKind::Memory), MetricStats::ZERO);
    }

    #[test]
    fn reset_clears_all_series() {
        let recorder = MetricsRecorder::new();
        recorder.record(MetricKind::Fps, 24.0);
        recorder.record(MetricKind::Memory, 512.0);

        recorder.reset();

        assert_eq!(recorder.stats(MetricKind::Fps), MetricStats::ZERO);
        assert_eq!(recorder.stats(MetricKind::Memory), MetricStats::ZERO);
        assert!(recorder.series(MetricKind::Fps).is_empty());
    }
}
