//! Paint-rate throttling.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum spacing between paints (~33 Hz).
pub const MIN_PAINT_INTERVAL: Duration = Duration::from_millis(30);

/// Gate that admits at most one paint per interval.
///
/// Frames arriving inside the window are rejected before any decode work
/// happens, so an over-eager backend costs nothing but the gate check.
#[derive(Debug)]
pub struct PaintGate {
    interval: Duration,
    last_admit: Mutex<Option<Instant>>,
}

impl PaintGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admit: Mutex::new(None),
        }
    }

    /// Admit a paint at `now` if the window has elapsed, claiming the slot.
    pub fn try_admit(&self, now: Instant) -> bool {
        let mut last = self.last_admit.lock().expect("paint gate lock poisoned");
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for PaintGate {
    fn default() -> Self {
        Self::new(MIN_PAINT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_admitted() {
        let gate = PaintGate::default();
        assert!(gate.try_admit(Instant::now()));
    }

    #[test]
    fn frames_inside_the_window_are_rejected() {
        let gate = PaintGate::default();
        let t0 = Instant::now();
        assert!(gate.try_admit(t0));
        assert!(!gate.try_admit(t0 + Duration::from_millis(10)));
    }

    #[test]
    fn frames_past_the_window_are_admitted() {
        let gate = PaintGate::default();
        let t0 = Instant::now();
        assert!(gate.try_admit(t0));
        assert!(gate.try_admit(t0 + Duration::from_millis(40)));
    }

    #[test]
    fn rejected_frames_do_not_reset_the_window() {
        let gate = PaintGate::default();
        let t0 = Instant::now();
        assert!(gate.try_admit(t0));
        assert!(!gate.try_admit(t0 + Duration::from_millis(20)));
        // 35 ms after the admitted paint, not after the rejected one.
        assert!(gate.try_admit(t0 + Duration::from_millis(35)));
    }
}
