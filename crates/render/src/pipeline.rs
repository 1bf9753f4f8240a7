//! The frame pipeline: throttle, decode, paint.
//!
//! [`FramePipeline::submit`] is the single entry point the stream
//! dispatcher calls with each inbound frame payload. The pipeline always
//! prefers the most recent frame: payloads arriving inside the paint
//! window or while a decode is in flight are dropped, never queued, so a
//! fast backend sheds backlog instead of rendering stale frames late.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use vista_telemetry::ErrorTracker;

use crate::bitmap::Bitmap;
use crate::decode::{FrameDecode, FrameError, JpegDecoder, SniffingDecoder};
use crate::surface::Surface;
use crate::throttle::PaintGate;

pub struct FramePipeline {
    decoder: Arc<dyn FrameDecode>,
    surface: Arc<Mutex<Surface>>,
    gate: PaintGate,
    decode_in_flight: Arc<AtomicBool>,
    frames_dropped: AtomicU64,
    errors: Arc<ErrorTracker>,
}

impl FramePipeline {
    pub fn new(decoder: Arc<dyn FrameDecode>, errors: Arc<ErrorTracker>) -> Self {
        Self::with_gate(decoder, PaintGate::default(), errors)
    }

    pub fn with_gate(
        decoder: Arc<dyn FrameDecode>,
        gate: PaintGate,
        errors: Arc<ErrorTracker>,
    ) -> Self {
        Self {
            decoder,
            surface: Arc::new(Mutex::new(Surface::new())),
            gate,
            decode_in_flight: Arc::new(AtomicBool::new(false)),
            frames_dropped: AtomicU64::new(0),
            errors,
        }
    }

    /// Submit a base64 frame payload for decode and paint.
    ///
    /// Returns `true` if the frame was accepted. Frames inside the paint
    /// window or arriving while a decode is in flight are dropped.
    pub fn submit(&self, payload: String) -> bool {
        if !self.gate.try_admit(Instant::now()) {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Frame dropped by paint throttle");
            return false;
        }

        if self.decode_in_flight.swap(true, Ordering::AcqRel) {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Frame dropped, decode already in flight");
            return false;
        }

        let decoder = Arc::clone(&self.decoder);
        let surface = Arc::clone(&self.surface);
        let in_flight = Arc::clone(&self.decode_in_flight);
        let errors = Arc::clone(&self.errors);

        tokio::spawn(async move {
            match decode_with_fallback(decoder.as_ref(), &payload).await {
                Ok(bitmap) => {
                    surface.lock().expect("surface lock poisoned").paint(bitmap);
                }
                Err(e) => {
                    errors.capture_failure(
                        &e,
                        Some(serde_json::json!({ "payload_bytes": payload.len() })),
                    );
                }
            }
            in_flight.store(false, Ordering::Release);
        });

        true
    }

    /// Frames painted since construction.
    pub fn paint_count(&self) -> u64 {
        self.surface
            .lock()
            .expect("surface lock poisoned")
            .paint_count()
    }

    /// Frames dropped by the throttle or the in-flight rule.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Copy of the last painted frame, if any.
    pub fn frame(&self) -> Option<image::RgbaImage> {
        self.surface
            .lock()
            .expect("surface lock poisoned")
            .frame()
            .cloned()
    }
}

/// Run the configured decoder, degrading to the next path when it cannot
/// produce a bitmap.
async fn decode_with_fallback(
    decoder: &dyn FrameDecode,
    payload: &str,
) -> Result<Bitmap, FrameError> {
    let err = match decoder.decode(payload).await {
        Ok(bitmap) => return Ok(bitmap),
        Err(e) => e,
    };

    match err {
        // Bad base64 fails the same way on every path.
        FrameError::Payload(_) => Err(err),
        FrameError::WorkerUnavailable => {
            tracing::warn!("Decode worker unavailable, decoding inline");
            match JpegDecoder.decode(payload).await {
                Ok(bitmap) => Ok(bitmap),
                Err(FrameError::Decode(_)) => SniffingDecoder.decode(payload).await,
                Err(e) => Err(e),
            }
        }
        FrameError::Decode(_) => {
            tracing::debug!(
                decoder = decoder.name(),
                "Direct decode failed, sniffing format",
            );
            SniffingDecoder.decode(payload).await
        }
    }
}
