//! `vista-viewer` -- real-time visual-recognition stream viewer.
//!
//! Connects to an inference backend over WebSocket, folds the multiplexed
//! feed of frames, predictions, and telemetry into the latest-known view
//! model, and keeps a rolling log of performance metrics and errors.
//! Reconnects automatically with exponential backoff when the connection
//! drops.
//!
//! # Environment variables
//!
//! | Variable                     | Required | Default                   | Description                          |
//! |------------------------------|----------|---------------------------|--------------------------------------|
//! | `VISTA_WS_URL`               | no       | `ws://localhost:8000/ws`  | WebSocket endpoint of the backend    |
//! | `VISTA_MEMORY_INTERVAL_SECS` | no       | `2`                       | Seconds between memory/status ticks  |

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vista_render::{select_decoder, FramePipeline};
use vista_stream::{StreamClient, StreamConfig, StreamServices, StreamSession};
use vista_telemetry::{resident_memory_mb, ErrorTracker, MetricKind, MetricsRecorder};

/// Default interval between memory samples and status log lines.
const DEFAULT_MEMORY_INTERVAL_SECS: u64 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vista_viewer=info,vista_stream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StreamConfig::from_env();

    let interval_secs: u64 = std::env::var("VISTA_MEMORY_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MEMORY_INTERVAL_SECS);
    let interval = Duration::from_secs(interval_secs);

    tracing::info!(
        ws_url = %config.ws_url,
        interval_secs,
        "Starting vista-viewer",
    );

    let metrics = Arc::new(MetricsRecorder::new());
    let errors = Arc::new(ErrorTracker::new());
    let pipeline = Arc::new(FramePipeline::new(
        select_decoder(true),
        Arc::clone(&errors),
    ));
    let services = StreamServices::new(Arc::clone(&metrics), Arc::clone(&errors), pipeline);

    let session = StreamSession::new(StreamClient::new(config), services);
    session.connect().await;

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(mb) = resident_memory_mb() {
                    metrics.record(MetricKind::Memory, mb);
                }
                log_status(&session, &metrics).await;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    tracing::info!("Shutting down");
    session.disconnect().await;
    session.shutdown().await;

    Ok(())
}

/// Emit a one-line status summary of the session.
async fn log_status(session: &StreamSession, metrics: &MetricsRecorder) {
    let state = session.current_state();
    let view = session.view().await;
    let fps = metrics.stats(MetricKind::Fps);
    let latency = metrics.stats(MetricKind::Latency);

    tracing::info!(
        state = %state,
        fps = view.fps,
        fps_avg = fps.avg,
        latency_ms = view.latency_ms,
        latency_avg = latency.avg,
        top = %view.top_label,
        confidence_pct = view.top_confidence_pct,
        candidates = view.candidates.len(),
        frames = view.frames_submitted,
        "Viewer status",
    );
}
