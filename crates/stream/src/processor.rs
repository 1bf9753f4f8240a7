//! WebSocket message processing loop and envelope dispatch.
//!
//! Reads raw frames from a live connection, parses them via
//! [`parse_envelope`], and routes the decoded fields: fps/latency into
//! the metrics recorder, frame payloads into the render pipeline, and
//! everything else into the view projection. Faults are absorbed here —
//! a malformed payload or a server-reported error never escapes into the
//! connection's control flow.

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use vista_telemetry::MetricKind;

use crate::events::DisconnectReason;
use crate::messages::parse_envelope;
use crate::session::StreamServices;

/// Process messages until the connection goes away.
///
/// Returns why it ended: a clean close (or stream end) versus a
/// transport-level receive fault.
pub(crate) async fn process_messages(
    ws_stream: &mut WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    services: &StreamServices,
) -> DisconnectReason {
    while let Some(msg_result) = ws_stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                handle_text_message(&text, services).await;
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary message");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Backend closed WebSocket");
                return DisconnectReason::Normal;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "WebSocket receive error");
                return DisconnectReason::Fault;
            }
        }
    }

    tracing::info!("WebSocket stream exhausted");
    DisconnectReason::Normal
}

/// Parse and dispatch a single text frame.
pub(crate) async fn handle_text_message(text: &str, services: &StreamServices) {
    let envelope = match parse_envelope(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Failed to parse stream message");
            services
                .errors
                .capture_warning(format!("invalid message payload: {e}"), None);
            services
                .view
                .write()
                .await
                .push_log("Invalid JSON from server".to_string());
            return;
        }
    };

    // A server-reported error is terminal for this message.
    if let Some(message) = &envelope.error_message {
        tracing::warn!(message = %message, "Server-reported error");
        services
            .errors
            .capture_error(format!("server error: {message}"), None);
        services
            .view
            .write()
            .await
            .push_log(format!("Server error: {message}"));
        return;
    }

    if let Some(fps) = envelope.fps {
        services.metrics.record(MetricKind::Fps, fps);
    }
    if let Some(latency) = envelope.latency_ms {
        services.metrics.record(MetricKind::Latency, latency);
    }

    let frame_submitted = envelope
        .frame
        .as_ref()
        .map(|payload| services.pipeline.submit(payload.clone()))
        .unwrap_or(false);

    let mut view = services.view.write().await;
    view.apply(&envelope);
    if frame_submitted {
        view.frames_submitted += 1;
    }
}
