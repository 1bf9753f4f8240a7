//! Integration tests for the stream session lifecycle.
//!
//! Each test drives a real [`StreamSession`] against a local WebSocket
//! server, exercising connect/dispatch, the reconnect policy, and the
//! disconnect race guarantees end to end.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use vista_render::{FramePipeline, JpegDecoder};
use vista_stream::{
    ConnectionState, ReconnectPolicy, StreamClient, StreamConfig, StreamEvent, StreamServices,
    StreamSession,
};
use vista_telemetry::{ErrorLevel, ErrorTracker, MetricsRecorder, MetricKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a WebSocket server on an ephemeral port. Every accepted
/// connection increments the counter and is handed to `handler`.
async fn start_server<H, Fut>(handler: H) -> (String, Arc<AtomicUsize>)
where
    H: Fn(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = format!("ws://{}", listener.local_addr().expect("local addr"));
    let accepts = Arc::new(AtomicUsize::new(0));

    let accepts_task = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            accepts_task.fetch_add(1, Ordering::SeqCst);
            let Ok(ws) = accept_async(stream).await else {
                continue;
            };
            tokio::spawn(handler(ws));
        }
    });

    (addr, accepts)
}

/// Hold a connection open until the client closes it.
async fn hold(mut ws: WebSocketStream<TcpStream>) {
    while let Some(Ok(_)) = ws.next().await {}
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_attempts: 5,
    }
}

fn session_for(url: &str, policy: ReconnectPolicy) -> StreamSession {
    let errors = Arc::new(ErrorTracker::new());
    let services = StreamServices::new(
        Arc::new(MetricsRecorder::new()),
        Arc::clone(&errors),
        Arc::new(FramePipeline::new(Arc::new(JpegDecoder), errors)),
    );
    StreamSession::with_policy(StreamClient::new(StreamConfig::new(url)), services, policy)
}

async fn wait_for_state(session: &StreamSession, expected: ConnectionState) {
    let mut rx = session.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == expected))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for state {expected}"))
        .expect("state channel closed");
}

// ---------------------------------------------------------------------------
// Test: envelopes flow into the view and the metrics recorder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn envelopes_update_view_and_metrics() {
    let (url, _accepts) = start_server(|mut ws| async move {
        let envelope = r#"{
            "fps": 24.0,
            "latency": 33.5,
            "predicted": "alice",
            "predicted_percentage": 91.0,
            "prediction_stats": {"alice": {"count": 9, "percentage": 91.0}},
            "history_size": 9
        }"#;
        let _ = ws.send(Message::Text(envelope.to_string())).await;
        hold(ws).await;
    })
    .await;

    let session = session_for(&url, fast_policy());
    session.connect().await;
    wait_for_state(&session, ConnectionState::Open).await;

    // The envelope is dispatched asynchronously after open.
    let mut applied = false;
    for _ in 0..100 {
        if session.view().await.messages_received > 0 {
            applied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "no envelope was applied");

    let view = session.view().await;
    assert_eq!(view.fps, 24.0);
    assert_eq!(view.latency_ms, 33.5);
    assert_eq!(view.top_label, "alice");
    assert_eq!(view.candidates.len(), 1);
    assert_eq!(view.history_window, 9);
    assert!(view
        .log_lines
        .iter()
        .any(|line| line == "WebSocket connected"));

    let services = session.services();
    assert_eq!(services.metrics.stats(MetricKind::Fps).current, 24.0);
    assert_eq!(services.metrics.stats(MetricKind::Latency).current, 33.5);

    session.disconnect().await;
}

// ---------------------------------------------------------------------------
// Test: connect() while pending or open never opens a second socket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_is_a_noop_while_active() {
    let (url, accepts) = start_server(hold).await;

    let session = session_for(&url, fast_policy());
    session.connect().await;
    wait_for_state(&session, ConnectionState::Open).await;

    session.connect().await;
    session.connect().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert_eq!(session.current_state(), ConnectionState::Open);

    session.disconnect().await;
}

// ---------------------------------------------------------------------------
// Test: disconnect() wins the race with the close event
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_prevents_any_reconnect() {
    let (url, accepts) = start_server(hold).await;

    let session = session_for(&url, fast_policy());
    let mut events = session.subscribe();

    session.connect().await;
    wait_for_state(&session, ConnectionState::Open).await;

    session.disconnect().await;
    assert_eq!(session.current_state(), ConnectionState::Closed);

    // Wait well past every backoff delay in the fast policy.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert_eq!(session.current_state(), ConnectionState::Closed);

    let mut saw_user_disconnect = false;
    while let Ok(event) = events.try_recv() {
        match event {
            StreamEvent::ReconnectScheduled { .. } => {
                panic!("reconnect was scheduled after disconnect()")
            }
            StreamEvent::DisconnectedByUser => saw_user_disconnect = true,
            _ => {}
        }
    }
    assert!(saw_user_disconnect);

    let view = session.view().await;
    assert!(view
        .log_lines
        .iter()
        .any(|line| line == "Disconnected by user"));
}

// ---------------------------------------------------------------------------
// Test: a dropped connection reconnects automatically
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_connection_reconnects_with_backoff() {
    // The server drops every connection immediately after the handshake.
    let (url, accepts) = start_server(|ws| async move {
        drop(ws);
    })
    .await;

    let session = session_for(&url, fast_policy());
    let mut events = session.subscribe();

    session.connect().await;

    // Each drop happens after a successful open, so the counter resets
    // and every retry is attempt 1; count scheduling events instead.
    let mut reconnects = 0;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for reconnect events")
            .expect("event channel closed");
        if let StreamEvent::ReconnectScheduled { attempt, .. } = event {
            assert_eq!(attempt, 1);
            reconnects += 1;
            if reconnects >= 2 {
                break;
            }
        }
    }
    // At least the initial attempt plus one automatic retry reached the
    // server.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(accepts.load(Ordering::SeqCst) >= 2);

    session.shutdown().await;
    assert_eq!(session.current_state(), ConnectionState::Idle);
}

// ---------------------------------------------------------------------------
// Test: the retry budget is exhausted after five attempts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_backend_exhausts_the_retry_budget() {
    // Bind a port and release it so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let session = session_for(&url, fast_policy());
    let mut events = session.subscribe();

    session.connect().await;

    let mut scheduled = Vec::new();
    let exhausted_after = loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for exhaustion")
            .expect("event channel closed");
        match event {
            StreamEvent::ReconnectScheduled { attempt, delay_ms } => {
                scheduled.push((attempt, delay_ms));
            }
            StreamEvent::ReconnectExhausted { attempts } => break attempts,
            _ => {}
        }
    };

    assert_eq!(exhausted_after, 5);
    assert_eq!(scheduled.len(), 5);
    assert_eq!(
        scheduled.iter().map(|(attempt, _)| *attempt).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    // Delays follow the doubling policy: 10, 20, 40, 50 (capped), 50.
    assert_eq!(
        scheduled.iter().map(|(_, delay)| *delay).collect::<Vec<_>>(),
        vec![10, 20, 40, 50, 50]
    );

    assert_eq!(session.current_state(), ConnectionState::Faulted);
    let view = session.view().await;
    assert!(view
        .log_lines
        .iter()
        .any(|line| line == "Max reconnect attempts reached"));
}

// ---------------------------------------------------------------------------
// Test: malformed payloads never disturb the connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_payload_leaves_the_connection_open() {
    let (url, _accepts) = start_server(|mut ws| async move {
        let _ = ws.send(Message::Text("this is not json".to_string())).await;
        hold(ws).await;
    })
    .await;

    let session = session_for(&url, fast_policy());
    session.connect().await;
    wait_for_state(&session, ConnectionState::Open).await;

    // Give the bad payload time to arrive and be absorbed.
    let mut captured = false;
    for _ in 0..100 {
        if !session.services().errors.snapshot().is_empty() {
            captured = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(captured, "the malformed payload was never captured");

    let entries = session.services().errors.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, ErrorLevel::Warning);

    // Still open, and nothing was projected.
    assert_eq!(session.current_state(), ConnectionState::Open);
    let view = session.view().await;
    assert_eq!(view.messages_received, 0);
    assert_eq!(view.fps, 0.0);

    session.disconnect().await;
}

// ---------------------------------------------------------------------------
// Test: a user connect() after exhaustion starts a fresh attempt series
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_connect_after_exhaustion_resets_the_counter() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let policy = ReconnectPolicy {
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_attempts: 2,
    };
    let session = session_for(&url, policy);
    let mut events = session.subscribe();

    session.connect().await;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out")
            .expect("event channel closed");
        if matches!(event, StreamEvent::ReconnectExhausted { .. }) {
            break;
        }
    }

    // Explicit user action re-enters the retry loop from zero.
    session.connect().await;
    let mut first_retry = None;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out")
            .expect("event channel closed");
        if let StreamEvent::ReconnectScheduled { attempt, .. } = event {
            first_retry = Some(attempt);
            break;
        }
    }
    assert_eq!(first_retry, Some(1));

    session.shutdown().await;
}
