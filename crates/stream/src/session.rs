//! Stream session lifecycle: connect, dispatch, reconnect, teardown.
//!
//! [`StreamSession`] owns the one logical transport connection of a
//! viewer session and everything about its lifecycle: the state machine,
//! the armed/disarmed auto-reconnect flag, the retry counter, and the
//! long-lived task that connects, processes messages, and re-enters the
//! backoff loop when the connection drops.
//!
//! The shape mirrors the rest of the crate's ownership rules: the
//! transport handle lives exclusively inside the connection task;
//! everyone else observes the session through the state watch channel,
//! the event broadcast, and the shared view model.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use vista_render::FramePipeline;
use vista_telemetry::{ErrorTracker, MetricsRecorder};

use crate::client::StreamClient;
use crate::events::{DisconnectReason, StreamEvent};
use crate::processor::process_messages;
use crate::projection::ViewState;
use crate::reconnect::{wait_for_retry, ReconnectPolicy};
use crate::state::ConnectionState;

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long teardown waits for the connection task to exit.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The shared stores every dispatched envelope fans out into.
///
/// Constructed explicitly by the caller and handed to the session —
/// there are no hidden globals, so tests get isolated instances.
#[derive(Clone)]
pub struct StreamServices {
    pub metrics: Arc<MetricsRecorder>,
    pub errors: Arc<ErrorTracker>,
    pub pipeline: Arc<FramePipeline>,
    pub view: Arc<RwLock<ViewState>>,
}

impl StreamServices {
    pub fn new(
        metrics: Arc<MetricsRecorder>,
        errors: Arc<ErrorTracker>,
        pipeline: Arc<FramePipeline>,
    ) -> Self {
        Self {
            metrics,
            errors,
            pipeline,
            view: Arc::new(RwLock::new(ViewState::default())),
        }
    }
}

/// Owns the connection lifecycle for one viewer session.
pub struct StreamSession {
    shared: Arc<SessionShared>,
    /// The currently spawned connection task, if any.
    run: Mutex<Option<RunHandle>>,
    /// Master token — cancelled once, at teardown.
    cancel: CancellationToken,
}

/// State shared between the session handle and its connection task.
struct SessionShared {
    client: StreamClient,
    services: StreamServices,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<StreamEvent>,
    /// While set, a dropped connection schedules an automatic retry.
    /// Cleared by `disconnect()` before the close is initiated, and
    /// re-checked when the retry timer fires.
    armed: AtomicBool,
    /// Completed automatic retries since the last successful open.
    attempts: AtomicU32,
}

struct RunHandle {
    handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new(client: StreamClient, services: StreamServices) -> Self {
        Self::with_policy(client, services, ReconnectPolicy::default())
    }

    pub fn with_policy(
        client: StreamClient,
        services: StreamServices,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(SessionShared {
                client,
                services,
                policy,
                state_tx,
                event_tx,
                armed: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
            }),
            run: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Current connection state.
    pub fn current_state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Watch every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to session-level events.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.shared.event_tx.subscribe()
    }

    /// The shared stores this session dispatches into.
    pub fn services(&self) -> &StreamServices {
        &self.shared.services
    }

    /// Snapshot of the current view model.
    pub async fn view(&self) -> ViewState {
        self.shared.services.view.read().await.clone()
    }

    /// Open the connection and arm auto-reconnect.
    ///
    /// A no-op while a transport is already pending or open — there is
    /// never more than one logically active connection.
    pub async fn connect(&self) {
        let mut run = self.run.lock().await;
        if self.current_state().is_active() {
            tracing::debug!("connect() ignored, transport already pending or open");
            return;
        }

        // A previous task may still be winding down; stop it first.
        if let Some(old) = run.take() {
            old.cancel.cancel();
            let _ = tokio::time::timeout(TASK_JOIN_TIMEOUT, old.handle).await;
        }

        self.shared.armed.store(true, Ordering::Release);
        self.shared.attempts.store(0, Ordering::Release);
        self.shared.set_state(ConnectionState::Connecting);

        let run_cancel = self.cancel.child_token();
        let task_cancel = run_cancel.clone();
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            shared.run_connection_loop(task_cancel).await;
        });

        *run = Some(RunHandle {
            handle,
            cancel: run_cancel,
        });
    }

    /// Close the connection and permanently disarm auto-reconnect.
    ///
    /// The disarm happens before the close is initiated, so a close event
    /// racing this call can never schedule a retry.
    pub async fn disconnect(&self) {
        self.shared.armed.store(false, Ordering::Release);

        let run = self.run.lock().await.take();
        let Some(run) = run else {
            return;
        };

        self.shared.set_state(ConnectionState::Closing);
        run.cancel.cancel();
        let _ = tokio::time::timeout(TASK_JOIN_TIMEOUT, run.handle).await;

        self.shared.set_state(ConnectionState::Closed);
    }

    /// Tear the session down and return to `Idle`.
    ///
    /// Cancels the master token, which renders any pending reconnect
    /// timer inert.
    pub async fn shutdown(&self) {
        self.shared.armed.store(false, Ordering::Release);
        self.cancel.cancel();

        if let Some(run) = self.run.lock().await.take() {
            let _ = tokio::time::timeout(TASK_JOIN_TIMEOUT, run.handle).await;
        }

        self.shared.set_state(ConnectionState::Idle);
    }
}

impl SessionShared {
    fn set_state(&self, state: ConnectionState) {
        let prev = self.state_tx.send_replace(state);
        if prev != state {
            tracing::debug!(from = %prev, to = %state, "Connection state changed");
        }
    }

    fn emit(&self, event: StreamEvent) {
        // Ignore the SendError — it only means there are zero subscribers.
        let _ = self.event_tx.send(event);
    }

    async fn push_view_log(&self, line: String) {
        self.services.view.write().await.push_log(line);
    }

    /// Core connection loop: connect -> process messages -> reconnect.
    ///
    /// Runs until the retry budget is exhausted, the user disconnects,
    /// or the cancellation token is triggered.
    async fn run_connection_loop(&self, run_cancel: CancellationToken) {
        loop {
            let transport = tokio::select! {
                _ = run_cancel.cancelled() => return,
                result = self.client.connect() => match result {
                    Ok(transport) => transport,
                    Err(e) => {
                        tracing::warn!(error = %e, "Connection failed");
                        self.services.errors.capture_failure(&e, None);
                        self.set_state(ConnectionState::Faulted);
                        self.emit(StreamEvent::Disconnected {
                            reason: DisconnectReason::Fault,
                        });
                        if self.evaluate_reconnect(&run_cancel).await {
                            self.set_state(ConnectionState::Connecting);
                            continue;
                        }
                        return;
                    }
                },
            };

            self.set_state(ConnectionState::Open);
            self.attempts.store(0, Ordering::Release);
            self.armed.store(true, Ordering::Release);
            self.emit(StreamEvent::Connected);
            self.push_view_log("WebSocket connected".to_string()).await;

            let mut ws_stream = transport.ws_stream;
            let reason = tokio::select! {
                _ = run_cancel.cancelled() => {
                    let _ = ws_stream.close(None).await;
                    DisconnectReason::Normal
                }
                reason = process_messages(&mut ws_stream, &self.services) => {
                    if reason == DisconnectReason::Fault {
                        // Idempotent: the fault may already have torn the
                        // transport down.
                        let _ = ws_stream.close(None).await;
                    }
                    reason
                }
            };
            // Dropping the stream detaches all transport event handling.
            drop(ws_stream);

            self.set_state(match reason {
                DisconnectReason::Normal => ConnectionState::Closed,
                DisconnectReason::Fault => ConnectionState::Faulted,
            });
            self.emit(StreamEvent::Disconnected { reason });
            self.push_view_log(format!("WebSocket closed: {reason}")).await;

            if self.evaluate_reconnect(&run_cancel).await {
                self.set_state(ConnectionState::Connecting);
                continue;
            }
            return;
        }
    }

    /// Decide whether to retry, honoring the armed flag and the budget.
    ///
    /// Returns `true` once the backoff delay has elapsed and the retry
    /// may proceed.
    async fn evaluate_reconnect(&self, run_cancel: &CancellationToken) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            tracing::info!("Disconnected by user, not reconnecting");
            self.emit(StreamEvent::DisconnectedByUser);
            self.push_view_log("Disconnected by user".to_string()).await;
            return false;
        }

        let completed = self.attempts.load(Ordering::Acquire);
        if completed >= self.policy.max_attempts {
            tracing::warn!(attempts = completed, "Max reconnect attempts reached");
            self.emit(StreamEvent::ReconnectExhausted {
                attempts: completed,
            });
            self.push_view_log("Max reconnect attempts reached".to_string())
                .await;
            return false;
        }

        let delay = self.policy.delay_for(completed);
        let attempt = completed + 1;
        self.attempts.store(attempt, Ordering::Release);

        let delay_ms = delay.as_millis() as u64;
        tracing::info!(attempt, delay_ms, "Scheduling reconnect");
        self.emit(StreamEvent::ReconnectScheduled { attempt, delay_ms });
        self.push_view_log(format!(
            "Reconnecting in {delay_ms} ms (attempt {attempt}/{})",
            self.policy.max_attempts
        ))
        .await;

        if wait_for_retry(delay, &self.armed, run_cancel).await {
            return true;
        }

        if !run_cancel.is_cancelled() {
            // Disarmed while the timer ran: the user disconnected.
            tracing::info!("Disconnected by user, not reconnecting");
            self.emit(StreamEvent::DisconnectedByUser);
            self.push_view_log("Disconnected by user".to_string()).await;
        }
        false
    }
}
