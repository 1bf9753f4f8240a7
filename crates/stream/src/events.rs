//! Session-level events emitted by the stream connection.
//!
//! These describe lifecycle changes the rest of the application cares
//! about, produced after interpreting raw transport events. They are
//! broadcast via a [`tokio::sync::broadcast`] channel; call
//! [`StreamSession::subscribe`](crate::session::StreamSession::subscribe)
//! to receive them.

use serde::Serialize;

/// Why the transport went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Normal close handshake or stream end.
    Normal,
    /// Transport-level fault (reset, receive error).
    Fault,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DisconnectReason::Normal => "normal",
            DisconnectReason::Fault => "error",
        })
    }
}

/// A session-level event originating from the stream connection.
#[derive(Debug, Clone, Serialize)]
pub enum StreamEvent {
    /// The WebSocket connection was established.
    Connected,

    /// The WebSocket connection was lost.
    Disconnected { reason: DisconnectReason },

    /// An automatic reconnect was scheduled.
    ReconnectScheduled {
        /// 1-based retry number.
        attempt: u32,
        delay_ms: u64,
    },

    /// The retry budget is exhausted; user action is required.
    ReconnectExhausted { attempts: u32 },

    /// The user disconnected; the retry loop will not run.
    DisconnectedByUser,
}
