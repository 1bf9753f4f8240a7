//! Connection lifecycle states.

use serde::Serialize;

/// State of the one logical transport connection a session owns.
///
/// `Closed` and `Faulted` can return to `Connecting` through the
/// reconnection policy or an explicit user `connect()`; `Idle` is reached
/// only by explicit teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    /// Closed by a transport fault rather than a normal close.
    Faulted,
}

impl ConnectionState {
    /// True while a transport is pending or established; a `connect()`
    /// call in these states is a no-op.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Faulted => "faulted",
        };
        f.write_str(label)
    }
}
