//! Real-time stream client for the vista viewer.
//!
//! Provides the WebSocket connection lifecycle with automatic
//! exponential-backoff reconnection, the typed inbound message protocol,
//! envelope dispatch into the metrics/render/view stores, and the
//! latest-known view projection.

pub mod client;
pub mod config;
pub mod events;
pub mod messages;
pub mod processor;
pub mod projection;
pub mod reconnect;
pub mod session;
pub mod state;

pub use client::{StreamClient, StreamClientError, StreamTransport};
pub use config::{StreamConfig, DEFAULT_WS_URL};
pub use events::{DisconnectReason, StreamEvent};
pub use messages::{parse_envelope, ProtocolError, StreamEnvelope};
pub use projection::{ViewState, LOG_WINDOW};
pub use reconnect::ReconnectPolicy;
pub use session::{StreamServices, StreamSession};
pub use state::ConnectionState;
