//! Environment-style configuration for the stream client.

/// Default WebSocket endpoint of the inference backend.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Connection settings for one viewer session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket URL of the backend push feed.
    pub ws_url: String,
}

impl StreamConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// Read the configuration from the environment (`VISTA_WS_URL`),
    /// falling back to [`DEFAULT_WS_URL`].
    pub fn from_env() -> Self {
        Self {
            ws_url: std::env::var("VISTA_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WS_URL)
    }
}
