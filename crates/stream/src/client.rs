//! WebSocket client for connecting to the inference backend.
//!
//! [`StreamClient`] holds the connection configuration for one backend
//! endpoint. Call [`StreamClient::connect`] to establish a live
//! [`StreamTransport`] over WebSocket.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::StreamConfig;

/// Configuration handle for the backend stream endpoint.
pub struct StreamClient {
    ws_url: String,
}

/// A live WebSocket connection to the backend.
///
/// The raw stream is owned exclusively by the session task that drives
/// it; no other component touches the transport directly.
pub struct StreamTransport {
    pub ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            ws_url: config.ws_url,
        }
    }

    /// WebSocket URL this client connects to.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open a transport-level connection to the backend.
    pub async fn connect(&self) -> Result<StreamTransport, StreamClientError> {
        let (ws_stream, _response) = connect_async(self.ws_url.as_str()).await.map_err(|e| {
            StreamClientError::Connection(format!("Failed to connect to {}: {e}", self.ws_url))
        })?;

        tracing::info!(url = %self.ws_url, "Connected to stream backend");

        Ok(StreamTransport { ws_stream })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
