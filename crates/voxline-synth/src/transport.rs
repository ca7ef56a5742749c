//! Transport abstraction and the WebSocket client implementation.
//!
//! [`Transport`] is the seam between the session driver and the wire:
//! the production implementation is [`WsTransport`] (tokio-tungstenite);
//! tests drive the session with scripted in-memory transports instead.
//!
//! The transport speaks [`WireMessage`] in both directions — the two
//! frame families the protocol multiplexes over one connection. Ping,
//! pong, and raw frames are handled below this seam and never reach the
//! session.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use voxline_core::{SynthConfig, SynthesisError};

/// One message on the duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// A structured control envelope (JSON).
    Text(String),

    /// An opaque binary audio frame.
    Binary(Bytes),
}

/// A duplex, message-oriented connection carrying one task's traffic.
///
/// Exclusively owned by one session for its entire lifetime; not shared
/// or reused across tasks.
#[async_trait]
pub trait Transport: Send {
    /// Transmit one message. An error here fails the session.
    async fn send(&mut self, message: WireMessage) -> Result<(), SynthesisError>;

    /// Receive the next message in arrival order.
    ///
    /// `None` means the connection closed; `Some(Err(_))` is a
    /// transport-level failure. Both end the session if no terminal
    /// event was observed first.
    async fn next_message(&mut self) -> Option<Result<WireMessage, SynthesisError>>;

    /// Close the connection. Best-effort: teardown must not fail the
    /// session outcome that caused it.
    async fn close(&mut self);
}

// ── WebSocket implementation ───────────────────────────────────────

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Bearer-authenticated WebSocket transport.
pub struct WsTransport {
    tx: WsSink,
    rx: WsStream,
}

impl WsTransport {
    /// Establish the connection and complete the handshake.
    ///
    /// The handshake is bounded by `config.connect_timeout`; an
    /// unreachable endpoint surfaces as a transport error rather than
    /// hanging the caller.
    pub async fn connect(config: &SynthConfig) -> Result<Self, SynthesisError> {
        let request = build_request(&config.endpoint, &config.api_key)?;

        let (stream, response) =
            tokio::time::timeout(config.connect_timeout, connect_async(request))
                .await
                .map_err(|_| {
                    SynthesisError::Transport(format!(
                        "connection to {} timed out after {:?}",
                        config.endpoint, config.connect_timeout
                    ))
                })?
                .map_err(|e| {
                    SynthesisError::Transport(format!("WebSocket handshake failed: {e}"))
                })?;

        info!(endpoint = %config.endpoint, status = %response.status(), "websocket connected");

        let (tx, rx) = stream.split();
        Ok(Self { tx, rx })
    }
}

/// Build the client handshake request with the bearer credential.
fn build_request(
    endpoint: &str,
    api_key: &str,
) -> Result<tungstenite::http::Request<()>, SynthesisError> {
    tungstenite::http::Request::builder()
        .uri(endpoint)
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Authorization", format!("bearer {api_key}"))
        .header("X-DashScope-DataInspection", "enable")
        .body(())
        .map_err(|e| SynthesisError::Transport(format!("invalid endpoint '{endpoint}': {e}")))
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, message: WireMessage) -> Result<(), SynthesisError> {
        let frame = match message {
            WireMessage::Text(text) => Message::Text(text.into()),
            WireMessage::Binary(data) => Message::Binary(data),
        };
        self.tx
            .send(frame)
            .await
            .map_err(|e| SynthesisError::Transport(format!("failed to send: {e}")))
    }

    async fn next_message(&mut self) -> Option<Result<WireMessage, SynthesisError>> {
        loop {
            return match self.rx.next().await? {
                Ok(Message::Binary(data)) => Some(Ok(WireMessage::Binary(data))),
                Ok(Message::Text(text)) => Some(Ok(WireMessage::Text(text.as_str().to_owned()))),
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => {
                            info!(code = %frame.code, reason = %frame.reason, "websocket closed by peer");
                        }
                        None => info!("websocket closed by peer"),
                    }
                    None
                }
                // Control frames below the message layer.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => Some(Err(SynthesisError::Transport(format!(
                    "websocket receive failed: {e}"
                )))),
            };
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.tx.close().await {
            warn!(error = %e, "websocket close failed");
        } else {
            debug!("websocket closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_bearer_credential() {
        let request = build_request("wss://example.com/inference/", "sk-test").unwrap();
        let auth = request.headers().get("Authorization").unwrap();
        assert_eq!(auth, "bearer sk-test");
        assert_eq!(request.uri().host(), Some("example.com"));
    }

    #[test]
    fn invalid_endpoint_is_a_transport_error() {
        let err = build_request("not a uri", "sk-test").unwrap_err();
        assert!(matches!(err, SynthesisError::Transport(_)));
    }
}
