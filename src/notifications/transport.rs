//! Connection abstraction for the notification channel
//!
//! [`WsConnector`] is the real transport (tokio-tungstenite). The channel
//! only sees [`InboundFrame`]s, so tests can drive it with scripted
//! connections.

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Transport level failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to {url} failed: {message}")]
    Connect { url: String, message: String },
    #[error("websocket error: {0}")]
    Protocol(String),
}

/// One frame received from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text payload, used verbatim as a toast body
    Text(String),
    /// Binary payload, never valid for this channel
    Binary(Vec<u8>),
    /// Close frame with its reason, if any
    Close(Option<String>),
    /// Ping/pong and raw frames, answered by the transport itself
    Control,
}

/// An open connection. Receive-only.
pub trait Connection: Send + 'static {
    /// Next frame; `None` once the stream has ended
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<InboundFrame, TransportError>>>;

    /// Close from our side
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Opens connections to the backend
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Self::Connection, TransportError>>;
}

/// WebSocket connector
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Connection = WsConnection;

    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<WsConnection, TransportError>> {
        async move {
            let (stream, response) = tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            debug!("WebSocket handshake complete ({})", response.status());
            Ok(WsConnection { stream })
        }
        .boxed()
    }
}

/// Open WebSocket connection
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WsConnection {
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<InboundFrame, TransportError>>> {
        async move {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(TransportError::Protocol(e.to_string()))),
            };
            Some(Ok(match msg {
                Message::Text(text) => InboundFrame::Text(text.as_str().to_owned()),
                Message::Binary(data) => InboundFrame::Binary(data.to_vec()),
                Message::Close(frame) => InboundFrame::Close(
                    frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty()),
                ),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => InboundFrame::Control,
            }))
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async move {
            if let Err(e) = self.stream.close(None).await {
                debug!("WebSocket close failed: {}", e);
            }
        }
        .boxed()
    }
}
