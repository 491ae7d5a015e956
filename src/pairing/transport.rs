//! Persistent socket used by the pairing session.

use std::fmt;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

/// Opens links to the pairing endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, TransportError>;
}

/// An open connection. The client never writes to it.
#[async_trait]
pub trait Link: Send {
    /// Resolves once the connection is gone, with the reason it went away.
    async fn closed(&mut self) -> TransportError;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, TransportError> {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(TransportError::new(format!(
                "invalid pairing URL: {url}, must start with ws:// or wss://"
            )));
        }
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|err| TransportError::new(err.to_string()))?;
        Ok(Box::new(WebSocketLink { stream }))
    }
}

struct WebSocketLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WebSocketLink {
    async fn closed(&mut self) -> TransportError {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|frame| frame.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "no reason given".to_string());
                    return TransportError::new(format!("closed by peer: {reason}"));
                }
                Ok(other) => trace!(kind = frame_kind(&other), "ignoring pairing frame"),
                Err(err) => return TransportError::new(err.to_string()),
            }
        }
        TransportError::new("connection ended")
    }
}

fn frame_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}
