//! Socket abstraction under the HMR client.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::Result;

/// One thing that happened on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text frame (binary frames are decoded lossily)
    Message(String),
    /// A transport error; the socket may still close afterwards
    Error(String),
    /// The socket closed
    Closed,
}

/// An open connection yielding [`SocketEvent`]s.
#[async_trait]
pub trait Socket: Send {
    /// Wait for the next event. Returns [`SocketEvent::Closed`] forever
    /// once the connection is gone.
    async fn next_event(&mut self) -> SocketEvent;
}

/// Opens sockets to an endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(WsSocket {
            stream,
            closed: false,
        }))
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Socket for WsSocket {
    async fn next_event(&mut self) -> SocketEvent {
        if self.closed {
            return SocketEvent::Closed;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return SocketEvent::Message(text.as_str().to_string())
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return SocketEvent::Message(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return SocketEvent::Closed;
                }
                // Pings are answered by tungstenite on the next read
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    if matches!(
                        e,
                        tokio_tungstenite::tungstenite::Error::ConnectionClosed
                            | tokio_tungstenite::tungstenite::Error::AlreadyClosed
                    ) {
                        self.closed = true;
                        return SocketEvent::Closed;
                    }
                    return SocketEvent::Error(e.to_string());
                }
            }
        }
    }
}
