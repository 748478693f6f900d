//! Reconnecting HMR client.
//!
//! Mirrors the browser script served by the dev server: one socket per
//! endpoint per process, messages dispatched through a [`MessageHandler`],
//! and a fixed delay before every reconnect attempt.

mod handler;
mod registry;
mod transport;

pub use handler::{
    ClientAction, ClientSink, DiagnosticPanel, MessageHandler, TracingSink, DIAGNOSTIC_ELEMENT_ID,
};
pub use registry::{ConnectionRegistry, ConnectionState};
pub use transport::{Connector, Socket, SocketEvent, WsConnector};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Client for one HMR endpoint.
pub struct HmrClient {
    url: String,
    connector: Arc<dyn Connector>,
    handler: Mutex<MessageHandler>,
    registry: Arc<ConnectionRegistry>,
    reconnect_delay: Duration,
}

impl HmrClient {
    /// Client over a real WebSocket, registered in the process-wide table.
    pub fn new(url: impl Into<String>, sink: impl ClientSink + 'static) -> Self {
        Self {
            url: url.into(),
            connector: Arc::new(WsConnector),
            handler: Mutex::new(MessageHandler::new(sink)),
            registry: ConnectionRegistry::global(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.registry.state(&self.url)
    }

    /// Start the connection loop.
    ///
    /// Returns `None` without doing anything when a socket for this URL is
    /// already live in the registry. The loop runs until the task is
    /// aborted or another client takes over the endpoint.
    pub fn connect(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.registry.try_claim(&self.url) {
            tracing::debug!("[devloop] already connected to {}", self.url);
            return None;
        }
        let client = Arc::clone(self);
        Some(tokio::spawn(async move { client.run().await }))
    }

    async fn run(&self) {
        loop {
            let mut claim = Claim {
                registry: &self.registry,
                url: &self.url,
                held: true,
            };
            self.session().await;
            self.registry.mark_closed(&self.url);
            claim.held = false;

            tracing::warn!(
                "[devloop] Connection closed. Will retry in {} seconds...",
                self.reconnect_delay.as_secs()
            );
            tokio::time::sleep(self.reconnect_delay).await;

            if !self.registry.try_claim(&self.url) {
                return;
            }
            tracing::info!("[devloop] Attempting to reconnect...");
        }
    }

    async fn session(&self) {
        tracing::info!("[devloop] Connecting to dev server at {}", self.url);
        let mut socket = match self.connector.connect(&self.url).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::error!("[devloop] ERROR {}", e);
                return;
            }
        };
        self.registry.mark_open(&self.url);
        tracing::info!("[devloop] Connected to dev server");

        loop {
            match socket.next_event().await {
                SocketEvent::Message(raw) => {
                    self.handler.lock().handle(&raw);
                }
                SocketEvent::Error(e) => tracing::error!("[devloop] ERROR {}", e),
                SocketEvent::Closed => break,
            }
        }
    }
}

/// Releases the endpoint if the task is dropped mid-session.
struct Claim<'a> {
    registry: &'a ConnectionRegistry,
    url: &'a str,
    held: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.held {
            self.registry.release(self.url);
        }
    }
}
