//! Process-wide table of HMR connections, keyed by endpoint URL.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle of one endpoint's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or gave up
    Disconnected,
    /// Handshake in flight
    Connecting,
    /// Socket open and receiving
    Open,
    /// Socket closed, reconnect timer running
    ClosedPendingRetry,
}

impl ConnectionState {
    /// Whether a socket currently exists for the endpoint.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

static GLOBAL: Lazy<Arc<ConnectionRegistry>> = Lazy::new(|| Arc::new(ConnectionRegistry::new()));

/// Endpoint URL → connection state.
///
/// At most one live socket exists per endpoint: [`try_claim`] is the only
/// way into `Connecting` and fails while a socket is live.
///
/// [`try_claim`]: ConnectionRegistry::try_claim
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<String, ConnectionState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every client in this process.
    pub fn global() -> Arc<ConnectionRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Claim the endpoint for a new connection attempt.
    ///
    /// Returns `false` without changing anything when a socket is already
    /// live for `url`.
    pub fn try_claim(&self, url: &str) -> bool {
        let mut entries = self.entries.lock();
        let state = entries
            .entry(url.to_string())
            .or_insert(ConnectionState::Disconnected);
        if state.is_live() {
            return false;
        }
        *state = ConnectionState::Connecting;
        true
    }

    /// Record a completed handshake.
    pub fn mark_open(&self, url: &str) {
        self.set(url, ConnectionState::Open);
    }

    /// Clear the socket reference after a close; a retry is pending.
    pub fn mark_closed(&self, url: &str) {
        self.set(url, ConnectionState::ClosedPendingRetry);
    }

    /// Forget the socket without scheduling a retry.
    pub fn release(&self, url: &str) {
        self.set(url, ConnectionState::Disconnected);
    }

    /// Current state for `url`; unknown endpoints are `Disconnected`.
    pub fn state(&self, url: &str) -> ConnectionState {
        self.entries
            .lock()
            .get(url)
            .copied()
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Whether a socket is live for `url`.
    pub fn is_live(&self, url: &str) -> bool {
        self.state(url).is_live()
    }

    fn set(&self, url: &str, state: ConnectionState) {
        self.entries.lock().insert(url.to_string(), state);
    }
}
