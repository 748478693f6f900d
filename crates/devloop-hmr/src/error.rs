//! Error type for the HMR client side.

use thiserror::Error;

/// Errors raised while talking to an HMR endpoint.
#[derive(Debug, Error)]
pub enum HmrError {
    /// The WebSocket handshake or transport failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Result alias for HMR operations.
pub type Result<T, E = HmrError> = std::result::Result<T, E>;
