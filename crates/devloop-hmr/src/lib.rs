//! Hot-reload channel shared by the devloop server and its clients.
//!
//! The dev server pushes JSON messages to every browser subscribed to the
//! HMR WebSocket. This crate owns both ends of that contract:
//!
//! - [`message`] - The tagged message union and defensive parsing
//! - [`endpoint`] - WebSocket endpoint addressing and the browser client script
//! - [`client`] - A reconnecting Rust client with a process-wide connection table
//!
//! # Example
//!
//! ```rust
//! use devloop_hmr::HmrMessage;
//!
//! let wire = HmrMessage::Reload.to_json();
//! assert_eq!(wire, r#"{"type":"reload"}"#);
//! assert_eq!(HmrMessage::parse(&wire), Some(HmrMessage::Reload));
//! assert_eq!(HmrMessage::parse("not json"), None);
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod message;

pub use client::{
    ClientAction, ClientSink, ConnectionRegistry, ConnectionState, Connector, HmrClient,
    MessageHandler, Socket, SocketEvent, TracingSink, WsConnector, DIAGNOSTIC_ELEMENT_ID,
    RECONNECT_DELAY,
};
pub use endpoint::{HmrEndpoint, CLIENT_SCRIPT_PATH, DEFAULT_HMR_PATH};
pub use error::{HmrError, Result};
pub use message::{HmrMessage, OutputRow, HMR_TOPIC};
