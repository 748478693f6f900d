//! HMR message protocol.
//!
//! Every server-to-client frame is one self-contained JSON object tagged by
//! `type`:
//!
//! | type       | payload                         |
//! |------------|---------------------------------|
//! | `message`  | `message: string`               |
//! | `output`   | `message: [{name, path, size}]` |
//! | `reload`   | none                            |
//! | `tscerror` | `message: string`               |
//! | `error`    | `message: string`               |
//!
//! Receivers parse with [`HmrMessage::parse`], which maps malformed JSON and
//! unknown tags to `None` instead of an error so older clients keep working
//! against newer servers.

use serde::{Deserialize, Serialize};

/// Topic every HMR socket subscribes to on open.
pub const HMR_TOPIC: &str = "message";

/// One row of the build output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    /// File name of the artifact
    pub name: String,
    /// Path of the artifact, including the output directory name
    pub path: String,
    /// Human-readable size (e.g. "1.5 KB")
    pub size: String,
}

/// Message pushed from the dev server to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HmrMessage {
    /// Informational line, logged by the client
    Message { message: String },

    /// Build output table, rendered by the client as a table
    Output { message: Vec<OutputRow> },

    /// Full page reload
    Reload,

    /// Type-check diagnostics from a failed gate run
    #[serde(rename = "tscerror")]
    TscError { message: String },

    /// Diagnostics shown on the page in a persistent panel
    Error { message: String },
}

impl HmrMessage {
    /// Shorthand for an informational message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Output { .. } => "output",
            Self::Reload => "reload",
            Self::TscError { .. } => "tscerror",
            Self::Error { .. } => "error",
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a raw frame.
    ///
    /// Returns `None` for anything that is not valid JSON or whose `type`
    /// is not one of the known kinds.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
