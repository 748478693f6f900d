//! Client-side reactions to HMR messages.

use crate::message::{HmrMessage, OutputRow};

/// Element id of the persistent on-page diagnostic panel.
pub const DIAGNOSTIC_ELEMENT_ID: &str = "devloop-hmr-error";

/// What a client did in response to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Logged an informational line
    Log(String),
    /// Rendered the build output table
    Table(Vec<OutputRow>),
    /// Reloaded the page
    Reload,
    /// Logged a type-check failure
    LogError(String),
    /// Logged an error and appended it to the diagnostic panel
    Diagnostic(String),
    /// Frame was not valid JSON or had an unknown type
    Ignored,
}

/// Persistent diagnostic element, created on the first `error` message
/// and appended to on every later one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticPanel {
    id: &'static str,
    text: String,
}

impl DiagnosticPanel {
    fn new() -> Self {
        Self {
            id: DIAGNOSTIC_ELEMENT_ID,
            text: String::new(),
        }
    }

    /// Element id.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Accumulated diagnostic text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Side effects a client performs. Browsers map these onto `console`,
/// `location.reload()` and the DOM; headless clients log them.
pub trait ClientSink: Send {
    /// Log an informational line.
    fn log(&mut self, text: &str);

    /// Render the build output table.
    fn table(&mut self, rows: &[OutputRow]);

    /// Log an error line.
    fn error(&mut self, text: &str);

    /// Reload the page.
    fn reload(&mut self);

    /// Show the diagnostic panel. `created` is true only the first time.
    fn show_diagnostic(&mut self, _panel: &DiagnosticPanel, _created: bool) {}
}

/// Dispatches raw frames to a [`ClientSink`].
pub struct MessageHandler {
    sink: Box<dyn ClientSink>,
    panel: Option<DiagnosticPanel>,
}

impl MessageHandler {
    pub fn new(sink: impl ClientSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            panel: None,
        }
    }

    /// The diagnostic panel, if any `error` message has been received.
    pub fn panel(&self) -> Option<&DiagnosticPanel> {
        self.panel.as_ref()
    }

    /// Handle one raw frame. Never fails: anything unparseable is ignored.
    pub fn handle(&mut self, raw: &str) -> ClientAction {
        let Some(message) = HmrMessage::parse(raw) else {
            tracing::trace!("ignoring HMR frame: {}", raw);
            return ClientAction::Ignored;
        };

        match message {
            HmrMessage::Message { message } => {
                self.sink.log(&message);
                ClientAction::Log(message)
            }
            HmrMessage::Output { message } => {
                self.sink.table(&message);
                ClientAction::Table(message)
            }
            HmrMessage::Reload => {
                self.sink.reload();
                ClientAction::Reload
            }
            HmrMessage::TscError { message } => {
                self.sink.error(&message);
                ClientAction::LogError(message)
            }
            HmrMessage::Error { message } => {
                self.sink.error(&message);
                let created = self.panel.is_none();
                let panel = self.panel.get_or_insert_with(DiagnosticPanel::new);
                panel.text.push_str(&message);
                self.sink.show_diagnostic(panel, created);
                ClientAction::Diagnostic(message)
            }
        }
    }
}

/// Sink for headless clients: everything goes to `tracing`, reloads run a
/// callback.
pub struct TracingSink {
    on_reload: Box<dyn FnMut() + Send>,
}

impl TracingSink {
    pub fn new(on_reload: impl FnMut() + Send + 'static) -> Self {
        Self {
            on_reload: Box::new(on_reload),
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(|| tracing::info!("[devloop] reload requested"))
    }
}

impl ClientSink for TracingSink {
    fn log(&mut self, text: &str) {
        tracing::info!("[devloop] {}", text);
    }

    fn table(&mut self, rows: &[OutputRow]) {
        for row in rows {
            tracing::info!("[devloop] {:<32} {:>10}", row.path, row.size);
        }
    }

    fn error(&mut self, text: &str) {
        tracing::error!("[devloop] {}", text);
    }

    fn reload(&mut self) {
        (self.on_reload)();
    }
}
