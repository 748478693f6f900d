//! HMR endpoint addressing and the browser client script.

/// Default WebSocket path for the HMR channel.
pub const DEFAULT_HMR_PATH: &str = "/hmr-ws";

/// Path the dev server serves the browser client script from.
pub const CLIENT_SCRIPT_PATH: &str = "/__devloop__/hmr-client.js";

const CLIENT_TEMPLATE: &str = include_str!("../assets/hmr-client.js");
const ENDPOINT_PLACEHOLDER: &str = "__DEVLOOP_HMR_ENDPOINT__";

/// Where browsers connect for hot-reload messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmrEndpoint {
    /// Use `wss://` instead of `ws://`
    pub secure: bool,
    /// Host name clients connect to
    pub host: String,
    /// Server port
    pub port: u16,
    /// WebSocket path, always starting with `/`
    pub path: String,
}

impl HmrEndpoint {
    /// Endpoint on `localhost` with the given port and path.
    pub fn new(port: u16, path: &str) -> Self {
        Self {
            secure: false,
            host: "localhost".to_string(),
            port,
            path: normalize_path(path),
        }
    }

    /// Full WebSocket URL, e.g. `ws://localhost:3000/hmr-ws`.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }

    /// Browser client script bound to this endpoint.
    ///
    /// The script is a self-invoking function, so it can be served as a
    /// standalone file or appended to a bundle.
    pub fn client_script(&self) -> String {
        CLIENT_TEMPLATE.replace(ENDPOINT_PLACEHOLDER, &self.url())
    }

    /// Client script prefixed for appending to the end of a bundle.
    pub fn footer(&self) -> String {
        format!("\n;{}", self.client_script())
    }
}

/// Ensure a WebSocket path starts with `/`; empty paths fall back to the default.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        DEFAULT_HMR_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
