//! Development server with hot reload over WebSocket.
//!
//! Serves the output directory from disk, the HMR client script, and the
//! HMR socket. Every socket subscribes to the bus on open and receives
//! everything published until it closes.

use crate::dev::state::HmrBus;
use crate::error::{CliError, ConfigError, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use devloop_hmr::{HmrEndpoint, CLIENT_SCRIPT_PATH, HMR_TOPIC};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

/// Interval between server pings on each HMR socket.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How many ports past the requested one to try.
const PORT_ATTEMPTS: u16 = 10;

#[derive(Clone)]
struct ServerState {
    bus: Arc<HmrBus>,
    client_script: Arc<str>,
}

/// Development server.
pub struct DevServer {
    out_dir: PathBuf,
    endpoint: HmrEndpoint,
    bus: Arc<HmrBus>,
    log_requests: bool,
}

impl DevServer {
    /// Create a new development server.
    ///
    /// # Arguments
    ///
    /// * `out_dir` - Directory served for every non-HMR path
    /// * `endpoint` - Where the HMR socket lives; also baked into the client script
    /// * `bus` - Broadcast bus the sockets subscribe to
    pub fn new(out_dir: PathBuf, endpoint: HmrEndpoint, bus: Arc<HmrBus>) -> Self {
        Self {
            out_dir,
            endpoint,
            bus,
            log_requests: false,
        }
    }

    pub fn with_request_log(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = ServerState {
            bus: Arc::clone(&self.bus),
            client_script: Arc::from(self.endpoint.client_script()),
        };

        let mut router = Router::new()
            .route(&self.endpoint.path, get(handle_socket_upgrade))
            .route(CLIENT_SCRIPT_PATH, get(handle_client_script))
            .route("/favicon.ico", get(handle_favicon))
            .fallback_service(ServeDir::new(&self.out_dir))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate"),
            ))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state);

        if self.log_requests {
            router = router.layer(middleware::from_fn(log_request));
        }
        router
    }

    /// Serve on `listener` until the task is dropped or the listener fails.
    ///
    /// # Errors
    ///
    /// Returns error if the server stops with an I/O failure
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// Bind `127.0.0.1:port`, moving up to the next free port when it's taken.
///
/// Port 0 lets the OS pick.
pub async fn bind_available(port: u16) -> Result<TcpListener> {
    if port != 0 && port < 1024 {
        crate::ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            port
        ));
    }

    for offset in 0..=PORT_ATTEMPTS {
        let candidate = port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if offset > 0 {
                    crate::ui::warning(&format!(
                        "Port {} is busy, using port {} instead",
                        port, candidate
                    ));
                }
                return Ok(listener);
            }
            Err(e) => tracing::debug!("Port {} unavailable: {}", candidate, e),
        }
        if port == 0 {
            break;
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        value: port.to_string(),
        hint: format!(
            "Ports {}-{} are all in use. Try a different port range.",
            port,
            port.saturating_add(PORT_ATTEMPTS)
        ),
    }
    .into())
}

async fn handle_socket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.bus))
}

/// Pump bus messages into one socket until either side goes away.
async fn handle_socket(socket: WebSocket, bus: Arc<HmrBus>) {
    let (id, mut rx) = bus.subscribe(HMR_TOPIC);
    tracing::debug!("HMR client {} connected", id);

    let (mut sender, mut receiver) = socket.split();
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    // Clients have nothing to say; only watch for the close
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    bus.unsubscribe(id);
    tracing::debug!("HMR client {} disconnected", id);
}

/// Serve the browser HMR client.
async fn handle_client_script(State(state): State<ServerState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        state.client_script.to_string(),
    )
}

async fn handle_favicon() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;
    tracing::info!("{} {} {}", method, uri, response.status().as_u16());
    response
}
