//! Integration tests for the development server.
//!
//! HTTP routes are driven through the router directly. WebSocket tests run
//! the real server on an ephemeral port.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use devloop_cli::dev::server::bind_available;
use devloop_cli::dev::{Broadcaster, DevServer, HmrBus};
use devloop_hmr::{HmrEndpoint, HmrMessage, CLIENT_SCRIPT_PATH, HMR_TOPIC};
use futures_util::StreamExt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use tokio::time::{sleep, timeout, Duration};

fn output_dir() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("dist");
    fs::create_dir_all(&out_dir).unwrap();
    fs::write(out_dir.join("index.html"), "<p>hello</p>").unwrap();
    fs::write(out_dir.join("main.js"), "console.log(1)").unwrap();
    (temp, out_dir)
}

struct Running {
    port: u16,
    bus: Arc<HmrBus>,
    _temp: TempDir,
}

async fn start_server(ws_path: &str) -> Running {
    let (temp, out_dir) = output_dir();

    let listener = bind_available(0).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let bus = Arc::new(HmrBus::new());
    let server = DevServer::new(out_dir, HmrEndpoint::new(port, ws_path), Arc::clone(&bus));
    tokio::spawn(server.serve(listener));

    Running {
        port,
        bus,
        _temp: temp,
    }
}

/// Router over a fresh output dir, driven without a listener.
fn test_app(port: u16, ws_path: &str) -> (Router, TempDir) {
    let (temp, out_dir) = output_dir();

    let server = DevServer::new(out_dir, HmrEndpoint::new(port, ws_path), Arc::new(HmrBus::new()));
    (server.router(), temp)
}

async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn wait_for_subscribers(bus: &HmrBus, count: usize) {
    for _ in 0..100 {
        if bus.subscriber_count() >= count {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("subscribers never reached {}", count);
}

#[tokio::test]
async fn test_serves_output_directory() {
    let (app, _temp) = test_app(3000, "/hmr-ws");

    let response = get(app, "/main.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-store, no-cache, must-revalidate"
    );
    assert_eq!(body_text(response).await, "console.log(1)");
}

#[tokio::test]
async fn test_serves_index_at_root() {
    let (app, _temp) = test_app(3000, "/hmr-ws");

    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<p>hello</p>");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let (app, _temp) = test_app(3000, "/hmr-ws");

    let response = get(app, "/nope.js").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favicon_is_404() {
    let (app, _temp) = test_app(3000, "/hmr-ws");

    let response = get(app, "/favicon.ico").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_script_points_at_endpoint() {
    let (app, _temp) = test_app(4123, "/custom-hmr");

    let response = get(app, CLIENT_SCRIPT_PATH).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("ws://localhost:4123/custom-hmr"));
}

#[tokio::test]
async fn test_socket_receives_published_messages() {
    let server = start_server("/hmr-ws").await;
    let url = format!("ws://127.0.0.1:{}/hmr-ws", server.port);

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    wait_for_subscribers(&server.bus, 1).await;

    server.bus.publish(HMR_TOPIC, &HmrMessage::Reload.to_json());

    let message = timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no message received")
        .unwrap()
        .unwrap();
    assert_eq!(
        HmrMessage::parse(message.to_text().unwrap()),
        Some(HmrMessage::Reload)
    );
}

#[tokio::test]
async fn test_every_socket_gets_each_message() {
    let server = start_server("/hmr-ws").await;
    let url = format!("ws://127.0.0.1:{}/hmr-ws", server.port);

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_subscribers(&server.bus, 2).await;

    let info = HmrMessage::info("[HMR] main.ts change");
    server.bus.publish(HMR_TOPIC, &info.to_json());

    for socket in [&mut first, &mut second] {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no message received")
            .unwrap()
            .unwrap();
        assert_eq!(HmrMessage::parse(message.to_text().unwrap()), Some(info.clone()));
    }
}

#[tokio::test]
async fn test_closed_socket_unsubscribes() {
    let server = start_server("/hmr-ws").await;
    let url = format!("ws://127.0.0.1:{}/hmr-ws", server.port);

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    wait_for_subscribers(&server.bus, 1).await;

    socket.close(None).await.unwrap();

    for _ in 0..100 {
        if server.bus.subscriber_count() == 0 {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("subscriber was not removed after close");
}
