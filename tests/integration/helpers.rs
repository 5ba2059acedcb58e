//! Shared test helpers for integration tests.
//!
//! Each test gets its own relay on an ephemeral port, backed by a real JWT
//! verifier, and talks to it with `tokio-tungstenite` clients.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use relay_api::AppState;
use relay_auth::{JwtEncoder, JwtVerifier};
use relay_core::config::AppConfig;
use relay_core::error::AppError;
use relay_core::types::Identity;

/// Secret shared by the test server and the token encoder.
pub const SECRET: &str = "integration-test-secret";

/// How long a client waits for an expected frame.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected test client.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay running on an ephemeral port.
pub struct TestServer {
    /// Bound address
    pub addr: SocketAddr,
    /// Effective configuration
    pub config: AppConfig,
    /// Shared state, for inspecting the engine directly
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), AppError>>,
}

impl TestServer {
    /// Starts a relay with test defaults.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a relay after letting `customize` adjust the configuration.
    pub async fn start_with(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.server.shutdown_grace_seconds = 2;
        customize(&mut config);

        let verifier = Arc::new(JwtVerifier::new(&config.auth));
        let state = AppState::new(config.clone(), verifier);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(relay_api::serve(listener, state.clone(), async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            config,
            state,
            shutdown: Some(tx),
            task,
        }
    }

    /// Mints a valid token for `identity`.
    pub fn token(&self, identity: &str) -> String {
        JwtEncoder::new(&self.config.auth)
            .issue(&Identity::new(identity))
            .unwrap()
            .token
    }

    /// HTTP base URL.
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Opens a WebSocket with the given bearer token and optional origin.
    pub async fn try_connect(
        &self,
        token: Option<&str>,
        origin: Option<&str>,
    ) -> Result<WsClient, tungstenite::Error> {
        let mut request = format!("ws://{}/ws", self.addr).into_client_request()?;
        if let Some(token) = token {
            request
                .headers_mut()
                .insert("authorization", format!("Bearer {token}").parse().unwrap());
        }
        if let Some(origin) = origin {
            request.headers_mut().insert("origin", origin.parse().unwrap());
        }
        let (ws, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    /// Connects as `identity` and waits until this connection has seen
    /// itself in a presence frame.
    pub async fn connect(&self, identity: &str) -> WsClient {
        let mut ws = self
            .try_connect(Some(&self.token(identity)), None)
            .await
            .unwrap();
        wait_for_online_containing(&mut ws, identity).await;
        ws
    }

    /// Triggers graceful shutdown and waits for the server to stop.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(10), &mut self.task)
            .await
            .expect("server stops in time")
            .expect("server task joins")
            .expect("server exits cleanly");
    }
}

/// Reads the next application event, skipping control frames.
pub async fn next_event(ws: &mut WsClient) -> Value {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str()).unwrap();
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => panic!("connection ended while waiting for an event: {other:?}"),
            }
        }
    })
    .await
    .expect("event arrives in time")
}

/// Reads events until one named `event` arrives.
pub async fn next_named(ws: &mut WsClient, event: &str) -> Value {
    loop {
        let frame = next_event(ws).await;
        if frame["event"] == event {
            return frame;
        }
    }
}

/// Online identities carried by a presence frame, sorted.
pub fn online_set(frame: &Value) -> Vec<String> {
    let mut ids: Vec<String> = frame["data"]
        .as_array()
        .expect("online data is an array")
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

/// Reads presence frames until one equals `expected`.
pub async fn wait_for_online(ws: &mut WsClient, expected: &[&str]) {
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    loop {
        let frame = next_named(ws, "online").await;
        if online_set(&frame) == expected {
            return;
        }
    }
}

async fn wait_for_online_containing(ws: &mut WsClient, identity: &str) {
    loop {
        let frame = next_named(ws, "online").await;
        if online_set(&frame).iter().any(|i| i == identity) {
            return;
        }
    }
}

/// Sends a JSON frame.
pub async fn send_json(ws: &mut WsClient, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Asserts no application event other than presence arrives within `window`.
pub async fn assert_no_event(ws: &mut WsClient, window: Duration) {
    let result = tokio::time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                    if frame["event"] != "online" {
                        return frame;
                    }
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended unexpectedly: {other:?}"),
            }
        }
    })
    .await;
    if let Ok(frame) = result {
        panic!("unexpected event: {frame}");
    }
}
