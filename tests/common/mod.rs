//! Common test utilities and helpers
//!
//! This module provides shared utilities for the integration tests:
//! - Stub identity verifier and failing message store
//! - A real server bound on an ephemeral port
//! - WebSocket client helpers built on tokio-tungstenite

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chathub::backend::auth::{IdentityVerifier, VerifyError};
use chathub::backend::chat::{HistoryQuery, InMemoryMessageStore, MessageStore, StoreError};
use chathub::backend::routes::create_router;
use chathub::backend::server::{build_state, AppState, ServerConfig};
use chathub::shared::{ChatMessage, Identity, NewMessage};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for a frame that should arrive
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding that no frame is coming
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Verifier that knows a fixed set of tokens
#[derive(Default)]
pub struct StubVerifier {
    tokens: HashMap<String, Identity>,
}

impl StubVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(VerifyError::Rejected(reqwest::StatusCode::UNAUTHORIZED))
    }
}

/// Store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn append(&self, _message: NewMessage) -> Result<ChatMessage, StoreError> {
        Err(StoreError::Unavailable("database is down".to_string()))
    }

    async fn recent(&self, _query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
        Err(StoreError::Unavailable("database is down".to_string()))
    }
}

/// A running server and handles to its internals
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl TestServer {
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/api/chat/ws?token={}", self.addr, token),
            None => format!("ws://{}/api/chat/ws", self.addr),
        }
    }

    /// Wait until the hub reports `expected` members
    pub async fn wait_for_members(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let count = self.state.hub.member_count().await.unwrap();
            if count == expected {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "hub has {} members, expected {}",
                count,
                expected
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Default test configuration: no database, short timeouts
pub fn test_config() -> ServerConfig {
    ServerConfig {
        verify_timeout: Duration::from_secs(1),
        store_timeout: Duration::from_secs(1),
        write_timeout: Duration::from_secs(2),
        ..ServerConfig::default()
    }
}

/// Verifier with the two users the tests use
pub fn alice_and_bob() -> StubVerifier {
    StubVerifier::new()
        .with_token("alice-token", Identity::new(1, "alice"))
        .with_token("bob-token", Identity::new(2, "bob"))
}

/// Start a server on an ephemeral port
pub async fn spawn_server(
    config: ServerConfig,
    store: Arc<dyn MessageStore>,
    verifier: Arc<dyn IdentityVerifier>,
) -> TestServer {
    let (state, _hub_task) = build_state(config, store, verifier);
    let app = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state }
}

/// Start a server with the in-memory store and the stub verifier
pub async fn spawn_default_server() -> (TestServer, Arc<InMemoryMessageStore>) {
    let store = Arc::new(InMemoryMessageStore::new());
    let server = spawn_server(test_config(), store.clone(), Arc::new(alice_and_bob())).await;
    (server, store)
}

/// Connect a WebSocket client, optionally with a token
pub async fn connect_ws(server: &TestServer, token: Option<&str>) -> WsClient {
    let (ws, _response) = tokio_tungstenite::connect_async(server.ws_url(token))
        .await
        .unwrap();
    ws
}

/// Attempt an upgrade with an explicit `Origin`, returning the HTTP status on refusal
pub async fn connect_with_origin(server: &TestServer, origin: &'static str) -> Result<WsClient, u16> {
    let mut request = server.ws_url(None).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("origin", HeaderValue::from_static(origin));

    match tokio_tungstenite::connect_async(request).await {
        Ok((ws, _)) => Ok(ws),
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => Err(response.status().as_u16()),
        Err(e) => panic!("unexpected handshake error: {}", e),
    }
}

/// Receive the next text frame as JSON
pub async fn next_envelope(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");

        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert that no text frame arrives within the silence window
pub async fn assert_silent(ws: &mut WsClient) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(SILENCE_WINDOW, ws.next()).await {
        panic!("expected no frame, got {}", text.as_str());
    }
}

/// Send a chat post
pub async fn post(ws: &mut WsClient, content: &str, temp_id: Option<&str>) {
    let mut frame = serde_json::json!({"type": "message", "content": content});
    if let Some(temp_id) = temp_id {
        frame["tempId"] = serde_json::Value::from(temp_id);
    }
    ws.send(Message::text(frame.to_string())).await.unwrap();
}
