//! Test server harness for integration tests.
//!
//! Spins up the real editor router on a random port for testing with
//! WebSocket clients.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use editor_core::EditorConfig;
use editor_server::{build_router, AppState};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

/// Client side of an editor session.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the default editor configuration.
    pub async fn start() -> Self {
        Self::with_config(EditorConfig::default()).await
    }

    /// Start a server whose sessions use `config`.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn with_config(config: EditorConfig) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let app = build_router(AppState::new(config, Duration::from_millis(10)));

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// WebSocket URL of the editor endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect a client and consume the `editor_ready` greeting.
    pub async fn connect(&self) -> Client {
        let (mut client, _) = connect_async(self.ws_url())
            .await
            .expect("failed to connect");
        let ready = recv_json(&mut client).await.expect("editor_ready");
        assert_eq!(ready["type"], "editor_ready");
        client
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Receive and parse the next text frame, giving up after `wait`.
pub async fn recv_within(client: &mut Client, wait: Duration) -> Option<Value> {
    loop {
        let msg = timeout(wait, client.next()).await.ok()??.ok()?;
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Receive the next JSON message with a generous timeout.
pub async fn recv_json(client: &mut Client) -> Option<Value> {
    recv_within(client, Duration::from_secs(5)).await
}

/// Send a text frame.
pub async fn send_text(client: &mut Client, text: impl Into<String>) {
    client
        .send(Message::Text(text.into()))
        .await
        .expect("send failed");
}
