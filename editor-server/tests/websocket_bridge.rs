//! WebSocket host bridge integration tests.
//!
//! Tests real WebSocket sessions against the editor server:
//! 1. Connect and receive `editor_ready`
//! 2. Send host commands and receive patches
//! 3. Verify rejected frames produce no traffic and keep the session open
//! 4. Verify the tick drives readiness retries

mod common;

use std::time::Duration;

use editor_core::{EditorConfig, RetryConfig};
use serde_json::{json, Value};

use common::{recv_json, recv_within, send_text, TestServer};

/// Build a versioned inbound envelope.
fn envelope(kind: &str, payload: Value) -> String {
    json!({
        "type": kind,
        "version": 1,
        "payload": payload,
        "id": format!("host-{kind}"),
        "timestamp": "2024-05-01T12:00:00Z"
    })
    .to_string()
}

#[tokio::test]
async fn connect_receives_editor_ready() {
    let server = TestServer::start().await;
    let (mut client, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("failed to connect");

    let ready = recv_json(&mut client).await.expect("editor_ready");
    assert_eq!(ready["type"], "editor_ready");
    assert_eq!(ready["version"], 1);
    assert_eq!(ready["payload"]["protocolVersion"], 1);
    assert!(ready["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(ready["timestamp"].is_string());

    server.shutdown().await;
}

#[tokio::test]
async fn add_state_center_round_trip() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send_text(&mut client, envelope("load_automaton", json!({"states": [], "transitions": []}))).await;
    send_text(&mut client, envelope("add_state_center", json!({}))).await;

    let patch = recv_json(&mut client).await.expect("patch");
    assert_eq!(patch["type"], "patch");
    let upsert = &patch["payload"]["states"]["upsert"][0];
    assert_eq!(upsert["label"], "q0");
    assert_eq!(upsert["isInitial"], true);

    let added = recv_json(&mut client).await.expect("state.add");
    assert_eq!(added["type"], "state.add");

    server.shutdown().await;
}

#[tokio::test]
async fn unversioned_envelope_is_silently_dropped() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send_text(&mut client, r#"{"type":"x","payload":{}}"#).await;
    send_text(&mut client, r#"{"type":"zoom_in","payload":{}}"#).await;
    send_text(&mut client, "not json at all").await;
    assert!(recv_within(&mut client, Duration::from_millis(200)).await.is_none());

    // The session is still alive.
    send_text(&mut client, envelope("zoom_in", json!({}))).await;
    let patch = recv_json(&mut client).await.expect("patch");
    assert_eq!(patch["type"], "patch");
    assert!(patch["payload"]["viewport"]["zoom"].as_f64().unwrap_or_default() > 1.0);

    server.shutdown().await;
}

#[tokio::test]
async fn oversized_frame_rejected_without_closing() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let padding = "x".repeat(editor_core::protocol::MAX_MESSAGE_BYTES);
    send_text(&mut client, envelope("zoom_in", json!({"padding": padding}))).await;
    assert!(recv_within(&mut client, Duration::from_millis(200)).await.is_none());

    send_text(&mut client, envelope("zoom_out", json!({}))).await;
    let patch = recv_json(&mut client).await.expect("patch");
    assert_eq!(patch["type"], "patch");

    server.shutdown().await;
}

#[tokio::test]
async fn host_patch_is_not_echoed() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let patch = json!({
        "states": {"upsert": [{"id": "q0", "label": "q0", "x": 10, "y": 10}], "delete": []}
    });
    send_text(&mut client, envelope("apply_patch", patch)).await;
    send_text(&mut client, envelope("set_routing", json!({"mode": "orthogonal"}))).await;
    assert!(recv_within(&mut client, Duration::from_millis(200)).await.is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn sessions_are_isolated() {
    let server = TestServer::start().await;
    let mut first = server.connect().await;
    let mut second = server.connect().await;

    send_text(&mut first, envelope("add_state_center", json!({}))).await;
    assert_eq!(recv_json(&mut first).await.expect("patch")["type"], "patch");
    assert!(recv_within(&mut second, Duration::from_millis(200)).await.is_none());

    // The second editor is still empty, so its first state is q0 as well.
    send_text(&mut second, envelope("add_state_center", json!({}))).await;
    let patch = recv_json(&mut second).await.expect("patch");
    assert_eq!(patch["payload"]["states"]["upsert"][0]["label"], "q0");

    server.shutdown().await;
}

#[tokio::test]
async fn queued_commands_dropped_after_retries() {
    let config = EditorConfig {
        renderer_ready: false,
        forward_diagnostics: true,
        retry: RetryConfig::new(2, 10, 20, 2.0),
        ..EditorConfig::default()
    };
    let server = TestServer::with_config(config).await;
    let mut client = server.connect().await;

    send_text(&mut client, envelope("zoom_in", json!({}))).await;

    let log = recv_json(&mut client).await.expect("log");
    assert_eq!(log["type"], "log");
    assert_eq!(log["payload"]["level"], "error");
    assert!(recv_within(&mut client, Duration::from_millis(200)).await.is_none());

    server.shutdown().await;
}
