//! WebSocket editor sessions.
//!
//! Each connection gets its own [`HostBridge`]. Incoming text frames are
//! size-checked and handed to the bridge; whatever it returns goes straight
//! back to the client. A fixed-rate tick advances the move debounce and the
//! readiness retries, using milliseconds since the connection opened as the
//! bridge clock.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use editor_core::{Envelope, HostBridge};
use futures::{Sink, SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::metrics::{record_envelope, record_rejected, set_ws_connections};
use crate::validation::{validate_message_size, ValidationError};
use crate::AppState;

/// WebSocket upgrade handler for `/ws`.
#[tracing::instrument(name = "websocket_connect", skip(ws, state))]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Send envelopes in order. Envelopes that fail to encode are skipped.
async fn send_envelopes<S>(sender: &mut S, envelopes: &[Envelope]) -> Result<(), <S as Sink<Message>>::Error>
where
    S: Sink<Message> + Unpin,
{
    for envelope in envelopes {
        match envelope.to_json() {
            Ok(json) => {
                sender.send(Message::Text(json.into())).await?;
                record_envelope("outbound", &envelope.kind);
            }
            Err(e) => tracing::error!(kind = %envelope.kind, "Failed to encode envelope: {}", e),
        }
    }
    Ok(())
}

/// Run one editor session until the client goes away.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::new_v4().to_string();
    let mut bridge = HostBridge::new((*state.config).clone());
    let started = Instant::now();

    set_ws_connections(state.session_opened());
    tracing::info!(session_id = %session_id, "Editor session opened");

    if send_envelopes(&mut sender, &bridge.ready_envelope())
        .await
        .is_err()
    {
        close_session(&state, &session_id, &bridge);
        return;
    }

    let mut ticker = tokio::time::interval(state.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let outbound = match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = validate_message_size(text.len()) {
                            reject(&session_id, &e);
                            continue;
                        }
                        record_envelope("inbound", "frame");
                        let rejected_before = bridge.rejected_count();
                        let outbound = bridge.handle_message(text.as_str(), elapsed_ms(started));
                        if bridge.rejected_count() > rejected_before {
                            record_rejected("protocol");
                        }
                        outbound
                    }
                    Some(Ok(Message::Binary(_))) => {
                        reject(&session_id, &ValidationError::BinaryFrame);
                        continue;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(session_id = %session_id, "Client closed the session");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(session_id = %session_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    // Ping/pong are answered by axum.
                    Some(Ok(_)) => continue,
                };
                if send_envelopes(&mut sender, &outbound).await.is_err() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let outbound = bridge.tick(elapsed_ms(started));
                if send_envelopes(&mut sender, &outbound).await.is_err() {
                    break;
                }
            }
        }
    }

    close_session(&state, &session_id, &bridge);
}

fn reject(session_id: &str, error: &ValidationError) {
    tracing::warn!(session_id = %session_id, "Frame rejected: {}", error);
    record_rejected(error.kind());
}

fn close_session(state: &AppState, session_id: &str, bridge: &HostBridge) {
    set_ws_connections(state.session_closed());
    tracing::info!(
        session_id = %session_id,
        rejected = bridge.rejected_count(),
        states = bridge.editor().graph().state_count(),
        "Editor session closed"
    );
}
