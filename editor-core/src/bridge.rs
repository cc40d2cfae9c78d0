//! # Host Bridge
//!
//! The boundary between an [`Editor`] and its host. Inbound text is
//! validated and decoded into an [`InboundCommand`]; anything rejected is
//! logged and dropped, never surfaced as an error or panic. Outbound events
//! are wrapped in versioned [`Envelope`]s.
//!
//! ## Readiness gate
//!
//! Until the renderer reports ready, commands are held in a bounded queue
//! (oldest dropped when full). On every [`HostBridge::tick`] past the retry
//! deadline the bridge checks readiness again, backing off exponentially.
//! Once ready the queue drains in arrival order; after `max_retries` failed
//! checks it is dropped with a diagnostic.

use std::collections::VecDeque;

use serde_json::Value;

use crate::protocol::{
    Envelope, InboundCommand, LogLevel, OutboundEvent, ReadyPayload, MAX_MESSAGE_BYTES,
    PROTOCOL_VERSION,
};
use crate::{Editor, EditorConfig, ProtocolError};

/// Retry state while commands wait for the renderer.
#[derive(Debug, Clone, Copy, Default)]
struct RetryState {
    attempt: u32,
    deadline_ms: u64,
}

/// Envelope codec, readiness gate and command dispatch around an editor.
#[derive(Debug, Clone)]
pub struct HostBridge {
    editor: Editor,
    renderer_ready: bool,
    pending: VecDeque<InboundCommand>,
    retry: Option<RetryState>,
    rejected: u64,
}

impl Default for HostBridge {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl HostBridge {
    /// Create a bridge around a fresh editor.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            renderer_ready: config.renderer_ready,
            editor: Editor::new(config),
            pending: VecDeque::new(),
            retry: None,
            rejected: 0,
        }
    }

    /// The editor session.
    #[must_use]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Mutable access for local input (pointer, keyboard, label edits).
    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Number of inbound messages rejected so far.
    #[must_use]
    pub const fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Number of commands waiting for the renderer.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the renderer is ready.
    #[must_use]
    pub const fn renderer_ready(&self) -> bool {
        self.renderer_ready
    }

    /// Record renderer readiness. Queued commands run on the next retry check.
    pub fn set_renderer_ready(&mut self, ready: bool) {
        self.renderer_ready = ready;
    }

    /// The `editor_ready` envelope announcing this editor.
    #[must_use]
    pub fn ready_envelope(&mut self) -> Vec<Envelope> {
        self.editor
            .emit(OutboundEvent::EditorReady(ReadyPayload::default()));
        self.drain_outbound()
    }

    /// Handle one inbound text message.
    ///
    /// Returns the envelopes to send back to the host. Rejected messages
    /// yield nothing, or a single `log` envelope when diagnostics are
    /// forwarded.
    pub fn handle_message(&mut self, raw: &str, now_ms: u64) -> Vec<Envelope> {
        match self.decode(raw) {
            Ok(command) => self.submit(command, now_ms),
            Err(e) => self.reject(&e),
        }
        self.drain_outbound()
    }

    /// Decode and validate an inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error for oversized, malformed, unversioned (unless
    /// legacy envelopes are enabled), future-versioned or unknown messages.
    pub fn decode(&self, raw: &str) -> Result<InboundCommand, ProtocolError> {
        if raw.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::TooLarge {
                size: raw.len(),
                max: MAX_MESSAGE_BYTES,
            });
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::Malformed("expected a JSON object".to_string()));
        };

        match object.get("version") {
            None if self.editor.config().accept_legacy_envelopes => {}
            None | Some(Value::Null) => return Err(ProtocolError::MissingVersion),
            Some(version) => {
                let found = version
                    .as_u64()
                    .ok_or_else(|| ProtocolError::InvalidVersion(version.to_string()))?;
                if found > u64::from(PROTOCOL_VERSION) {
                    return Err(ProtocolError::UnsupportedVersion {
                        found,
                        supported: PROTOCOL_VERSION,
                    });
                }
            }
        }

        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(ProtocolError::Malformed("missing message type".to_string())),
        };
        let payload = object.remove("payload").unwrap_or(Value::Null);
        InboundCommand::decode(&kind, payload)
    }

    fn reject(&mut self, error: &ProtocolError) {
        self.rejected += 1;
        tracing::warn!(error = %error, "Dropping inbound message");
        if self.editor.config().forward_diagnostics {
            self.editor.emit(OutboundEvent::log(
                LogLevel::Warn,
                format!("Dropped message: {error}"),
            ));
        }
    }

    /// Run a command now, or queue it until the renderer is ready.
    fn submit(&mut self, command: InboundCommand, now_ms: u64) {
        if self.renderer_ready && self.pending.is_empty() {
            self.dispatch(command);
            return;
        }
        if self.pending.len() >= self.editor.config().pending_command_capacity.max(1) {
            if let Some(dropped) = self.pending.pop_front() {
                tracing::warn!(kind = dropped.kind(), "Pending queue full, dropping oldest command");
            }
        }
        tracing::debug!(kind = command.kind(), "Renderer not ready, queueing command");
        self.pending.push_back(command);
        if self.retry.is_none() {
            self.retry = Some(RetryState {
                attempt: 0,
                deadline_ms: now_ms.saturating_add(self.retry_delay_ms(0)),
            });
        }
    }

    fn retry_delay_ms(&self, attempt: u32) -> u64 {
        let delay = self.editor.config().retry.delay_for_attempt(attempt);
        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Advance timers: readiness retries and the move debounce.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Envelope> {
        self.check_readiness(now_ms);
        self.editor.tick(now_ms);
        self.drain_outbound()
    }

    fn check_readiness(&mut self, now_ms: u64) {
        let Some(state) = self.retry else {
            return;
        };
        if now_ms < state.deadline_ms {
            return;
        }
        if self.renderer_ready {
            self.retry = None;
            tracing::debug!(count = self.pending.len(), "Renderer ready, draining queue");
            while let Some(command) = self.pending.pop_front() {
                self.dispatch(command);
            }
            return;
        }

        let attempt = state.attempt + 1;
        let max_retries = self.editor.config().retry.max_retries;
        if attempt >= max_retries {
            let dropped = self.pending.len();
            self.pending.clear();
            self.retry = None;
            tracing::warn!(attempts = attempt, dropped, "Renderer never became ready");
            if self.editor.config().forward_diagnostics {
                self.editor.emit(OutboundEvent::log(
                    LogLevel::Error,
                    format!("Renderer not ready after {attempt} checks, dropped {dropped} commands"),
                ));
            }
            return;
        }
        tracing::debug!(attempt, "Renderer not ready, backing off");
        self.retry = Some(RetryState {
            attempt,
            deadline_ms: now_ms.saturating_add(self.retry_delay_ms(attempt)),
        });
    }

    /// Earliest time [`HostBridge::tick`] has work to do.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let retry = self.retry.map(|r| r.deadline_ms);
        match (retry, self.editor.next_deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn dispatch(&mut self, command: InboundCommand) {
        tracing::debug!(kind = command.kind(), "Handling host command");
        match command {
            InboundCommand::LoadAutomaton(document) => self.editor.load_automaton(document),
            InboundCommand::ApplyPatch(patch) => self.editor.apply_remote_patch(&patch),
            InboundCommand::SetRouting(payload) => self.editor.set_routing_remote(payload.mode),
            InboundCommand::Highlight(payload) => {
                let (states, transitions) = (payload.state_ids(), payload.transition_ids());
                if states.is_empty() && transitions.is_empty() {
                    self.editor.clear_highlight();
                } else {
                    self.editor.highlight(states, transitions);
                }
            }
            InboundCommand::ClearHighlight => self.editor.clear_highlight(),
            InboundCommand::ZoomIn => self.editor.zoom_in(),
            InboundCommand::ZoomOut => self.editor.zoom_out(),
            InboundCommand::FitContent => self.editor.fit_content(),
            InboundCommand::ResetView => self.editor.reset_view(),
            InboundCommand::AddStateCenter => {
                if let Err(e) = self.editor.add_state_center() {
                    tracing::warn!("add_state_center failed: {e}");
                }
            }
        }
    }

    /// Wrap every event the editor emitted since the last call.
    pub fn drain_outbound(&mut self) -> Vec<Envelope> {
        self.editor
            .take_events()
            .iter()
            .filter_map(|event| match Envelope::from_event(event) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    tracing::error!(kind = event.kind(), "Failed to encode event: {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryConfig;
    use serde_json::json;

    fn envelope(kind: &str, payload: &Value) -> String {
        json!({
            "type": kind,
            "version": 1,
            "payload": payload,
            "id": "m1",
            "timestamp": "2024-01-01T00:00:00Z"
        })
        .to_string()
    }

    fn not_ready_config() -> EditorConfig {
        EditorConfig {
            renderer_ready: false,
            retry: RetryConfig::new(3, 10, 100, 2.0),
            ..EditorConfig::default()
        }
    }

    #[test]
    fn test_ready_envelope() {
        let mut bridge = HostBridge::default();
        let out = bridge.ready_envelope();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, "editor_ready");
        assert_eq!(out[0].payload["protocolVersion"], 1);
    }

    #[test]
    fn test_unversioned_envelope_rejected() {
        let mut bridge = HostBridge::default();
        let out = bridge.handle_message(r#"{"type":"x","payload":{}}"#, 0);
        assert!(out.is_empty());
        assert_eq!(bridge.rejected_count(), 1);
    }

    #[test]
    fn test_legacy_envelope_accepted_when_enabled() {
        let mut bridge = HostBridge::new(EditorConfig {
            accept_legacy_envelopes: true,
            ..EditorConfig::default()
        });
        let out = bridge.handle_message(r#"{"type":"add_state_center","payload":{}}"#, 0);
        assert_eq!(bridge.rejected_count(), 0);
        assert_eq!(bridge.editor().graph().state_count(), 1);
        assert!(out.iter().any(|e| e.kind == "patch"));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut bridge = HostBridge::default();
        let raw = json!({"type": "zoom_in", "version": 2, "payload": {}}).to_string();
        assert!(matches!(
            bridge.decode(&raw),
            Err(ProtocolError::UnsupportedVersion { found: 2, .. })
        ));
        assert!(bridge.handle_message(&raw, 0).is_empty());
        assert!((bridge.editor().graph().viewport.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_and_non_object_rejected() {
        let bridge = HostBridge::default();
        assert!(matches!(bridge.decode("{nope"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(bridge.decode("[1,2]"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            bridge.decode(r#"{"type":"zoom_in","version":"1"}"#),
            Err(ProtocolError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_oversized_message_rejected() {
        let bridge = HostBridge::default();
        let raw = "x".repeat(MAX_MESSAGE_BYTES + 1);
        assert!(matches!(bridge.decode(&raw), Err(ProtocolError::TooLarge { .. })));
    }

    #[test]
    fn test_forwarded_diagnostics() {
        let mut bridge = HostBridge::new(EditorConfig {
            forward_diagnostics: true,
            ..EditorConfig::default()
        });
        let out = bridge.handle_message("not json", 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, "log");
        assert_eq!(out[0].payload["level"], "warn");
    }

    #[test]
    fn test_apply_patch_does_not_echo() {
        let mut bridge = HostBridge::default();
        let raw = envelope(
            "apply_patch",
            &json!({"states": {"upsert": [{"id": "q0", "x": 5}], "delete": []}}),
        );
        assert!(bridge.handle_message(&raw, 0).is_empty());
        assert!(bridge.editor().graph().state("q0").is_some());
        assert!(!bridge.editor().history().can_undo());
    }

    #[test]
    fn test_set_routing_is_silent() {
        let mut bridge = HostBridge::default();
        let out = bridge.handle_message(&envelope("set_routing", &json!({"mode": "orthogonal"})), 0);
        assert!(out.is_empty());
        assert_eq!(
            bridge.editor().graph().routing_mode,
            crate::RoutingMode::Orthogonal
        );
    }

    #[test]
    fn test_empty_highlight_clears() {
        let mut bridge = HostBridge::default();
        bridge.handle_message(&envelope("highlight", &json!({"states": ["q0"]})), 0);
        assert_eq!(bridge.editor().highlights().states.len(), 1);
        bridge.handle_message(&envelope("highlight", &json!({"states": [" "]})), 0);
        assert!(bridge.editor().highlights().states.is_empty());
    }

    #[test]
    fn test_commands_wait_for_renderer() {
        let mut bridge = HostBridge::new(not_ready_config());
        assert!(bridge
            .handle_message(&envelope("add_state_center", &json!({})), 0)
            .is_empty());
        assert_eq!(bridge.pending_len(), 1);
        assert_eq!(bridge.next_deadline_ms(), Some(10));

        bridge.set_renderer_ready(true);
        assert!(bridge.tick(9).is_empty());
        let out = bridge.tick(10);
        assert_eq!(bridge.pending_len(), 0);
        assert_eq!(bridge.editor().graph().state_count(), 1);
        assert!(out.iter().any(|e| e.kind == "patch"));
    }

    #[test]
    fn test_queue_dropped_after_max_retries() {
        let mut bridge = HostBridge::new(not_ready_config());
        bridge.handle_message(&envelope("zoom_in", &json!({})), 0);
        bridge.tick(10);
        assert_eq!(bridge.next_deadline_ms(), Some(30));
        bridge.tick(30);
        assert_eq!(bridge.next_deadline_ms(), Some(70));
        bridge.tick(70);
        assert_eq!(bridge.pending_len(), 0);
        assert!(bridge.next_deadline_ms().is_none());

        bridge.set_renderer_ready(true);
        bridge.tick(1000);
        assert!((bridge.editor().graph().viewport.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pending_queue_is_bounded() {
        let mut bridge = HostBridge::new(EditorConfig {
            pending_command_capacity: 2,
            ..not_ready_config()
        });
        for _ in 0..5 {
            bridge.handle_message(&envelope("zoom_in", &json!({})), 0);
        }
        assert_eq!(bridge.pending_len(), 2);
    }
}
