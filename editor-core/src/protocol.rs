//! # Host Protocol
//!
//! Every message crossing the host boundary is a JSON envelope:
//!
//! ```text
//! { "type": "patch", "version": 1, "payload": {...}, "id": "<uuid>", "timestamp": "<RFC 3339>" }
//! ```
//!
//! ## Host -> Editor
//!
//! - `load_automaton` `{type?, states, transitions, alphabet?, viewport?, routingMode?}`
//! - `apply_patch` `{states?, transitions?, viewport?, alphabet?, routingMode?}`
//! - `set_routing` `{mode}`
//! - `highlight` `{states: [...], transitions: [...]}`
//! - `clear_highlight`, `zoom_in`, `zoom_out`, `fit_content`, `reset_view`,
//!   `add_state_center` (no payload)
//!
//! ## Editor -> Host
//!
//! - `editor_ready`, `patch`, `routing_changed`, `label_edited`
//! - `state.add`, `state.move`, `state.label`, `state.remove`, `state.updateFlags`
//! - `transition.add`, `transition.label`, `transition.remove`
//! - `log`

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::batch::MoveUpdate;
use crate::patch::{StateRecord, TransitionRecord};
use crate::{
    EditorResult, ModelType, Patch, ProtocolError, RoutingMode, State, StateId, Transition,
    TransitionId, Viewport,
};

/// Protocol version stamped on every outbound envelope.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest inbound message accepted, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// A versioned message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Protocol version.
    pub version: u32,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Unique message id.
    pub id: String,
    /// Creation time, RFC 3339.
    pub timestamp: String,
}

impl Envelope {
    /// Wrap a payload in a fresh envelope.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            version: PROTOCOL_VERSION,
            payload,
            id: Uuid::new_v4().to_string(),
            timestamp: now_rfc3339(),
        }
    }

    /// Wrap an outbound event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be serialized.
    pub fn from_event(event: &OutboundEvent) -> EditorResult<Self> {
        let mut value = serde_json::to_value(event)?;
        let payload = value
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Ok(Self::new(event.kind(), payload))
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Full automaton carried by `load_automaton`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatonDocument {
    /// Model type; transitions without a `kind` take this variant.
    #[serde(default, rename = "type")]
    pub model_type: ModelType,
    /// States.
    #[serde(default)]
    pub states: Vec<StateRecord>,
    /// Transitions.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
    /// Input alphabet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<BTreeSet<String>>,
    /// Initial viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Initial routing mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_mode: Option<RoutingMode>,
}

/// Payload of `set_routing` and `routing_changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPayload {
    /// Routing mode.
    #[serde(alias = "routingMode")]
    pub mode: RoutingMode,
}

/// Payload of `highlight`.
///
/// Ids may arrive as any JSON value; see [`HighlightPayload::state_ids`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightPayload {
    /// Highlighted state ids.
    #[serde(default)]
    pub states: Vec<Value>,
    /// Highlighted transition ids.
    #[serde(default)]
    pub transitions: Vec<Value>,
}

impl HighlightPayload {
    /// Normalised state ids.
    #[must_use]
    pub fn state_ids(&self) -> BTreeSet<StateId> {
        normalise_ids(&self.states).map(StateId::from).collect()
    }

    /// Normalised transition ids.
    #[must_use]
    pub fn transition_ids(&self) -> BTreeSet<TransitionId> {
        normalise_ids(&self.transitions)
            .map(TransitionId::from)
            .collect()
    }
}

/// Strings are trimmed, numbers and booleans stringified, blanks and
/// other values dropped.
fn normalise_ids(values: &[Value]) -> impl Iterator<Item = String> + '_ {
    values.iter().filter_map(|value| {
        let id = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    })
}

/// A decoded host command.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCommand {
    /// Replace the whole graph.
    LoadAutomaton(AutomatonDocument),
    /// Apply a patch silently.
    ApplyPatch(Patch),
    /// Switch routing mode silently.
    SetRouting(RoutingPayload),
    /// Replace the highlighted sets.
    Highlight(HighlightPayload),
    /// Empty the highlighted sets.
    ClearHighlight,
    /// Zoom in one step about the canvas centre.
    ZoomIn,
    /// Zoom out one step about the canvas centre.
    ZoomOut,
    /// Fit all states into the canvas.
    FitContent,
    /// Zoom 1, pan 0.
    ResetView,
    /// Add a state at the canvas centre.
    AddStateCenter,
}

impl InboundCommand {
    /// Decode a command from its type and payload.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown type or a payload that does not match
    /// the schema of its type.
    pub fn decode(kind: &str, payload: Value) -> Result<Self, ProtocolError> {
        Ok(match kind {
            "load_automaton" => Self::LoadAutomaton(payload_as(kind, payload)?),
            "apply_patch" => Self::ApplyPatch(payload_as(kind, unwrap_patch(payload))?),
            "set_routing" => Self::SetRouting(payload_as(kind, payload)?),
            "highlight" => Self::Highlight(payload_as(kind, payload)?),
            "clear_highlight" => Self::ClearHighlight,
            "zoom_in" => Self::ZoomIn,
            "zoom_out" => Self::ZoomOut,
            "fit_content" => Self::FitContent,
            "reset_view" => Self::ResetView,
            "add_state_center" => Self::AddStateCenter,
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        })
    }

    /// Wire name of the command.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LoadAutomaton(_) => "load_automaton",
            Self::ApplyPatch(_) => "apply_patch",
            Self::SetRouting(_) => "set_routing",
            Self::Highlight(_) => "highlight",
            Self::ClearHighlight => "clear_highlight",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::FitContent => "fit_content",
            Self::ResetView => "reset_view",
            Self::AddStateCenter => "add_state_center",
        }
    }
}

/// `{"patch": {...}}` is accepted as well as a bare patch.
fn unwrap_patch(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.len() == 1 && map.get("patch").is_some_and(Value::is_object) => {
            map.remove("patch").unwrap_or_default()
        }
        other => other,
    }
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    let payload = if payload.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Payload of `editor_ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    /// Protocol version spoken by the editor.
    pub protocol_version: u32,
    /// Crate version.
    pub editor_version: String,
}

impl Default for ReadyPayload {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            editor_version: crate::VERSION.to_string(),
        }
    }
}

/// Kind of entity a label edit applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTarget {
    /// A state.
    State,
    /// A transition.
    Transition,
}

/// Payload of `label_edited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEditedPayload {
    /// Entity kind.
    pub target: LabelTarget,
    /// Entity id.
    pub id: String,
    /// Committed label text.
    pub label: String,
}

/// Payload of `state.move`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    /// Latest position of every state moved during the window.
    pub updates: Vec<MoveUpdate>,
}

/// Payload of `state.label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLabelPayload {
    /// State id.
    pub id: StateId,
    /// New label.
    pub label: String,
}

/// Payload of `state.updateFlags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFlagsPayload {
    /// State id.
    pub id: StateId,
    /// Initial flag.
    pub is_initial: bool,
    /// Accepting flag.
    pub is_accepting: bool,
}

/// Payload of `transition.label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLabelPayload {
    /// Transition id.
    pub id: TransitionId,
    /// Display label.
    pub label: String,
    /// Parsed input symbols.
    pub symbols: Vec<String>,
    /// Lambda marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda_symbol: Option<String>,
}

/// Payload of `state.remove` and `transition.remove`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedPayload {
    /// Removed entity id.
    pub id: String,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Something was ignored.
    Warn,
    /// Something failed.
    Error,
}

/// Payload of `log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

/// Events emitted to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundEvent {
    /// The editor is listening.
    #[serde(rename = "editor_ready")]
    EditorReady(ReadyPayload),
    /// A local edit, undo, redo or view change.
    #[serde(rename = "patch")]
    Patch(Patch),
    /// Routing mode changed locally.
    #[serde(rename = "routing_changed")]
    RoutingChanged(RoutingPayload),
    /// A label edit was committed.
    #[serde(rename = "label_edited")]
    LabelEdited(LabelEditedPayload),
    /// A state was added.
    #[serde(rename = "state.add")]
    StateAdded(State),
    /// States were moved.
    #[serde(rename = "state.move")]
    StatesMoved(MovePayload),
    /// A state label changed.
    #[serde(rename = "state.label")]
    StateLabel(StateLabelPayload),
    /// A state was removed.
    #[serde(rename = "state.remove")]
    StateRemoved(RemovedPayload),
    /// A state's flags changed.
    #[serde(rename = "state.updateFlags")]
    StateFlags(StateFlagsPayload),
    /// A transition was added.
    #[serde(rename = "transition.add")]
    TransitionAdded(Transition),
    /// A transition label changed.
    #[serde(rename = "transition.label")]
    TransitionLabel(TransitionLabelPayload),
    /// A transition was removed.
    #[serde(rename = "transition.remove")]
    TransitionRemoved(RemovedPayload),
    /// A diagnostic.
    #[serde(rename = "log")]
    Log(LogPayload),
}

impl OutboundEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EditorReady(_) => "editor_ready",
            Self::Patch(_) => "patch",
            Self::RoutingChanged(_) => "routing_changed",
            Self::LabelEdited(_) => "label_edited",
            Self::StateAdded(_) => "state.add",
            Self::StatesMoved(_) => "state.move",
            Self::StateLabel(_) => "state.label",
            Self::StateRemoved(_) => "state.remove",
            Self::StateFlags(_) => "state.updateFlags",
            Self::TransitionAdded(_) => "transition.add",
            Self::TransitionLabel(_) => "transition.label",
            Self::TransitionRemoved(_) => "transition.remove",
            Self::Log(_) => "log",
        }
    }

    /// A `log` event.
    #[must_use]
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log(LogPayload {
            level,
            message: message.into(),
        })
    }
}
