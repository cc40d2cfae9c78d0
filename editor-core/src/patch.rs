//! Patches: minimal descriptions of the difference between two snapshots.
//!
//! ## Wire shape
//!
//! ```text
//! {
//!   "states":      { "upsert": [...], "delete": ["q3"], "meta": { "initialId": "q0" } },
//!   "transitions": { "upsert": [...], "delete": [] },
//!   "viewport":    { "pan": { "x": 0, "y": 0 }, "zoom": 1 },
//!   "alphabet":    ["a", "b"],
//!   "routingMode": "curved"
//! }
//! ```
//!
//! Every section is optional and absent when unchanged. Upserts carry the
//! whole entity, never a field delta.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    Direction, ModelType, RoutingMode, Snapshot, State, StateId, Transition, TransitionId,
    TransitionVariant, Viewport,
};

/// Insert-or-update record for a state.
///
/// Outbound records always carry every field; inbound records may omit
/// fields, which are then left untouched (or defaulted for new states).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// State id.
    pub id: StateId,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Centre X.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Centre Y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Initial flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_initial: Option<bool>,
    /// Accepting flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_accepting: Option<bool>,
}

impl From<&State> for StateRecord {
    fn from(state: &State) -> Self {
        Self {
            id: state.id.clone(),
            label: Some(state.label.clone()),
            x: Some(state.x),
            y: Some(state.y),
            is_initial: Some(state.is_initial),
            is_accepting: Some(state.is_accepting),
        }
    }
}

/// Insert-or-update record for a transition.
///
/// `kind` selects the variant; the variant fields that apply to it are
/// carried flat next to the common fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    /// Transition id.
    pub id: TransitionId,
    /// Source state.
    #[serde(default, alias = "fromStateId", skip_serializing_if = "Option::is_none")]
    pub from: Option<StateId>,
    /// Target state.
    #[serde(default, alias = "toStateId", skip_serializing_if = "Option::is_none")]
    pub to: Option<StateId>,
    /// Ordered input symbols.
    #[serde(default, alias = "labels", skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    /// Lambda marker; `null` clears it.
    #[serde(
        default,
        deserialize_with = "present_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub lambda_symbol: Option<Option<String>>,
    /// Variant selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModelType>,
    /// PDA/TM read symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_symbol: Option<String>,
    /// PDA pop symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop_symbol: Option<String>,
    /// PDA push symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_symbol: Option<String>,
    /// PDA lambda input flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_lambda_input: Option<bool>,
    /// PDA lambda pop flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_lambda_pop: Option<bool>,
    /// PDA lambda push flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_lambda_push: Option<bool>,
    /// TM write symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_symbol: Option<String>,
    /// TM head movement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// TM tape index; `null` clears it.
    #[serde(
        default,
        deserialize_with = "present_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub tape_number: Option<Option<u32>>,
}

impl From<&Transition> for TransitionRecord {
    fn from(transition: &Transition) -> Self {
        let mut record = Self {
            id: transition.id.clone(),
            from: Some(transition.from.clone()),
            to: Some(transition.to.clone()),
            symbols: Some(transition.symbols.clone()),
            lambda_symbol: Some(transition.lambda_symbol.clone()),
            kind: Some(transition.variant.model_type()),
            ..Self::default()
        };
        match &transition.variant {
            TransitionVariant::Fsa => {}
            TransitionVariant::Pda(attrs) => {
                record.read_symbol = Some(attrs.read_symbol.clone());
                record.pop_symbol = Some(attrs.pop_symbol.clone());
                record.push_symbol = Some(attrs.push_symbol.clone());
                record.is_lambda_input = Some(attrs.is_lambda_input);
                record.is_lambda_pop = Some(attrs.is_lambda_pop);
                record.is_lambda_push = Some(attrs.is_lambda_push);
            }
            TransitionVariant::Tm(attrs) => {
                record.read_symbol = Some(attrs.read_symbol.clone());
                record.write_symbol = Some(attrs.write_symbol.clone());
                record.direction = Some(attrs.direction);
                record.tape_number = Some(attrs.tape_number);
            }
        }
        record
    }
}

/// Distinguish an absent key (`None`) from an explicit `null` (`Some(None)`).
fn present_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// State-level metadata carried with state changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatesMeta {
    /// The state that is initial after the patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_id: Option<StateId>,
}

/// State changes of a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatesPatch {
    /// Inserted or changed states.
    #[serde(default)]
    pub upsert: Vec<StateRecord>,
    /// Removed state ids.
    #[serde(default)]
    pub delete: Vec<StateId>,
    /// Initial-state tracking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<StatesMeta>,
}

/// Transition changes of a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionsPatch {
    /// Inserted or changed transitions.
    #[serde(default)]
    pub upsert: Vec<TransitionRecord>,
    /// Removed transition ids.
    #[serde(default)]
    pub delete: Vec<TransitionId>,
}

/// Minimal description of how to turn one snapshot into another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    /// State changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<StatesPatch>,
    /// Transition changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<TransitionsPatch>,
    /// New viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// New alphabet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<BTreeSet<String>>,
    /// New routing mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_mode: Option<RoutingMode>,
}

impl Patch {
    /// A patch carrying only a viewport.
    #[must_use]
    pub fn viewport_only(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
            ..Self::default()
        }
    }

    /// Whether every section is absent.
    ///
    /// Empty patches are never emitted nor pushed onto history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_none()
            && self.transitions.is_none()
            && self.viewport.is_none()
            && self.alphabet.is_none()
            && self.routing_mode.is_none()
    }

    /// Whether the patch touches graph content rather than presentation.
    #[must_use]
    pub fn changes_content(&self) -> bool {
        self.states.is_some() || self.transitions.is_some() || self.alphabet.is_some()
    }
}

/// Compute the patch that transforms `previous` into `next`.
#[must_use]
pub fn diff(previous: &Snapshot, next: &Snapshot) -> Patch {
    Patch {
        states: diff_states(previous, next),
        transitions: diff_transitions(previous, next),
        viewport: (previous.viewport() != next.viewport()).then(|| next.viewport()),
        alphabet: (previous.alphabet() != next.alphabet()).then(|| next.alphabet().clone()),
        routing_mode: (previous.routing_mode() != next.routing_mode())
            .then(|| next.routing_mode()),
    }
}

fn diff_states(previous: &Snapshot, next: &Snapshot) -> Option<StatesPatch> {
    let before: HashMap<&str, &State> = previous
        .states()
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();
    let after: HashMap<&str, &State> =
        next.states().iter().map(|s| (s.id.as_str(), s)).collect();

    let upsert: Vec<StateRecord> = next
        .states()
        .iter()
        .filter(|s| before.get(s.id.as_str()).map_or(true, |old| *old != *s))
        .map(StateRecord::from)
        .collect();
    let delete: Vec<StateId> = previous
        .states()
        .iter()
        .filter(|s| !after.contains_key(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect();

    if upsert.is_empty() && delete.is_empty() {
        return None;
    }

    let meta = next
        .states()
        .iter()
        .find(|s| s.is_initial)
        .map(|s| StatesMeta {
            initial_id: Some(s.id.clone()),
        });

    Some(StatesPatch {
        upsert,
        delete,
        meta,
    })
}

fn diff_transitions(previous: &Snapshot, next: &Snapshot) -> Option<TransitionsPatch> {
    let before: HashMap<&str, &Transition> = previous
        .transitions()
        .iter()
        .map(|t| (t.id.as_str(), t))
        .collect();
    let after: HashMap<&str, &Transition> = next
        .transitions()
        .iter()
        .map(|t| (t.id.as_str(), t))
        .collect();

    let upsert: Vec<TransitionRecord> = next
        .transitions()
        .iter()
        .filter(|t| before.get(t.id.as_str()).map_or(true, |old| *old != *t))
        .map(TransitionRecord::from)
        .collect();
    let delete: Vec<TransitionId> = previous
        .transitions()
        .iter()
        .filter(|t| !after.contains_key(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect();

    if upsert.is_empty() && delete.is_empty() {
        None
    } else {
        Some(TransitionsPatch { upsert, delete })
    }
}
