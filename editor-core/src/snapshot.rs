//! Immutable point-in-time copies of the graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{RoutingMode, State, Transition, Viewport};

/// A deep, immutable copy of the graph content and viewport.
///
/// Snapshots are the unit exchanged with the history stacks and the differ.
/// States and transitions are ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    states: Vec<State>,
    transitions: Vec<Transition>,
    alphabet: BTreeSet<String>,
    viewport: Viewport,
    routing_mode: RoutingMode,
}

impl Snapshot {
    /// Build a snapshot from its parts.
    #[must_use]
    pub fn new(
        mut states: Vec<State>,
        mut transitions: Vec<Transition>,
        alphabet: BTreeSet<String>,
        viewport: Viewport,
        routing_mode: RoutingMode,
    ) -> Self {
        states.sort_by(|a, b| a.id.cmp(&b.id));
        transitions.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            states,
            transitions,
            alphabet,
            viewport,
            routing_mode,
        }
    }

    /// States in id order.
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Transitions in id order.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Input alphabet.
    #[must_use]
    pub fn alphabet(&self) -> &BTreeSet<String> {
        &self.alphabet
    }

    /// Viewport at the time of the snapshot.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Routing mode at the time of the snapshot.
    #[must_use]
    pub const fn routing_mode(&self) -> RoutingMode {
        self.routing_mode
    }

    /// Copy of this snapshot with a different viewport and routing mode.
    #[must_use]
    pub fn with_presentation(&self, viewport: Viewport, routing_mode: RoutingMode) -> Self {
        Self {
            viewport,
            routing_mode,
            ..self.clone()
        }
    }
}
