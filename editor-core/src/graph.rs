//! Graph model holding the canonical automaton and viewport.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    EditorError, EditorResult, ModelType, Point, RoutingMode, Snapshot, State, StateId,
    Transition, TransitionId, Viewport,
};

/// The live automaton graph.
///
/// Every local editing operation leaves the graph consistent: transition
/// endpoints name existing states and at most one state is initial. Patches
/// from the host are applied structurally (see [`crate::apply`]), so a
/// transition may transiently reference a missing state; such transitions
/// are skipped by [`Graph::resolved_transitions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    states: BTreeMap<StateId, State>,
    transitions: BTreeMap<TransitionId, Transition>,
    alphabet: BTreeSet<String>,
    /// Current pan/zoom.
    pub viewport: Viewport,
    /// Edge routing strategy.
    pub routing_mode: RoutingMode,
    /// Kind of automaton being edited.
    pub model_type: ModelType,
}

impl Graph {
    /// Create an empty FSA graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state.
    ///
    /// If the new state is initial, every other state loses the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if a state with the same id exists.
    pub fn add_state(&mut self, state: State) -> EditorResult<StateId> {
        if self.states.contains_key(&state.id) {
            return Err(EditorError::DuplicateId(state.id.to_string()));
        }
        let id = state.id.clone();
        let initial = state.is_initial;
        self.states.insert(id.clone(), state);
        if initial {
            self.clear_initial_except(id.as_str());
        }
        Ok(id)
    }

    /// Remove a state and every transition incident to it.
    ///
    /// Returns the removed state and the cascaded transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn remove_state(&mut self, id: &str) -> EditorResult<(State, Vec<Transition>)> {
        let state = self
            .states
            .remove(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?;
        Ok((state, self.remove_incident_transitions(id)))
    }

    /// Drop every transition whose source or target is `state`.
    fn remove_incident_transitions(&mut self, state: &str) -> Vec<Transition> {
        let incident: Vec<TransitionId> = self
            .transitions
            .values()
            .filter(|t| t.is_incident_to(state))
            .map(|t| t.id.clone())
            .collect();
        incident
            .iter()
            .filter_map(|id| self.transitions.remove(id))
            .collect()
    }

    /// Add a transition between existing states. Its input symbols extend
    /// the alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken or an endpoint does not exist.
    pub fn add_transition(&mut self, transition: Transition) -> EditorResult<TransitionId> {
        if self.transitions.contains_key(&transition.id) {
            return Err(EditorError::DuplicateId(transition.id.to_string()));
        }
        for endpoint in [&transition.from, &transition.to] {
            if !self.states.contains_key(endpoint) {
                return Err(EditorError::DanglingEndpoint {
                    transition: transition.id.to_string(),
                    state: endpoint.to_string(),
                });
            }
        }
        let id = transition.id.clone();
        self.alphabet.extend(transition.symbols.iter().cloned());
        self.transitions.insert(id.clone(), transition);
        Ok(id)
    }

    /// Remove a transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not found.
    pub fn remove_transition(&mut self, id: &str) -> EditorResult<Transition> {
        self.transitions
            .remove(id)
            .ok_or_else(|| EditorError::TransitionNotFound(id.to_string()))
    }

    /// Get a state by id.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    /// Get a mutable state by id.
    pub(crate) fn state_mut(&mut self, id: &str) -> Option<&mut State> {
        self.states.get_mut(id)
    }

    /// Get a transition by id.
    #[must_use]
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// Get a mutable transition by id.
    pub(crate) fn transition_mut(&mut self, id: &str) -> Option<&mut Transition> {
        self.transitions.get_mut(id)
    }

    /// Insert or replace a state without any consistency checks.
    pub(crate) fn put_state(&mut self, state: State) {
        self.states.insert(state.id.clone(), state);
    }

    /// Insert or replace a transition without endpoint checks.
    pub(crate) fn put_transition(&mut self, transition: Transition) {
        self.transitions.insert(transition.id.clone(), transition);
    }

    /// All states, ordered by id.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// All transitions, ordered by id.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Transitions whose endpoints both exist.
    pub fn resolved_transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions
            .values()
            .filter(|t| self.states.contains_key(&t.from) && self.states.contains_key(&t.to))
    }

    /// Number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of transitions.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Check if the graph has no states and no transitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.transitions.is_empty()
    }

    /// The input alphabet.
    #[must_use]
    pub fn alphabet(&self) -> &BTreeSet<String> {
        &self.alphabet
    }

    /// Replace the input alphabet.
    pub fn set_alphabet(&mut self, alphabet: BTreeSet<String>) {
        self.alphabet = alphabet;
    }

    /// Id of the initial state, if any.
    #[must_use]
    pub fn initial_state(&self) -> Option<&StateId> {
        self.states.values().find(|s| s.is_initial).map(|s| &s.id)
    }

    /// Set a state's label.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn set_state_label(&mut self, id: &str, label: impl Into<String>) -> EditorResult<()> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?;
        state.label = label.into();
        Ok(())
    }

    /// Move a state's centre.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn move_state(&mut self, id: &str, position: Point) -> EditorResult<()> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?;
        state.x = position.x;
        state.y = position.y;
        Ok(())
    }

    /// Set or clear the initial flag. Setting it clears every other state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn set_initial(&mut self, id: &str, initial: bool) -> EditorResult<()> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?;
        state.is_initial = initial;
        if initial {
            self.clear_initial_except(id);
        }
        Ok(())
    }

    /// Toggle the initial flag, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn toggle_initial(&mut self, id: &str) -> EditorResult<bool> {
        let next = !self
            .state(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?
            .is_initial;
        self.set_initial(id, next)?;
        Ok(next)
    }

    /// Toggle the accepting flag, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn toggle_accepting(&mut self, id: &str) -> EditorResult<bool> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?;
        state.is_accepting = !state.is_accepting;
        Ok(state.is_accepting)
    }

    /// Replace a transition's symbols, extending the alphabet with new ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not found.
    pub fn set_transition_symbols(
        &mut self,
        id: &str,
        symbols: Vec<String>,
        lambda_symbol: Option<String>,
    ) -> EditorResult<()> {
        let transition = self
            .transitions
            .get_mut(id)
            .ok_or_else(|| EditorError::TransitionNotFound(id.to_string()))?;
        self.alphabet.extend(symbols.iter().cloned());
        transition.symbols = symbols;
        transition.lambda_symbol = lambda_symbol;
        Ok(())
    }

    /// Replace a transition's symbols and variant data in place.
    ///
    /// Endpoints are kept from the stored transition. Input symbols extend
    /// the alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not found.
    pub fn update_transition(&mut self, updated: Transition) -> EditorResult<()> {
        let transition = self
            .transitions
            .get_mut(&updated.id)
            .ok_or_else(|| EditorError::TransitionNotFound(updated.id.to_string()))?;
        self.alphabet.extend(updated.symbols.iter().cloned());
        transition.symbols = updated.symbols;
        transition.lambda_symbol = updated.lambda_symbol;
        transition.variant = updated.variant;
        Ok(())
    }

    /// Set the viewport. Non-positive or non-finite zoom is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the zoom is not a positive finite number.
    pub fn set_viewport(&mut self, viewport: Viewport) -> EditorResult<()> {
        if !(viewport.zoom.is_finite() && viewport.zoom > 0.0) {
            return Err(EditorError::InvalidOperation(format!(
                "zoom must be positive, got {}",
                viewport.zoom
            )));
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Find the topmost state under a world point.
    ///
    /// Later ids win ties, matching paint order.
    #[must_use]
    pub fn state_at(&self, point: Point) -> Option<&StateId> {
        self.states
            .values()
            .rev()
            .find(|s| s.contains_point(point))
            .map(|s| &s.id)
    }

    /// Smallest `qN` label not used by any state.
    #[must_use]
    pub fn next_state_label(&self) -> String {
        let used: BTreeSet<&str> = self.states.values().map(|s| s.label.as_str()).collect();
        (0..)
            .map(|n: usize| format!("q{n}"))
            .find(|label| !used.contains(label.as_str()))
            .unwrap_or_default()
    }

    /// Take an immutable deep copy of the graph content and viewport.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.states.values().cloned().collect(),
            self.transitions.values().cloned().collect(),
            self.alphabet.clone(),
            self.viewport,
            self.routing_mode,
        )
    }

    /// Replace the whole graph with the content of a snapshot.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.restore_content(snapshot);
        self.viewport = snapshot.viewport();
        self.routing_mode = snapshot.routing_mode();
    }

    /// Replace states, transitions and alphabet, keeping the viewport and
    /// routing mode.
    pub fn restore_content(&mut self, snapshot: &Snapshot) {
        self.states = snapshot
            .states()
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();
        self.transitions = snapshot
            .transitions()
            .iter()
            .map(|t| (t.id.clone(), t.clone()))
            .collect();
        self.alphabet = snapshot.alphabet().clone();
    }

    fn clear_initial_except(&mut self, keep: &str) {
        for state in self.states.values_mut() {
            if state.id.as_str() != keep {
                state.is_initial = false;
            }
        }
    }
}
