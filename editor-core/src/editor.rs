//! # Editor Session
//!
//! Ties the graph, history, interaction controller, label editor and move
//! debounce together.
//!
//! Local edits follow one path: snapshot, mutate, diff, and only when the
//! diff is non-empty push the pre-edit snapshot on the undo stack and emit a
//! `patch`. Host commands mutate silently. Viewport and routing changes are
//! emitted but never recorded in history, and undo/redo keep them as they
//! are.
//!
//! The session performs no I/O: outbound events accumulate in an outbox
//! drained with [`Editor::take_events`], and time is passed in as
//! milliseconds.

use std::collections::BTreeSet;

use crate::apply::apply_patch;
use crate::batch::MoveBatcher;
use crate::interaction::{
    hit_test, states_in_rect, Gesture, Hit, InteractionController, InteractionEffect, KeyInput,
    PointerInput,
};
use crate::label_edit::{relabel_transition, CommittedLabel, EditTarget, LabelEditor};
use crate::patch::{diff, StatesPatch, TransitionsPatch};
use crate::protocol::{
    AutomatonDocument, LabelEditedPayload, LabelTarget, MovePayload, OutboundEvent,
    RemovedPayload, RoutingPayload, StateFlagsPayload, StateLabelPayload,
    TransitionLabelPayload,
};
use crate::{
    EditorConfig, EditorError, EditorResult, Graph, History, Patch, Point, RoutingMode,
    Snapshot, State, StateId, Transition, TransitionId, Viewport, STATE_RADIUS,
};

/// Selected entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected states.
    pub states: BTreeSet<StateId>,
    /// Selected transitions.
    pub transitions: BTreeSet<TransitionId>,
}

impl Selection {
    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.transitions.is_empty()
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.states.clear();
        self.transitions.clear();
    }

    fn retain_existing(&mut self, graph: &Graph) {
        self.states.retain(|id| graph.state(id.as_str()).is_some());
        self.transitions
            .retain(|id| graph.transition(id.as_str()).is_some());
    }
}

/// Host-driven highlights. Never part of snapshots or patches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlights {
    /// Highlighted states.
    pub states: BTreeSet<StateId>,
    /// Highlighted transitions.
    pub transitions: BTreeSet<TransitionId>,
}

/// One editing session over one automaton.
#[derive(Debug, Clone)]
pub struct Editor {
    graph: Graph,
    history: History,
    controller: InteractionController,
    labels: LabelEditor,
    moves: MoveBatcher,
    selection: Selection,
    highlights: Highlights,
    config: EditorConfig,
    outbox: Vec<OutboundEvent>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    /// Create a session over an empty graph.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            graph: Graph::new(),
            history: History::with_depth(config.history_depth),
            controller: InteractionController::new(),
            labels: LabelEditor::new(),
            moves: MoveBatcher::new(config.move_batch_window_ms),
            selection: Selection::default(),
            highlights: Highlights::default(),
            config,
            outbox: Vec::new(),
        }
    }

    /// The live graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Undo/redo stacks.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current highlights.
    #[must_use]
    pub fn highlights(&self) -> &Highlights {
        &self.highlights
    }

    /// Modal label editor.
    #[must_use]
    pub fn label_editor(&self) -> &LabelEditor {
        &self.labels
    }

    /// Gesture controller.
    #[must_use]
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Queue an event for the host.
    pub fn emit(&mut self, event: OutboundEvent) {
        tracing::trace!(kind = event.kind(), "emit");
        self.outbox.push(event);
    }

    fn notify(&mut self, event: OutboundEvent) {
        if self.config.legacy_notifications {
            self.emit(event);
        }
    }

    // === Host commands (silent) ===

    /// Replace the whole graph, resetting history, selection, highlights
    /// and any gesture or label edit.
    pub fn load_automaton(&mut self, document: AutomatonDocument) {
        let mut graph = Graph::new();
        graph.model_type = document.model_type;
        let transitions = document
            .transitions
            .into_iter()
            .map(|mut record| {
                record.kind.get_or_insert(document.model_type);
                record
            })
            .collect();
        let patch = Patch {
            states: Some(StatesPatch {
                upsert: document.states,
                ..Default::default()
            }),
            transitions: Some(TransitionsPatch {
                upsert: transitions,
                ..Default::default()
            }),
            viewport: document.viewport,
            alphabet: document.alphabet,
            routing_mode: document.routing_mode,
        };
        apply_patch(&mut graph, &patch);
        if patch.alphabet.is_none() {
            let symbols = graph
                .transitions()
                .flat_map(|t| t.symbols.iter().cloned())
                .collect();
            graph.set_alphabet(symbols);
        }
        tracing::debug!(
            states = graph.state_count(),
            transitions = graph.transition_count(),
            model = ?graph.model_type,
            "automaton loaded"
        );

        self.graph = graph;
        self.history.clear();
        self.selection.clear();
        self.highlights = Highlights::default();
        self.labels.cancel();
        self.controller.reset();
        self.moves.flush();
        self.controller.request_frame();
    }

    /// Apply a host patch without history or echo.
    pub fn apply_remote_patch(&mut self, patch: &Patch) {
        apply_patch(&mut self.graph, patch);
        self.after_structural_change();
        self.controller.request_frame();
    }

    /// Switch routing mode without an echo event.
    pub fn set_routing_remote(&mut self, mode: RoutingMode) {
        self.graph.routing_mode = mode;
        self.controller.request_frame();
    }

    /// Replace the highlighted sets.
    pub fn highlight(&mut self, states: BTreeSet<StateId>, transitions: BTreeSet<TransitionId>) {
        self.highlights = Highlights {
            states,
            transitions,
        };
        self.controller.request_frame();
    }

    /// Empty the highlighted sets.
    pub fn clear_highlight(&mut self) {
        self.highlights = Highlights::default();
        self.controller.request_frame();
    }

    // === View commands (emitted, not in history) ===

    fn canvas_centre(&self) -> Point {
        Point::new(self.config.canvas_width / 2.0, self.config.canvas_height / 2.0)
    }

    fn set_view(&mut self, viewport: Viewport) {
        if viewport == self.graph.viewport {
            return;
        }
        if let Err(e) = self.graph.set_viewport(viewport) {
            tracing::warn!("Ignoring view change: {e}");
            return;
        }
        self.controller.request_frame();
        self.emit(OutboundEvent::Patch(Patch::viewport_only(viewport)));
    }

    /// Zoom in one step about the canvas centre.
    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.zoom_step);
    }

    /// Zoom out one step about the canvas centre.
    pub fn zoom_out(&mut self) {
        self.zoom_by(self.config.zoom_step.recip());
    }

    fn zoom_by(&mut self, factor: f64) {
        let next = self.graph.viewport.zoomed_about(
            self.canvas_centre(),
            factor,
            self.config.min_zoom,
            self.config.max_zoom,
        );
        self.set_view(next);
    }

    /// Zoom 1, pan 0.
    pub fn reset_view(&mut self) {
        self.set_view(Viewport::default());
    }

    /// Fit every state into the canvas, or reset the view when empty.
    pub fn fit_content(&mut self) {
        let bounds = self.graph.states().map(State::position).fold(
            None,
            |bounds: Option<(Point, Point)>, p| {
                Some(match bounds {
                    None => (p, p),
                    Some((min, max)) => (
                        Point::new(min.x.min(p.x), min.y.min(p.y)),
                        Point::new(max.x.max(p.x), max.y.max(p.y)),
                    ),
                })
            },
        );
        let Some((min, max)) = bounds else {
            self.reset_view();
            return;
        };
        let width = max.x - min.x + STATE_RADIUS * 2.0;
        let height = max.y - min.y + STATE_RADIUS * 2.0;
        let available_w = (self.config.canvas_width - self.config.fit_padding * 2.0).max(1.0);
        let available_h = (self.config.canvas_height - self.config.fit_padding * 2.0).max(1.0);
        let zoom = self
            .config
            .clamp_zoom((available_w / width).min(available_h / height));

        let content_centre = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        let canvas_centre = self.canvas_centre();
        self.set_view(Viewport {
            pan: Point::new(
                canvas_centre.x - content_centre.x * zoom,
                canvas_centre.y - content_centre.y * zoom,
            ),
            zoom,
        });
    }

    // === Local edits ===

    /// Run a graph mutation as one undoable edit.
    ///
    /// Returns the emitted patch, or `None` if the mutation changed nothing.
    fn edit<T>(
        &mut self,
        op: impl FnOnce(&mut Graph) -> EditorResult<T>,
    ) -> EditorResult<(T, Option<Patch>)> {
        let before = self.graph.snapshot();
        let value = op(&mut self.graph)?;
        Ok((value, self.record(before)))
    }

    /// Diff against `before`; on change push history and emit the patch.
    fn record(&mut self, before: Snapshot) -> Option<Patch> {
        let patch = diff(&before, &self.graph.snapshot());
        if patch.is_empty() {
            return None;
        }
        self.history.push_undo(before);
        self.controller.request_frame();
        self.emit(OutboundEvent::Patch(patch.clone()));
        Some(patch)
    }

    /// Add a state at a world point with a fresh id and the next free `qN`
    /// label. The first state of an empty graph becomes initial.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated id collides.
    pub fn add_state(&mut self, position: Point) -> EditorResult<StateId> {
        let mut state = State::new(
            StateId::generate(),
            self.graph.next_state_label(),
            position.x,
            position.y,
        );
        state.is_initial = self.graph.state_count() == 0;
        let notification = state.clone();
        let (id, _) = self.edit(|graph| graph.add_state(state))?;
        self.notify(OutboundEvent::StateAdded(notification));
        Ok(id)
    }

    /// Add a state at the centre of the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated id collides.
    pub fn add_state_center(&mut self) -> EditorResult<StateId> {
        let world = self.graph.viewport.screen_to_world(self.canvas_centre());
        self.add_state(world)
    }

    /// Remove a state and its incident transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn remove_state(&mut self, id: &str) -> EditorResult<()> {
        let ((state, cascaded), _) = self.edit(|graph| graph.remove_state(id))?;
        self.moves.discard(state.id.as_str());
        self.notify(OutboundEvent::StateRemoved(RemovedPayload {
            id: state.id.to_string(),
        }));
        for transition in cascaded {
            self.notify(OutboundEvent::TransitionRemoved(RemovedPayload {
                id: transition.id.to_string(),
            }));
        }
        self.after_structural_change();
        Ok(())
    }

    /// Add a transition of the active model type with no symbols.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint does not exist.
    pub fn add_transition(&mut self, from: &StateId, to: &StateId) -> EditorResult<TransitionId> {
        let transition = Transition::new(TransitionId::generate(), from.clone(), to.clone(), &[])
            .with_variant(self.graph.model_type.new_variant());
        let notification = transition.clone();
        let (id, _) = self.edit(|graph| graph.add_transition(transition))?;
        self.notify(OutboundEvent::TransitionAdded(notification));
        Ok(id)
    }

    /// Remove a transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not found.
    pub fn remove_transition(&mut self, id: &str) -> EditorResult<()> {
        let (transition, _) = self.edit(|graph| graph.remove_transition(id))?;
        self.notify(OutboundEvent::TransitionRemoved(RemovedPayload {
            id: transition.id.to_string(),
        }));
        self.after_structural_change();
        Ok(())
    }

    /// Remove every selected transition and state.
    ///
    /// The whole deletion is a single undo step.
    pub fn delete_selection(&mut self) -> Option<Patch> {
        if self.selection.is_empty() {
            return None;
        }
        let selection = std::mem::take(&mut self.selection);
        let before = self.graph.snapshot();
        let mut removed = Vec::new();
        for id in &selection.transitions {
            if let Ok(t) = self.graph.remove_transition(id.as_str()) {
                removed.push(OutboundEvent::TransitionRemoved(RemovedPayload {
                    id: t.id.to_string(),
                }));
            }
        }
        for id in &selection.states {
            if let Ok((state, cascaded)) = self.graph.remove_state(id.as_str()) {
                removed.push(OutboundEvent::StateRemoved(RemovedPayload {
                    id: state.id.to_string(),
                }));
                removed.extend(cascaded.into_iter().map(|t| {
                    OutboundEvent::TransitionRemoved(RemovedPayload {
                        id: t.id.to_string(),
                    })
                }));
            }
        }
        let patch = self.record(before);
        for event in removed {
            self.notify(event);
        }
        self.after_structural_change();
        patch
    }

    /// Set a state label.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn set_state_label(&mut self, id: &str, label: &str) -> EditorResult<Option<Patch>> {
        let (_, patch) = self.edit(|graph| graph.set_state_label(id, label))?;
        if patch.is_some() {
            self.notify(OutboundEvent::StateLabel(StateLabelPayload {
                id: id.into(),
                label: label.to_string(),
            }));
        }
        Ok(patch)
    }

    /// Relabel a transition from text in its variant's notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not found.
    pub fn set_transition_label(&mut self, id: &str, text: &str) -> EditorResult<Option<Patch>> {
        let current = self
            .graph
            .transition(id)
            .ok_or_else(|| EditorError::TransitionNotFound(id.to_string()))?;
        let updated = relabel_transition(current, text);
        let notification = TransitionLabelPayload {
            id: updated.id.clone(),
            label: updated.label(),
            symbols: updated.symbols.clone(),
            lambda_symbol: updated.lambda_symbol.clone(),
        };
        let (_, patch) = self.edit(|graph| graph.update_transition(updated))?;
        if patch.is_some() {
            self.notify(OutboundEvent::TransitionLabel(notification));
        }
        Ok(patch)
    }

    /// Toggle the initial flag. Turning it on clears every other state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn toggle_initial(&mut self, id: &str) -> EditorResult<()> {
        let previous = self.graph.initial_state().cloned();
        self.edit(|graph| graph.toggle_initial(id))?;
        self.notify_flags(id);
        if let Some(previous) = previous.filter(|p| p.as_str() != id) {
            self.notify_flags(previous.as_str());
        }
        Ok(())
    }

    /// Toggle the accepting flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not found.
    pub fn toggle_accepting(&mut self, id: &str) -> EditorResult<()> {
        self.edit(|graph| graph.toggle_accepting(id))?;
        self.notify_flags(id);
        Ok(())
    }

    fn notify_flags(&mut self, id: &str) {
        if let Some(state) = self.graph.state(id) {
            let event = OutboundEvent::StateFlags(StateFlagsPayload {
                id: state.id.clone(),
                is_initial: state.is_initial,
                is_accepting: state.is_accepting,
            });
            self.notify(event);
        }
    }

    /// Change routing mode locally, emitting `routing_changed`.
    pub fn set_routing(&mut self, mode: RoutingMode) {
        if self.graph.routing_mode == mode {
            return;
        }
        self.graph.routing_mode = mode;
        self.controller.request_frame();
        self.emit(OutboundEvent::RoutingChanged(RoutingPayload { mode }));
    }

    /// Step back one edit. Viewport and routing mode are kept.
    ///
    /// Returns the emitted patch, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Patch> {
        let current = self.graph.snapshot();
        let restored = self.history.undo(current.clone())?;
        Some(self.restore(&current, &restored))
    }

    /// Step forward one edit. Viewport and routing mode are kept.
    ///
    /// Returns the emitted patch, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<Patch> {
        let current = self.graph.snapshot();
        let restored = self.history.redo(current.clone())?;
        Some(self.restore(&current, &restored))
    }

    fn restore(&mut self, current: &Snapshot, restored: &Snapshot) -> Patch {
        self.controller.reset();
        self.graph.restore_content(restored);
        let patch = diff(current, &self.graph.snapshot());
        if !patch.is_empty() {
            self.controller.request_frame();
            self.emit(OutboundEvent::Patch(patch.clone()));
        }
        self.after_structural_change();
        patch
    }

    /// Drop selection, highlight, label-edit and move-batch entries that
    /// name entities no longer in the graph.
    fn after_structural_change(&mut self) {
        self.selection.retain_existing(&self.graph);
        let graph = &self.graph;
        self.highlights
            .states
            .retain(|id| graph.state(id.as_str()).is_some());
        self.highlights
            .transitions
            .retain(|id| graph.transition(id.as_str()).is_some());
        let stale_edit = self.labels.session().and_then(|s| match &s.target {
            EditTarget::State(id) if graph.state(id.as_str()).is_none() => Some(s.target.clone()),
            EditTarget::Transition(id) if graph.transition(id.as_str()).is_none() => {
                Some(s.target.clone())
            }
            _ => None,
        });
        if let Some(target) = stale_edit {
            self.labels.forget(&target);
        }
        self.moves.retain(|id| graph.state(id).is_some());
    }

    // === Label editing ===

    /// Open the label editor on a state or transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the target does not exist.
    pub fn begin_label_edit(&mut self, target: EditTarget) -> EditorResult<()> {
        let current = match &target {
            EditTarget::State(id) => self
                .graph
                .state(id.as_str())
                .map(|s| s.label.clone())
                .ok_or_else(|| EditorError::StateNotFound(id.to_string()))?,
            EditTarget::Transition(id) => self
                .graph
                .transition(id.as_str())
                .map(Transition::label)
                .ok_or_else(|| EditorError::TransitionNotFound(id.to_string()))?,
        };
        self.labels.open(target, current);
        self.controller.request_frame();
        Ok(())
    }

    /// Replace the label draft.
    pub fn set_label_draft(&mut self, text: &str) {
        self.labels.set_draft(text);
    }

    /// Commit the open label edit.
    ///
    /// A blank or unchanged draft closes the editor without an edit.
    /// Returns `true` when a label was applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the edited entity vanished meanwhile.
    pub fn commit_label_edit(&mut self) -> EditorResult<bool> {
        let Some(CommittedLabel { target, text }) = self.labels.commit() else {
            return Ok(false);
        };
        let (patch, payload) = match &target {
            EditTarget::State(id) => (
                self.set_state_label(id.as_str(), &text)?,
                LabelEditedPayload {
                    target: LabelTarget::State,
                    id: id.to_string(),
                    label: text,
                },
            ),
            EditTarget::Transition(id) => (
                self.set_transition_label(id.as_str(), &text)?,
                LabelEditedPayload {
                    target: LabelTarget::Transition,
                    id: id.to_string(),
                    label: text,
                },
            ),
        };
        if patch.is_none() {
            return Ok(false);
        }
        self.emit(OutboundEvent::LabelEdited(payload));
        Ok(true)
    }

    /// Close the open label edit without applying it.
    pub fn cancel_label_edit(&mut self) {
        if self.labels.cancel().is_some() {
            self.controller.request_frame();
        }
    }

    // === Pointer and keyboard input ===

    /// Pointer pressed.
    pub fn pointer_down(&mut self, input: &PointerInput) {
        match self.controller.pointer_down(&self.graph, input) {
            Some(InteractionEffect::StatePicked(id)) => {
                self.selection.clear();
                self.selection.states.insert(id);
                return;
            }
            Some(InteractionEffect::TransitionPicked(id)) => {
                self.selection.clear();
                self.selection.transitions.insert(id);
                return;
            }
            _ => {}
        }
        if let Gesture::DraggingState { id, .. } = self.controller.gesture() {
            if !self.selection.states.contains(id) {
                let id = id.clone();
                self.selection.clear();
                self.selection.states.insert(id);
                self.controller.request_frame();
            }
        }
    }

    /// Pointer moved.
    pub fn pointer_move(&mut self, input: &PointerInput, now_ms: u64) {
        if let Some(InteractionEffect::StateMoved { id, position }) =
            self.controller.pointer_move(&mut self.graph, input)
        {
            if self.config.legacy_notifications {
                self.moves.schedule(&id, position, now_ms);
            }
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self, input: &PointerInput) {
        let Some(effect) = self.controller.pointer_up(&self.graph, input) else {
            return;
        };
        match effect {
            InteractionEffect::ViewportChanged => {
                let viewport = self.graph.viewport;
                self.emit(OutboundEvent::Patch(Patch::viewport_only(viewport)));
            }
            InteractionEffect::MarqueeFinished(rect) => {
                self.selection.clear();
                self.selection.states = states_in_rect(&self.graph, rect).into_iter().collect();
            }
            InteractionEffect::DragFinished { id, before } => {
                // Pan and zoom during the drag are not part of the edit.
                let before = before.with_presentation(self.graph.viewport, self.graph.routing_mode);
                if self.record(before).is_some() {
                    tracing::debug!(state = %id, "drag committed");
                }
            }
            InteractionEffect::Connect { from, to } => match self.add_transition(&from, &to) {
                Ok(id) => {
                    self.selection.clear();
                    self.selection.transitions.insert(id.clone());
                    // Freshly drawn transitions start with an empty label.
                    self.labels.open(EditTarget::Transition(id), "");
                }
                Err(e) => tracing::warn!("Could not connect {from} -> {to}: {e}"),
            },
            InteractionEffect::StateMoved { .. }
            | InteractionEffect::DragCancelled { .. }
            | InteractionEffect::StatePicked(_)
            | InteractionEffect::TransitionPicked(_) => {}
        }
    }

    /// Wheel scrolled over the canvas.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) {
        let changed = self.controller.wheel(
            &mut self.graph,
            screen,
            delta_y,
            self.config.zoom_step,
            self.config.min_zoom,
            self.config.max_zoom,
        );
        if changed {
            let viewport = self.graph.viewport;
            self.emit(OutboundEvent::Patch(Patch::viewport_only(viewport)));
        }
    }

    /// Double click: edit a label, or add a state on empty canvas.
    pub fn double_click(&mut self, input: &PointerInput) {
        let result = match hit_test(&self.graph, input.screen()) {
            Hit::State(id) => self.begin_label_edit(EditTarget::State(id)),
            Hit::Transition(id) => self.begin_label_edit(EditTarget::Transition(id)),
            Hit::Canvas(world) => self.add_state(world).map(|_| ()),
        };
        if let Err(e) = result {
            tracing::warn!("Double click ignored: {e}");
        }
    }

    /// Escape: close the label editor, else abort the gesture.
    pub fn cancel(&mut self, now_ms: u64) {
        if self.labels.is_open() {
            self.cancel_label_edit();
            return;
        }
        if let Some(InteractionEffect::DragCancelled { id }) = self.controller.cancel(&mut self.graph)
        {
            // Tell the host where the state really is.
            if let Some(position) = self.graph.state(id.as_str()).map(State::position) {
                if self.config.legacy_notifications {
                    self.moves.schedule(&id, position, now_ms);
                }
            }
        }
    }

    /// Key pressed. Returns `true` if the key was handled.
    pub fn key_down(&mut self, input: &KeyInput, now_ms: u64) -> bool {
        let key = input.key.as_str();
        let command = input.modifiers.command();
        if key == "Escape" {
            self.cancel(now_ms);
            return true;
        }
        if self.labels.is_open() {
            // Keys belong to the text field.
            return false;
        }
        if !self.controller.is_idle() {
            tracing::debug!(key, "shortcut ignored during a gesture");
            return false;
        }
        match key {
            "Delete" | "Backspace" => self.delete_selection().is_some(),
            "z" | "Z" if command && input.modifiers.shift => self.redo().is_some(),
            "z" | "Z" if command => self.undo().is_some(),
            "y" | "Y" if command => self.redo().is_some(),
            "i" | "I" if !command => self.toggle_selected(Graph::toggle_initial),
            "a" | "A" if !command => self.toggle_selected(Graph::toggle_accepting),
            _ => false,
        }
    }

    /// Toggle a flag on every selected state as one undo step.
    fn toggle_selected(&mut self, toggle: fn(&mut Graph, &str) -> EditorResult<bool>) -> bool {
        let ids: Vec<StateId> = self.selection.states.iter().cloned().collect();
        if ids.is_empty() {
            return false;
        }
        let before = self.graph.snapshot();
        for id in &ids {
            if let Err(e) = toggle(&mut self.graph, id.as_str()) {
                tracing::debug!("toggle skipped: {e}");
            }
        }
        let touched: Vec<StateId> = before
            .states()
            .iter()
            .filter(|old| {
                self.graph.state(old.id.as_str()).is_some_and(|now| {
                    now.is_initial != old.is_initial || now.is_accepting != old.is_accepting
                })
            })
            .map(|s| s.id.clone())
            .collect();
        let changed = self.record(before).is_some();
        for id in touched {
            self.notify_flags(id.as_str());
        }
        changed
    }

    /// Advance timers: flush `state.move` notifications that are due.
    pub fn tick(&mut self, now_ms: u64) {
        let updates = self.moves.flush_due(now_ms);
        if !updates.is_empty() {
            self.emit(OutboundEvent::StatesMoved(MovePayload { updates }));
        }
    }

    /// Earliest time [`Editor::tick`] has work to do.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.moves.deadline_ms()
    }

    /// Whether the renderer should draw a frame.
    #[must_use]
    pub fn frame_requested(&self) -> bool {
        self.controller.frame_pending()
    }

    /// Acknowledge a rendered frame.
    pub fn frame_rendered(&mut self) {
        self.controller.frame_rendered();
    }
}
