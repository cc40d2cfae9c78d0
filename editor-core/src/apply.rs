//! Applying patches to the live graph.
//!
//! Application is a pure model mutation: it never records history and never
//! produces outbound events, so patches replayed from the host or from the
//! history stacks do not echo back.

use crate::patch::{StateRecord, StatesPatch, TransitionRecord, TransitionsPatch};
use crate::{
    Graph, ModelType, Patch, PdaAttributes, State, TmAttributes, Transition,
    TransitionVariant,
};

/// Apply a patch to the graph.
///
/// Sections are applied in a fixed order: state upserts, state deletions
/// (cascading to incident transitions), initial-state metadata, transition
/// upserts, transition deletions, then alphabet, viewport and routing mode.
/// Deleting an unknown id is a no-op, and a state listed for deletion is
/// not upserted, so applying the same patch twice leaves the graph as
/// applying it once.
pub fn apply_patch(graph: &mut Graph, patch: &Patch) {
    if let Some(states) = &patch.states {
        apply_states(graph, states);
    }
    if let Some(transitions) = &patch.transitions {
        apply_transitions(graph, transitions);
    }
    if let Some(alphabet) = &patch.alphabet {
        graph.set_alphabet(alphabet.clone());
    }
    if let Some(viewport) = patch.viewport {
        if let Err(e) = graph.set_viewport(viewport) {
            tracing::warn!("Ignoring viewport in patch: {e}");
        }
    }
    if let Some(mode) = patch.routing_mode {
        graph.routing_mode = mode;
    }
}

fn apply_states(graph: &mut Graph, states: &StatesPatch) {
    for record in &states.upsert {
        // A state the same patch deletes is never recreated.
        if states.delete.contains(&record.id) {
            tracing::debug!(state = %record.id, "upsert of a deleted state skipped");
            continue;
        }
        upsert_state(graph, record);
    }
    for id in &states.delete {
        if graph.remove_state(id.as_str()).is_err() {
            tracing::debug!(state = %id, "delete names an unknown state");
        }
    }
    if let Some(initial) = states.meta.as_ref().and_then(|m| m.initial_id.as_ref()) {
        if graph.set_initial(initial.as_str(), true).is_err() {
            tracing::debug!(state = %initial, "initialId names an unknown state");
        }
    }
}

fn upsert_state(graph: &mut Graph, record: &StateRecord) {
    if let Some(state) = graph.state_mut(record.id.as_str()) {
        merge_state(state, record);
    } else {
        let mut state = State::new(record.id.clone(), record.id.to_string(), 0.0, 0.0);
        merge_state(&mut state, record);
        graph.put_state(state);
    }
    if record.is_initial == Some(true) {
        // At most one initial state, whatever the patch claims.
        let _ = graph.set_initial(record.id.as_str(), true);
    }
}

fn merge_state(state: &mut State, record: &StateRecord) {
    if let Some(label) = &record.label {
        state.label.clone_from(label);
    }
    if let Some(x) = record.x {
        state.x = x;
    }
    if let Some(y) = record.y {
        state.y = y;
    }
    if let Some(initial) = record.is_initial {
        state.is_initial = initial;
    }
    if let Some(accepting) = record.is_accepting {
        state.is_accepting = accepting;
    }
}

fn apply_transitions(graph: &mut Graph, transitions: &TransitionsPatch) {
    for record in &transitions.upsert {
        if let Some(transition) = graph.transition_mut(record.id.as_str()) {
            merge_transition(transition, record);
            continue;
        }
        let mut transition = Transition::new(record.id.clone(), "", "", &[]);
        merge_transition(&mut transition, record);
        if transition.from.is_empty() || transition.to.is_empty() {
            tracing::debug!(transition = %transition.id, "transition upsert without endpoints");
        }
        graph.put_transition(transition);
    }
    for id in &transitions.delete {
        // Missing ids are fine: the transition may have cascaded with a state.
        let _ = graph.remove_transition(id.as_str());
    }
}

fn merge_transition(transition: &mut Transition, record: &TransitionRecord) {
    if let Some(from) = &record.from {
        transition.from.clone_from(from);
    }
    if let Some(to) = &record.to {
        transition.to.clone_from(to);
    }
    if let Some(symbols) = &record.symbols {
        transition.symbols.clone_from(symbols);
    }
    if let Some(lambda) = &record.lambda_symbol {
        transition.lambda_symbol.clone_from(lambda);
    }

    let kind = record
        .kind
        .unwrap_or_else(|| transition.variant.model_type());
    if kind != transition.variant.model_type() {
        transition.variant = match kind {
            ModelType::Fsa => TransitionVariant::Fsa,
            ModelType::Pda => TransitionVariant::Pda(PdaAttributes::default()),
            ModelType::Tm => TransitionVariant::Tm(TmAttributes::default()),
        };
    }

    match &mut transition.variant {
        TransitionVariant::Fsa => {}
        TransitionVariant::Pda(attrs) => merge_pda(attrs, record),
        TransitionVariant::Tm(attrs) => merge_tm(attrs, record),
    }
}

fn merge_pda(attrs: &mut PdaAttributes, record: &TransitionRecord) {
    if let Some(read) = &record.read_symbol {
        attrs.read_symbol.clone_from(read);
    }
    if let Some(pop) = &record.pop_symbol {
        attrs.pop_symbol.clone_from(pop);
    }
    if let Some(push) = &record.push_symbol {
        attrs.push_symbol.clone_from(push);
    }
    if let Some(flag) = record.is_lambda_input {
        attrs.is_lambda_input = flag;
    }
    if let Some(flag) = record.is_lambda_pop {
        attrs.is_lambda_pop = flag;
    }
    if let Some(flag) = record.is_lambda_push {
        attrs.is_lambda_push = flag;
    }
}

fn merge_tm(attrs: &mut TmAttributes, record: &TransitionRecord) {
    if let Some(read) = &record.read_symbol {
        attrs.read_symbol.clone_from(read);
    }
    if let Some(write) = &record.write_symbol {
        attrs.write_symbol.clone_from(write);
    }
    if let Some(direction) = record.direction {
        attrs.direction = direction;
    }
    if let Some(tape) = record.tape_number {
        attrs.tape_number = tape;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{diff, StatesMeta};
    use crate::{Point, StateId, TransitionId, Viewport};

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_state(State::new("q0", "start", 10.0, 20.0).initial())
            .expect("add q0");
        graph
            .add_state(State::new("q1", "q1", 100.0, 0.0))
            .expect("add q1");
        graph
            .add_transition(Transition::new("t1", "q0", "q1", &["a"]))
            .expect("add t1");
        graph
    }

    fn states_patch(upsert: Vec<StateRecord>, delete: Vec<StateId>) -> Patch {
        Patch {
            states: Some(StatesPatch {
                upsert,
                delete,
                meta: None,
            }),
            ..Patch::default()
        }
    }

    #[test]
    fn test_partial_upsert_only_overwrites_present_keys() {
        let mut graph = graph();
        let patch = states_patch(
            vec![StateRecord {
                id: "q0".into(),
                x: Some(99.0),
                ..StateRecord::default()
            }],
            vec![],
        );
        apply_patch(&mut graph, &patch);
        let state = graph.state("q0").expect("q0");
        assert_eq!(state.label, "start");
        assert!((state.x - 99.0).abs() < f64::EPSILON);
        assert!((state.y - 20.0).abs() < f64::EPSILON);
        assert!(state.is_initial);
    }

    #[test]
    fn test_new_state_gets_defaults() {
        let mut graph = graph();
        let patch = states_patch(
            vec![StateRecord {
                id: "q9".into(),
                ..StateRecord::default()
            }],
            vec![],
        );
        apply_patch(&mut graph, &patch);
        let state = graph.state("q9").expect("q9");
        assert_eq!(state.label, "q9");
        assert!(state.x.abs() < f64::EPSILON);
        assert!(!state.is_initial);
        assert!(!state.is_accepting);
    }

    #[test]
    fn test_state_delete_cascades() {
        let mut graph = graph();
        apply_patch(&mut graph, &states_patch(vec![], vec!["q1".into()]));
        assert!(graph.state("q1").is_none());
        assert_eq!(graph.transition_count(), 0);
    }

    #[test]
    fn test_meta_initial_id_is_exclusive() {
        let mut graph = graph();
        let patch = Patch {
            states: Some(StatesPatch {
                upsert: vec![],
                delete: vec![],
                meta: Some(StatesMeta {
                    initial_id: Some("q1".into()),
                }),
            }),
            ..Patch::default()
        };
        apply_patch(&mut graph, &patch);
        let initial: Vec<_> = graph.states().filter(|s| s.is_initial).collect();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].id.as_str(), "q1");
    }

    #[test]
    fn test_dangling_transition_is_accepted_structurally() {
        let mut graph = graph();
        let patch = Patch {
            transitions: Some(TransitionsPatch {
                upsert: vec![TransitionRecord {
                    id: "t2".into(),
                    from: Some("q0".into()),
                    to: Some("ghost".into()),
                    ..TransitionRecord::default()
                }],
                delete: vec![],
            }),
            ..Patch::default()
        };
        apply_patch(&mut graph, &patch);
        assert!(graph.transition("t2").is_some());
        assert_eq!(graph.resolved_transitions().count(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut graph = graph();
        let before = graph.snapshot();
        let mut target = graph.clone();
        target.remove_state("q1").expect("remove");
        target
            .add_state(State::new("q2", "q2", 1.0, 2.0).accepting())
            .expect("add");
        target
            .add_transition(Transition::new("t2", "q2", "q0", &["b", "c"]))
            .expect("add");
        let patch = diff(&before, &target.snapshot());

        apply_patch(&mut graph, &patch);
        let once = graph.snapshot();
        apply_patch(&mut graph, &patch);
        assert_eq!(graph.snapshot(), once);
        assert_eq!(once, target.snapshot());
    }

    #[test]
    fn test_delete_of_unknown_state_keeps_repointed_transition() {
        let mut graph = graph();
        let patch: Patch = serde_json::from_str(
            r#"{
                "states": {"delete": ["q2"]},
                "transitions": {"upsert": [{"id": "t1", "from": "q2"}]}
            }"#,
        )
        .expect("patch json");

        apply_patch(&mut graph, &patch);
        let once = graph.snapshot();
        apply_patch(&mut graph, &patch);
        assert_eq!(graph.snapshot(), once);

        let t1 = graph.transition("t1").expect("t1 kept");
        assert_eq!(t1.from.as_str(), "q2");
        assert_eq!(t1.to.as_str(), "q1");
        assert_eq!(t1.symbols, vec!["a".to_string()]);
    }

    #[test]
    fn test_state_both_upserted_and_deleted_stays_deleted() {
        let mut graph = graph();
        let patch: Patch = serde_json::from_str(
            r#"{
                "states": {"upsert": [{"id": "q5", "x": 3}], "delete": ["q5"]},
                "transitions": {"upsert": [{"id": "t1", "from": "q5"}]}
            }"#,
        )
        .expect("patch json");

        apply_patch(&mut graph, &patch);
        let once = graph.snapshot();
        apply_patch(&mut graph, &patch);
        assert_eq!(graph.snapshot(), once);
        assert!(graph.state("q5").is_none());
        assert_eq!(graph.transition("t1").map(|t| t.to.as_str()), Some("q1"));
    }

    #[test]
    fn test_kind_switch_replaces_variant() {
        let mut graph = graph();
        let patch = Patch {
            transitions: Some(TransitionsPatch {
                upsert: vec![TransitionRecord {
                    id: TransitionId::from("t1"),
                    kind: Some(ModelType::Tm),
                    write_symbol: Some("x".into()),
                    ..TransitionRecord::default()
                }],
                delete: vec![],
            }),
            ..Patch::default()
        };
        apply_patch(&mut graph, &patch);
        match &graph.transition("t1").expect("t1").variant {
            TransitionVariant::Tm(attrs) => assert_eq!(attrs.write_symbol, "x"),
            other => panic!("expected tm variant, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_viewport_is_ignored() {
        let mut graph = graph();
        let patch = Patch::viewport_only(Viewport {
            pan: Point::default(),
            zoom: -1.0,
        });
        apply_patch(&mut graph, &patch);
        assert!((graph.viewport.zoom - 1.0).abs() < f64::EPSILON);
    }
}
