//! Property tests for the differ, applier and graph invariants.
//!
//! Graphs are generated from small id pools so that two independently
//! generated graphs overlap, exercising updates as well as inserts and
//! deletions. Transitions cover all three model variants. Partial patches
//! are generated directly, the way a host may send them, with any subset
//! of fields present.

use editor_core::patch::{StatesMeta, StatesPatch, TransitionsPatch};
use editor_core::{
    apply_patch, diff, Direction, Graph, ModelType, Patch, PdaAttributes, Point, RoutingMode,
    State, StateId, StateRecord, TmAttributes, Transition, TransitionRecord, TransitionVariant,
    Viewport,
};
use proptest::prelude::*;

/// Raw material for one generated transition.
#[derive(Debug, Clone)]
struct TransitionSpec {
    n: u8,
    from: u8,
    to: u8,
    symbols: Vec<String>,
    lambda_symbol: Option<String>,
    variant: TransitionVariant,
}

/// Raw material for one generated graph.
#[derive(Debug, Clone)]
struct GraphSpec {
    states: Vec<(u8, i16, i16, bool)>,
    initial: Option<u8>,
    transitions: Vec<TransitionSpec>,
    pan: (i16, i16),
    orthogonal: bool,
}

fn arb_symbol() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "0", "1", ""]).prop_map(str::to_string)
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(vec![Direction::L, Direction::R, Direction::S])
}

fn arb_model_type() -> impl Strategy<Value = ModelType> {
    prop::sample::select(vec![ModelType::Fsa, ModelType::Pda, ModelType::Tm])
}

fn arb_pda() -> impl Strategy<Value = PdaAttributes> {
    (
        arb_symbol(),
        arb_symbol(),
        arb_symbol(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(read_symbol, pop_symbol, push_symbol, is_lambda_input, is_lambda_pop, is_lambda_push)| {
                PdaAttributes {
                    read_symbol,
                    pop_symbol,
                    push_symbol,
                    is_lambda_input,
                    is_lambda_pop,
                    is_lambda_push,
                }
            },
        )
}

fn arb_tm() -> impl Strategy<Value = TmAttributes> {
    (
        arb_symbol(),
        arb_symbol(),
        arb_direction(),
        prop::option::of(0u32..4),
    )
        .prop_map(|(read_symbol, write_symbol, direction, tape_number)| TmAttributes {
            read_symbol,
            write_symbol,
            direction,
            tape_number,
        })
}

fn arb_variant() -> impl Strategy<Value = TransitionVariant> {
    prop_oneof![
        Just(TransitionVariant::Fsa),
        arb_pda().prop_map(TransitionVariant::Pda),
        arb_tm().prop_map(TransitionVariant::Tm),
    ]
}

fn arb_transition_spec() -> impl Strategy<Value = TransitionSpec> {
    (
        0u8..6,
        0u8..6,
        0u8..6,
        prop::collection::vec(arb_symbol(), 0..4),
        prop::option::of(prop::sample::select(vec!["λ", "ε"]).prop_map(str::to_string)),
        arb_variant(),
    )
        .prop_map(|(n, from, to, symbols, lambda_symbol, variant)| TransitionSpec {
            n,
            from,
            to,
            symbols,
            lambda_symbol,
            variant,
        })
}

fn arb_graph_spec() -> impl Strategy<Value = GraphSpec> {
    (
        prop::collection::vec((0u8..6, any::<i16>(), any::<i16>(), any::<bool>()), 0..6),
        prop::option::of(0u8..6),
        prop::collection::vec(arb_transition_spec(), 0..8),
        (any::<i16>(), any::<i16>()),
        any::<bool>(),
    )
        .prop_map(|(states, initial, transitions, pan, orthogonal)| GraphSpec {
            states,
            initial,
            transitions,
            pan,
            orthogonal,
        })
}

fn arb_state_record() -> impl Strategy<Value = StateRecord> {
    (
        0u8..8,
        prop::option::of(prop::sample::select(vec!["start", "q9", ""]).prop_map(str::to_string)),
        prop::option::of(any::<i16>()),
        prop::option::of(any::<i16>()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(n, label, x, y, is_initial, is_accepting)| StateRecord {
            id: StateId::new(format!("q{n}")),
            label,
            x: x.map(f64::from),
            y: y.map(f64::from),
            is_initial,
            is_accepting,
        })
}

fn arb_transition_record() -> impl Strategy<Value = TransitionRecord> {
    let common = (
        0u8..10,
        prop::option::of(0u8..8),
        prop::option::of(0u8..8),
        prop::option::of(prop::collection::vec(arb_symbol(), 0..3)),
        prop::option::of(prop::option::of(Just("λ".to_string()))),
        prop::option::of(arb_model_type()),
    );
    let attributes = (
        prop::option::of(arb_symbol()),
        prop::option::of(arb_symbol()),
        prop::option::of(arb_symbol()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        prop::option::of(arb_symbol()),
        prop::option::of(arb_direction()),
        prop::option::of(prop::option::of(0u32..4)),
    );
    (common, attributes).prop_map(
        |(
            (n, from, to, symbols, lambda_symbol, kind),
            (
                read_symbol,
                pop_symbol,
                push_symbol,
                is_lambda_input,
                is_lambda_pop,
                is_lambda_push,
                write_symbol,
                direction,
                tape_number,
            ),
        )| TransitionRecord {
            id: format!("t{n}").into(),
            from: from.map(|s| StateId::new(format!("q{s}"))),
            to: to.map(|s| StateId::new(format!("q{s}"))),
            symbols,
            lambda_symbol,
            kind,
            read_symbol,
            pop_symbol,
            push_symbol,
            is_lambda_input,
            is_lambda_pop,
            is_lambda_push,
            write_symbol,
            direction,
            tape_number,
        },
    )
}

/// A host-style patch: any section may be absent, records may be partial,
/// and ids may repeat or name nothing.
fn arb_partial_patch() -> impl Strategy<Value = Patch> {
    let states = prop::option::of(
        (
            prop::collection::vec(arb_state_record(), 0..4),
            prop::collection::vec(0u8..8, 0..3),
            prop::option::of(prop::option::of(0u8..8)),
        )
            .prop_map(|(upsert, delete, meta)| StatesPatch {
                upsert,
                delete: delete
                    .into_iter()
                    .map(|n| StateId::new(format!("q{n}")))
                    .collect(),
                meta: meta.map(|initial| StatesMeta {
                    initial_id: initial.map(|n| StateId::new(format!("q{n}"))),
                }),
            }),
    );
    let transitions = prop::option::of(
        (
            prop::collection::vec(arb_transition_record(), 0..4),
            prop::collection::vec(0u8..10, 0..3),
        )
            .prop_map(|(upsert, delete)| TransitionsPatch {
                upsert,
                delete: delete.into_iter().map(|n| format!("t{n}").into()).collect(),
            }),
    );
    (
        states,
        transitions,
        prop::option::of(prop::collection::btree_set(arb_symbol(), 0..4)),
        prop::option::of((any::<i16>(), prop::sample::select(vec![0.5, 1.0, 2.0, 0.0]))),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(states, transitions, alphabet, viewport, orthogonal)| Patch {
            states,
            transitions,
            alphabet,
            viewport: viewport.map(|(pan, zoom)| Viewport {
                pan: Point::new(f64::from(pan), 0.0),
                zoom,
            }),
            routing_mode: orthogonal.map(routing),
        })
}

fn routing(orthogonal: bool) -> RoutingMode {
    if orthogonal {
        RoutingMode::Orthogonal
    } else {
        RoutingMode::Curved
    }
}

/// Build a valid graph, skipping duplicate ids and dangling transitions.
fn build(spec: &GraphSpec) -> Graph {
    let mut graph = Graph::new();
    for &(n, x, y, accepting) in &spec.states {
        let mut state = State::new(format!("q{n}"), format!("q{n}"), f64::from(x), f64::from(y));
        state.is_accepting = accepting;
        let _ = graph.add_state(state);
    }
    if let Some(n) = spec.initial {
        let _ = graph.set_initial(&format!("q{n}"), true);
    }
    for t in &spec.transitions {
        let symbols: Vec<&str> = t.symbols.iter().map(String::as_str).collect();
        let mut transition = Transition::new(
            format!("t{}", t.n),
            format!("q{}", t.from),
            format!("q{}", t.to),
            &symbols,
        )
        .with_variant(t.variant.clone());
        transition.lambda_symbol.clone_from(&t.lambda_symbol);
        let _ = graph.add_transition(transition);
    }
    graph.viewport = Viewport {
        pan: Point::new(f64::from(spec.pan.0), f64::from(spec.pan.1)),
        zoom: 1.0,
    };
    graph.routing_mode = routing(spec.orthogonal);
    graph
}

proptest! {
    #[test]
    fn prop_diff_of_identical_snapshots_is_empty(spec in arb_graph_spec()) {
        let snapshot = build(&spec).snapshot();
        prop_assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn prop_applying_diff_reaches_target(a in arb_graph_spec(), b in arb_graph_spec()) {
        let (s1, s2) = (build(&a).snapshot(), build(&b).snapshot());
        let patch = diff(&s1, &s2);

        let mut graph = Graph::new();
        graph.restore(&s1);
        apply_patch(&mut graph, &patch);
        prop_assert_eq!(graph.snapshot(), s2);
    }

    #[test]
    fn prop_patch_survives_json(a in arb_graph_spec(), b in arb_graph_spec()) {
        let (s1, s2) = (build(&a).snapshot(), build(&b).snapshot());
        let patch = diff(&s1, &s2);

        let json = serde_json::to_string(&patch).expect("serialize");
        let decoded: Patch = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(&decoded, &patch);

        // Cleared optional fields travel as explicit nulls.
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        if let Some(records) = value["transitions"]["upsert"].as_array() {
            for record in records {
                prop_assert!(record.get("lambdaSymbol").is_some());
                if record["kind"] == "tm" {
                    prop_assert!(record.get("tapeNumber").is_some());
                }
            }
        }

        let mut graph = Graph::new();
        graph.restore(&s1);
        apply_patch(&mut graph, &decoded);
        prop_assert_eq!(graph.snapshot(), s2);
    }

    #[test]
    fn prop_apply_is_idempotent(a in arb_graph_spec(), b in arb_graph_spec()) {
        let (s1, s2) = (build(&a).snapshot(), build(&b).snapshot());
        let patch = diff(&s1, &s2);

        let mut once = Graph::new();
        once.restore(&s1);
        apply_patch(&mut once, &patch);
        let mut twice = once.clone();
        apply_patch(&mut twice, &patch);
        prop_assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn prop_partial_patch_apply_is_idempotent(
        spec in arb_graph_spec(),
        patch in arb_partial_patch(),
    ) {
        let mut once = build(&spec);
        apply_patch(&mut once, &patch);
        let mut twice = once.clone();
        apply_patch(&mut twice, &patch);
        prop_assert_eq!(once.snapshot(), twice.snapshot());
        prop_assert!(once.states().filter(|s| s.is_initial).count() <= 1);
    }

    #[test]
    fn prop_at_most_one_initial_state(
        spec in arb_graph_spec(),
        toggles in prop::collection::vec(0u8..6, 0..12),
    ) {
        let mut graph = build(&spec);
        for n in toggles {
            let _ = graph.toggle_initial(&format!("q{n}"));
            prop_assert!(graph.states().filter(|s| s.is_initial).count() <= 1);
        }
    }

    #[test]
    fn prop_state_removal_cascades_exactly(spec in arb_graph_spec(), victim in 0u8..6) {
        let mut graph = build(&spec);
        let id = StateId::new(format!("q{victim}"));
        let mut incident: Vec<_> = graph
            .transitions()
            .filter(|t| t.from == id || t.to == id)
            .map(|t| t.id.clone())
            .collect();
        let survivors = graph.transition_count() - incident.len();

        match graph.remove_state(id.as_str()) {
            Ok((_, removed)) => {
                let mut removed: Vec<_> = removed.into_iter().map(|t| t.id).collect();
                removed.sort();
                incident.sort();
                prop_assert_eq!(removed, incident);
            }
            Err(_) => prop_assert!(incident.is_empty()),
        }
        prop_assert_eq!(graph.transition_count(), survivors);
        prop_assert!(graph.transitions().all(|t| t.from != id && t.to != id));
    }

    #[test]
    fn prop_alphabet_covers_transition_symbols(spec in arb_graph_spec()) {
        let graph = build(&spec);
        for transition in graph.transitions() {
            for symbol in &transition.symbols {
                prop_assert!(graph.alphabet().contains(symbol));
            }
        }
    }
}
