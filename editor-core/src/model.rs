//! Automaton entities - the building blocks of the editable graph.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Diameter of a rendered state circle in world units.
pub const STATE_DIAMETER: f64 = 60.0;

/// Radius of a rendered state circle in world units.
pub const STATE_RADIUS: f64 = STATE_DIAMETER / 2.0;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh, unique identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "_{}"), Uuid::new_v4().simple()))
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier of a state.
    StateId,
    "q"
);

string_id!(
    /// Unique identifier of a transition.
    TransitionId,
    "t"
);

/// A 2D point in world or screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A state (node) of the automaton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Unique identifier.
    pub id: StateId,
    /// Display label.
    pub label: String,
    /// Centre X in world coordinates.
    pub x: f64,
    /// Centre Y in world coordinates.
    pub y: f64,
    /// Whether this is the initial state.
    pub is_initial: bool,
    /// Whether this is an accepting state.
    pub is_accepting: bool,
}

impl State {
    /// Create a non-initial, non-accepting state.
    #[must_use]
    pub fn new(id: impl Into<StateId>, label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            x,
            y,
            is_initial: false,
            is_accepting: false,
        }
    }

    /// Mark the state as initial.
    #[must_use]
    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    /// Mark the state as accepting.
    #[must_use]
    pub fn accepting(mut self) -> Self {
        self.is_accepting = true;
        self
    }

    /// Centre of the state.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Check if a world point falls inside the state circle.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.position().distance(point) <= STATE_RADIUS
    }
}

/// The kind of automaton being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Finite-state automaton.
    #[default]
    Fsa,
    /// Pushdown automaton.
    Pda,
    /// Turing machine.
    Tm,
}

impl ModelType {
    /// Variant given to transitions created under this model type.
    #[must_use]
    pub fn new_variant(self) -> TransitionVariant {
        match self {
            Self::Fsa => TransitionVariant::Fsa,
            Self::Pda => TransitionVariant::Pda(PdaAttributes {
                pop_symbol: "Z".to_string(),
                ..PdaAttributes::default()
            }),
            Self::Tm => TransitionVariant::Tm(TmAttributes::default()),
        }
    }
}

/// Tape head movement of a Turing machine transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move left.
    L,
    /// Move right.
    #[default]
    R,
    /// Stay.
    S,
}

impl Direction {
    /// Parse a direction, falling back to `R` for anything unrecognised.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "L" => Self::L,
            "S" => Self::S,
            _ => Self::R,
        }
    }

    /// Single-letter form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::R => "R",
            Self::S => "S",
        }
    }
}

/// Stack attributes of a pushdown transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PdaAttributes {
    /// Input symbol consumed.
    pub read_symbol: String,
    /// Stack symbol popped.
    pub pop_symbol: String,
    /// Stack symbol(s) pushed.
    pub push_symbol: String,
    /// Input part is lambda.
    pub is_lambda_input: bool,
    /// Pop part is lambda.
    pub is_lambda_pop: bool,
    /// Push part is lambda.
    pub is_lambda_push: bool,
}

/// Tape attributes of a Turing machine transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TmAttributes {
    /// Symbol under the head.
    pub read_symbol: String,
    /// Symbol written.
    pub write_symbol: String,
    /// Head movement.
    pub direction: Direction,
    /// Tape index for multi-tape machines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tape_number: Option<u32>,
}

/// Variant-specific transition data, fixed when the transition is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransitionVariant {
    /// Plain finite-state transition.
    #[default]
    Fsa,
    /// Pushdown transition.
    Pda(PdaAttributes),
    /// Turing machine transition.
    Tm(TmAttributes),
}

impl TransitionVariant {
    /// The model type this variant belongs to.
    #[must_use]
    pub const fn model_type(&self) -> ModelType {
        match self {
            Self::Fsa => ModelType::Fsa,
            Self::Pda(_) => ModelType::Pda,
            Self::Tm(_) => ModelType::Tm,
        }
    }
}

/// A directed transition (edge) between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Unique identifier.
    pub id: TransitionId,
    /// Source state.
    pub from: StateId,
    /// Target state.
    pub to: StateId,
    /// Input symbols, in order.
    #[serde(default, alias = "labels")]
    pub symbols: Vec<String>,
    /// Marker for an epsilon/lambda transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_symbol: Option<String>,
    /// Variant-specific data.
    #[serde(flatten)]
    pub variant: TransitionVariant,
}

impl Transition {
    /// Create an FSA transition.
    #[must_use]
    pub fn new(
        id: impl Into<TransitionId>,
        from: impl Into<StateId>,
        to: impl Into<StateId>,
        symbols: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
            lambda_symbol: None,
            variant: TransitionVariant::Fsa,
        }
    }

    /// Replace the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: TransitionVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Whether this transition touches the given state.
    #[must_use]
    pub fn is_incident_to(&self, state: &str) -> bool {
        self.from.as_str() == state || self.to.as_str() == state
    }

    /// Whether this transition loops back onto its source.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Display label in the format of its variant.
    #[must_use]
    pub fn label(&self) -> String {
        crate::label_edit::format_transition_label(self)
    }
}

/// Edge-drawing strategy. Affects rendering only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Spline edges.
    #[default]
    Curved,
    /// Manhattan edges.
    Orthogonal,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Curved => f.write_str("curved"),
            Self::Orthogonal => f.write_str("orthogonal"),
        }
    }
}

/// Pan offset and zoom of the canvas.
///
/// Screen coordinates relate to world coordinates as
/// `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Pan offset in screen pixels.
    pub pan: Point,
    /// Zoom factor (1.0 = 100%), always positive.
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Convert a screen point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }

    /// Rescale by `factor` keeping the world point under `anchor` fixed.
    ///
    /// The resulting zoom is clamped to `[min_zoom, max_zoom]`.
    #[must_use]
    pub fn zoomed_about(&self, anchor: Point, factor: f64, min_zoom: f64, max_zoom: f64) -> Self {
        let world = self.screen_to_world(anchor);
        let zoom = (self.zoom * factor).clamp(min_zoom, max_zoom);
        Self {
            pan: Point::new(anchor.x - world.x * zoom, anchor.y - world.y * zoom),
            zoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_prefixed() {
        let a = StateId::generate();
        let b = StateId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("q_"));
        assert!(TransitionId::generate().as_str().starts_with("t_"));
    }

    #[test]
    fn test_state_hit_test_uses_radius() {
        let state = State::new("q0", "q0", 100.0, 100.0);
        assert!(state.contains_point(Point::new(120.0, 100.0)));
        assert!(!state.contains_point(Point::new(131.0, 100.0)));
    }

    #[test]
    fn test_transition_wire_shape() {
        let t = Transition::new("t1", "q0", "q1", &["a"]);
        let json = serde_json::to_value(&t).expect("serialize");
        assert_eq!(json["from"], "q0");
        assert_eq!(json["symbols"], serde_json::json!(["a"]));
        assert_eq!(json["kind"], "fsa");
        assert!(json.get("lambdaSymbol").is_none());
    }

    #[test]
    fn test_tm_transition_deserializes_flattened_fields() {
        let json = r#"{"id":"t1","from":"q0","to":"q0","kind":"tm","readSymbol":"a","writeSymbol":"b","direction":"L"}"#;
        let t: Transition = serde_json::from_str(json).expect("deserialize");
        assert!(t.is_self_loop());
        match t.variant {
            TransitionVariant::Tm(attrs) => {
                assert_eq!(attrs.read_symbol, "a");
                assert_eq!(attrs.direction, Direction::L);
                assert_eq!(attrs.tape_number, None);
            }
            other => panic!("expected tm variant, got {other:?}"),
        }
    }

    #[test]
    fn test_direction_parse_defaults_to_right() {
        assert_eq!(Direction::parse(" l "), Direction::L);
        assert_eq!(Direction::parse("s"), Direction::S);
        assert_eq!(Direction::parse("?"), Direction::R);
    }

    #[test]
    fn test_viewport_zoom_keeps_anchor_fixed() {
        let viewport = Viewport {
            pan: Point::new(10.0, -20.0),
            zoom: 1.0,
        };
        let anchor = Point::new(200.0, 150.0);
        let before = viewport.screen_to_world(anchor);
        let zoomed = viewport.zoomed_about(anchor, 2.0, 0.4, 2.5);
        let after = zoomed.screen_to_world(anchor);
        assert!((zoomed.zoom - 2.0).abs() < f64::EPSILON);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_zoom_is_clamped() {
        let viewport = Viewport::default();
        let zoomed = viewport.zoomed_about(Point::default(), 10.0, 0.4, 2.5);
        assert!((zoomed.zoom - 2.5).abs() < f64::EPSILON);
        let zoomed = viewport.zoomed_about(Point::default(), 0.01, 0.4, 2.5);
        assert!((zoomed.zoom - 0.4).abs() < f64::EPSILON);
    }
}
