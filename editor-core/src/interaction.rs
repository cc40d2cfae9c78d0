//! Pointer gestures for the canvas.
//!
//! The controller owns the transient state of a gesture and mutates the
//! graph only for what the user sees move (dragged state, pan offset, wheel
//! zoom). Everything that must reach the host or the history is reported as
//! an [`InteractionEffect`] for the editor session to act on.
//!
//! ```text
//!                 +-- modifier / middle / right, empty ----> Panning
//!                 +-- primary, empty ----------------------> MarqueeSelecting
//! Idle --down-----+-- Alt, on state -----------------------> Connecting
//!                 +-- primary, on state -------------------> DraggingState
//!                 +-- middle / right, on state ------------> Idle (state picked)
//!                 +-- primary, on label -------------------> Idle (transition picked)
//! (any) --up / cancel--> Idle
//! ```

use serde::{Deserialize, Serialize};

use crate::{Graph, Point, Snapshot, StateId, TransitionId, STATE_RADIUS};

/// Hit radius around a transition label anchor, in world units.
pub const LABEL_HIT_RADIUS: f64 = 15.0;

/// Mouse button of a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Left button, pen or touch.
    #[default]
    Primary,
    /// Wheel button.
    Middle,
    /// Right button.
    Secondary,
}

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

impl KeyModifiers {
    /// Ctrl or Meta, the platform command key.
    #[must_use]
    pub const fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifiers that turn a press on empty canvas into a pan.
    #[must_use]
    pub const fn pans(self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    /// X coordinate in screen pixels.
    pub x: f64,
    /// Y coordinate in screen pixels.
    pub y: f64,
    /// Button involved.
    #[serde(default)]
    pub button: PointerButton,
    /// Active modifier keys.
    #[serde(default)]
    pub modifiers: KeyModifiers,
}

impl PointerInput {
    /// Primary-button event without modifiers.
    #[must_use]
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Screen position.
    #[must_use]
    pub const fn screen(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A keyboard event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    /// Key name, as reported by the browser (`Delete`, `z`, `Escape`, ...).
    pub key: String,
    /// Active modifier keys.
    #[serde(default)]
    pub modifiers: KeyModifiers,
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner.
    pub min: Point,
    /// Bottom-right corner.
    pub max: Point,
}

impl Rect {
    /// Normalised rectangle spanned by two corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Whether a circle lies entirely inside the rectangle.
    #[must_use]
    pub fn contains_circle(&self, centre: Point, radius: f64) -> bool {
        centre.x - radius >= self.min.x
            && centre.x + radius <= self.max.x
            && centre.y - radius >= self.min.y
            && centre.y + radius <= self.max.y
    }
}

/// What lies under a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    /// A state body.
    State(StateId),
    /// A transition label.
    Transition(TransitionId),
    /// Empty canvas at the given world point.
    Canvas(Point),
}

/// Transient state of the current gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the canvas.
    Panning {
        /// Screen position at press.
        origin: Point,
        /// Pan offset at press.
        start_pan: Point,
    },
    /// Dragging a selection rectangle.
    MarqueeSelecting {
        /// World position at press.
        anchor: Point,
        /// Current world position.
        current: Point,
    },
    /// Dragging a state.
    DraggingState {
        /// Dragged state.
        id: StateId,
        /// State centre at press.
        origin: Point,
        /// Offset from the pointer to the state centre.
        grab_offset: Point,
        /// Graph before the drag started.
        before: Box<Snapshot>,
    },
    /// Drawing a new transition.
    Connecting {
        /// Source state.
        from: StateId,
        /// Current world position of the rubber band end.
        cursor: Point,
    },
}

/// Result of a gesture step that the editor session must handle.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    /// A state was moved by the drag.
    StateMoved {
        /// Moved state.
        id: StateId,
        /// New centre.
        position: Point,
    },
    /// Pan or zoom changed the viewport.
    ViewportChanged,
    /// A marquee was released.
    MarqueeFinished(Rect),
    /// A drag was released.
    DragFinished {
        /// Dragged state.
        id: StateId,
        /// Graph before the drag started.
        before: Box<Snapshot>,
    },
    /// A drag was cancelled; the state is back at its origin.
    DragCancelled {
        /// Dragged state.
        id: StateId,
    },
    /// A state was pressed with a non-primary button.
    StatePicked(StateId),
    /// A transition label was pressed.
    TransitionPicked(TransitionId),
    /// A connection was released over a state.
    Connect {
        /// Source state.
        from: StateId,
        /// Target state.
        to: StateId,
    },
}

/// Pointer gesture state machine plus the frame-throttle flag.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    gesture: Gesture,
    frame_pending: bool,
}

impl InteractionController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gesture.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Whether no gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    /// Current marquee rectangle, if selecting.
    #[must_use]
    pub fn marquee(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::MarqueeSelecting { anchor, current } => {
                Some(Rect::from_corners(*anchor, *current))
            }
            _ => None,
        }
    }

    /// Begin a gesture.
    ///
    /// A press that only selects something (a transition label, or a state
    /// under a non-primary button) leaves the controller idle and reports
    /// what was picked.
    pub fn pointer_down(
        &mut self,
        graph: &Graph,
        input: &PointerInput,
    ) -> Option<InteractionEffect> {
        let screen = input.screen();
        let world = graph.viewport.screen_to_world(screen);
        let primary = input.button == PointerButton::Primary;
        let mut picked = None;

        self.gesture = match hit_test(graph, screen) {
            Hit::State(id) if input.modifiers.alt => Gesture::Connecting {
                from: id,
                cursor: world,
            },
            Hit::State(id) if primary => match graph.state(id.as_str()) {
                Some(state) => Gesture::DraggingState {
                    origin: state.position(),
                    grab_offset: Point::new(state.x - world.x, state.y - world.y),
                    before: Box::new(graph.snapshot()),
                    id,
                },
                None => Gesture::Idle,
            },
            Hit::State(id) => {
                picked = Some(InteractionEffect::StatePicked(id));
                Gesture::Idle
            }
            Hit::Transition(id) if primary && !input.modifiers.pans() => {
                picked = Some(InteractionEffect::TransitionPicked(id));
                Gesture::Idle
            }
            _ if input.modifiers.pans() || !primary => Gesture::Panning {
                origin: screen,
                start_pan: graph.viewport.pan,
            },
            _ => Gesture::MarqueeSelecting {
                anchor: world,
                current: world,
            },
        };
        tracing::trace!(gesture = ?self.gesture_name(), "pointer down");
        if picked.is_some() {
            self.request_frame();
        }
        picked
    }

    /// Update the gesture. Returns an effect when a state moved.
    pub fn pointer_move(
        &mut self,
        graph: &mut Graph,
        input: &PointerInput,
    ) -> Option<InteractionEffect> {
        let screen = input.screen();
        let world = graph.viewport.screen_to_world(screen);
        let effect = match &mut self.gesture {
            Gesture::Idle => return None,
            Gesture::Panning { origin, start_pan } => {
                graph.viewport.pan = Point::new(
                    start_pan.x + screen.x - origin.x,
                    start_pan.y + screen.y - origin.y,
                );
                None
            }
            Gesture::MarqueeSelecting { current, .. } => {
                *current = world;
                None
            }
            Gesture::DraggingState { id, grab_offset, .. } => {
                let position = Point::new(world.x + grab_offset.x, world.y + grab_offset.y);
                match graph.move_state(id.as_str(), position) {
                    Ok(()) => Some(InteractionEffect::StateMoved {
                        id: id.clone(),
                        position,
                    }),
                    Err(e) => {
                        // Removed by the host mid-drag.
                        tracing::debug!("drag target vanished: {e}");
                        None
                    }
                }
            }
            Gesture::Connecting { cursor, .. } => {
                *cursor = world;
                None
            }
        };
        self.request_frame();
        effect
    }

    /// Finish the gesture.
    pub fn pointer_up(&mut self, graph: &Graph, input: &PointerInput) -> Option<InteractionEffect> {
        let world = graph.viewport.screen_to_world(input.screen());
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Panning { start_pan, .. } => {
                (graph.viewport.pan != start_pan).then_some(InteractionEffect::ViewportChanged)
            }
            Gesture::MarqueeSelecting { anchor, .. } => {
                self.request_frame();
                Some(InteractionEffect::MarqueeFinished(Rect::from_corners(
                    anchor, world,
                )))
            }
            Gesture::DraggingState { id, before, .. } => {
                Some(InteractionEffect::DragFinished { id, before })
            }
            Gesture::Connecting { from, .. } => {
                self.request_frame();
                graph.state_at(world).map(|to| InteractionEffect::Connect {
                    from,
                    to: to.clone(),
                })
            }
        }
    }

    /// Abort the gesture. A drag puts the state back where it started.
    pub fn cancel(&mut self, graph: &mut Graph) -> Option<InteractionEffect> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Panning { start_pan, .. } => {
                graph.viewport.pan = start_pan;
                self.request_frame();
                None
            }
            Gesture::DraggingState { id, origin, .. } => {
                // The state may have been removed by the host meanwhile.
                let _ = graph.move_state(id.as_str(), origin);
                self.request_frame();
                Some(InteractionEffect::DragCancelled { id })
            }
            Gesture::MarqueeSelecting { .. } | Gesture::Connecting { .. } => {
                self.request_frame();
                None
            }
        }
    }

    /// Zoom by wheel notches about the cursor.
    ///
    /// Negative `delta_y` zooms in. Returns `true` if the viewport changed.
    pub fn wheel(
        &mut self,
        graph: &mut Graph,
        screen: Point,
        delta_y: f64,
        zoom_step: f64,
        min_zoom: f64,
        max_zoom: f64,
    ) -> bool {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }
        let factor = if delta_y < 0.0 { zoom_step } else { zoom_step.recip() };
        let next = graph
            .viewport
            .zoomed_about(screen, factor, min_zoom, max_zoom);
        if (next.zoom - graph.viewport.zoom).abs() < f64::EPSILON {
            return false;
        }
        graph.viewport = next;
        self.request_frame();
        true
    }

    /// Drop any gesture without touching the graph.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Ask for a re-render. Returns `true` only for the first request since
    /// the last rendered frame.
    pub fn request_frame(&mut self) -> bool {
        !std::mem::replace(&mut self.frame_pending, true)
    }

    /// Acknowledge that a frame was rendered.
    pub fn frame_rendered(&mut self) {
        self.frame_pending = false;
    }

    /// Whether a re-render is pending.
    #[must_use]
    pub const fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    fn gesture_name(&self) -> &'static str {
        match self.gesture {
            Gesture::Idle => "idle",
            Gesture::Panning { .. } => "panning",
            Gesture::MarqueeSelecting { .. } => "marquee",
            Gesture::DraggingState { .. } => "dragging",
            Gesture::Connecting { .. } => "connecting",
        }
    }
}

/// World position of a transition's label.
///
/// Midpoint of the endpoints, or above the state for a self loop. `None`
/// for a transition with an unresolved endpoint.
#[must_use]
pub fn label_anchor(graph: &Graph, id: &str) -> Option<Point> {
    let transition = graph.transition(id)?;
    let from = graph.state(transition.from.as_str())?.position();
    let to = graph.state(transition.to.as_str())?.position();
    if transition.is_self_loop() {
        return Some(Point::new(from.x, from.y - STATE_RADIUS * 2.0));
    }
    Some(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0))
}

/// Find what lies under a screen point. States win over labels.
#[must_use]
pub fn hit_test(graph: &Graph, screen: Point) -> Hit {
    let world = graph.viewport.screen_to_world(screen);
    if let Some(id) = graph.state_at(world) {
        return Hit::State(id.clone());
    }
    graph
        .resolved_transitions()
        .find(|t| {
            label_anchor(graph, t.id.as_str())
                .is_some_and(|anchor| anchor.distance(world) <= LABEL_HIT_RADIUS)
        })
        .map_or(Hit::Canvas(world), |t| Hit::Transition(t.id.clone()))
}

/// States fully inside a world rectangle.
#[must_use]
pub fn states_in_rect(graph: &Graph, rect: Rect) -> Vec<StateId> {
    graph
        .states()
        .filter(|s| rect.contains_circle(s.position(), STATE_RADIUS))
        .map(|s| s.id.clone())
        .collect()
}
