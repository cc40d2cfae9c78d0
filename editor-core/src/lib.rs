//! # Automaton Editor Core
//!
//! Editing core for automaton diagrams embedded in a host application.
//! Compiles to WASM for use inside a web view, or runs natively behind the
//! WebSocket transport in `editor-server`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   editor-core                    │
//! ├──────────────────────────────────────────────────┤
//! │  Host Bridge       │  Interaction Controller     │
//! │  - Envelopes       │  - Hit testing              │
//! │  - Readiness gate  │  - Drag / marquee / pan     │
//! │  - Dispatch        │  - Label editing            │
//! ├──────────────────────────────────────────────────┤
//! │  Editor Session: snapshot -> mutate -> diff      │
//! ├──────────────────────────────────────────────────┤
//! │  Graph Model  │  Differ  │  Applier  │  History  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Host -> envelope -> [`HostBridge`] -> [`apply_patch`] -> [`Graph`].
//! User input -> [`Editor`] -> [`Graph`] -> [`diff`] -> [`History`] ->
//! `patch` envelope -> host.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod batch;
pub mod bridge;
pub mod config;
pub mod editor;
pub mod error;
pub mod graph;
pub mod history;
pub mod interaction;
pub mod label_edit;
pub mod model;
pub mod patch;
pub mod protocol;
pub mod snapshot;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use apply::apply_patch;
pub use batch::{MoveBatcher, MoveUpdate};
pub use bridge::HostBridge;
pub use config::{EditorConfig, RetryConfig};
pub use editor::{Editor, Highlights, Selection};
pub use error::{EditorError, EditorResult, ProtocolError};
pub use graph::Graph;
pub use history::History;
pub use interaction::{InteractionController, KeyInput, KeyModifiers, PointerButton, PointerInput};
pub use label_edit::{EditTarget, LabelEditor};
pub use model::{
    Direction, ModelType, PdaAttributes, Point, RoutingMode, State, StateId, TmAttributes,
    Transition, TransitionId, TransitionVariant, Viewport, STATE_DIAMETER, STATE_RADIUS,
};
pub use patch::{diff, Patch, StateRecord, TransitionRecord};
pub use protocol::{Envelope, InboundCommand, OutboundEvent, PROTOCOL_VERSION};
pub use snapshot::Snapshot;

/// Editor core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
