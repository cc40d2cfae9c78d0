//! WebAssembly bindings for editor-core.
//!
//! Every call that can produce host traffic returns a JSON array of
//! envelopes for the page to forward. Time is supplied by the caller as
//! `performance.now()`-style milliseconds.

use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::interaction::{KeyInput, PointerInput};
use crate::protocol::Envelope;
use crate::{EditorConfig, HostBridge, Point, RoutingMode};

/// Initialize the editor WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_ms(now: f64) -> u64 {
    if now.is_finite() && now > 0.0 {
        now as u64
    } else {
        0
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

fn to_json(envelopes: &[Envelope]) -> String {
    serde_json::to_string(envelopes).unwrap_or_else(|_| "[]".to_string())
}

/// Editor instance for WASM.
#[wasm_bindgen]
pub struct WasmEditor {
    bridge: HostBridge,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create an editor, optionally from a JSON `EditorConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is malformed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmEditor, String> {
        let config = match config_json.as_deref() {
            Some(json) if !json.trim().is_empty() => parse::<EditorConfig>(json)?,
            _ => EditorConfig::default(),
        };
        Ok(Self {
            bridge: HostBridge::new(config),
        })
    }

    /// The `editor_ready` announcement.
    #[wasm_bindgen(js_name = readyMessages)]
    #[must_use]
    pub fn ready_messages(&mut self) -> String {
        to_json(&self.bridge.ready_envelope())
    }

    /// Handle one message from the host. Never fails.
    #[wasm_bindgen(js_name = handleMessage)]
    #[must_use]
    pub fn handle_message(&mut self, raw: &str, now_ms: f64) -> String {
        to_json(&self.bridge.handle_message(raw, to_ms(now_ms)))
    }

    /// Advance timers.
    #[must_use]
    pub fn tick(&mut self, now_ms: f64) -> String {
        to_json(&self.bridge.tick(to_ms(now_ms)))
    }

    /// Earliest time `tick` has work to do, if any.
    #[wasm_bindgen(js_name = nextDeadline)]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.bridge.next_deadline_ms().map(|ms| ms as f64)
    }

    /// Report that the renderer can draw.
    #[wasm_bindgen(js_name = markRendererReady)]
    pub fn mark_renderer_ready(&mut self) {
        self.bridge.set_renderer_ready(true);
    }

    /// Pointer pressed; `input` is a JSON `PointerInput`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the input is malformed.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, input: &str) -> Result<String, String> {
        let input: PointerInput = parse(input)?;
        self.bridge.editor_mut().pointer_down(&input);
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Pointer moved.
    ///
    /// # Errors
    ///
    /// Returns an error string if the input is malformed.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, input: &str, now_ms: f64) -> Result<String, String> {
        let input: PointerInput = parse(input)?;
        self.bridge.editor_mut().pointer_move(&input, to_ms(now_ms));
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Pointer released.
    ///
    /// # Errors
    ///
    /// Returns an error string if the input is malformed.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, input: &str) -> Result<String, String> {
        let input: PointerInput = parse(input)?;
        self.bridge.editor_mut().pointer_up(&input);
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Double click.
    ///
    /// # Errors
    ///
    /// Returns an error string if the input is malformed.
    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, input: &str) -> Result<String, String> {
        let input: PointerInput = parse(input)?;
        self.bridge.editor_mut().double_click(&input);
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Wheel scrolled at a screen point.
    #[must_use]
    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> String {
        self.bridge.editor_mut().wheel(Point::new(x, y), delta_y);
        to_json(&self.bridge.drain_outbound())
    }

    /// Key pressed; `input` is a JSON `KeyInput`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the input is malformed.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, input: &str, now_ms: f64) -> Result<String, String> {
        let input: KeyInput = parse(input)?;
        self.bridge.editor_mut().key_down(&input, to_ms(now_ms));
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Replace the label draft.
    #[wasm_bindgen(js_name = setLabelDraft)]
    pub fn set_label_draft(&mut self, text: &str) {
        self.bridge.editor_mut().set_label_draft(text);
    }

    /// Commit the open label edit.
    ///
    /// # Errors
    ///
    /// Returns an error string if the edited entity vanished.
    #[wasm_bindgen(js_name = commitLabelEdit)]
    pub fn commit_label_edit(&mut self) -> Result<String, String> {
        self.bridge
            .editor_mut()
            .commit_label_edit()
            .map_err(|e| e.to_string())?;
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Cancel the open label edit.
    #[wasm_bindgen(js_name = cancelLabelEdit)]
    pub fn cancel_label_edit(&mut self) {
        self.bridge.editor_mut().cancel_label_edit();
    }

    /// Undo the last edit.
    #[must_use]
    pub fn undo(&mut self) -> String {
        self.bridge.editor_mut().undo();
        to_json(&self.bridge.drain_outbound())
    }

    /// Redo the last undone edit.
    #[must_use]
    pub fn redo(&mut self) -> String {
        self.bridge.editor_mut().redo();
        to_json(&self.bridge.drain_outbound())
    }

    /// Change routing mode (`curved` or `orthogonal`).
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown mode.
    #[wasm_bindgen(js_name = setRouting)]
    pub fn set_routing(&mut self, mode: &str) -> Result<String, String> {
        let mode: RoutingMode = parse(&serde_json::Value::String(mode.to_string()).to_string())?;
        self.bridge.editor_mut().set_routing(mode);
        Ok(to_json(&self.bridge.drain_outbound()))
    }

    /// Current graph as JSON.
    #[wasm_bindgen(js_name = getGraphJson)]
    #[must_use]
    pub fn get_graph_json(&self) -> String {
        serde_json::to_string(self.bridge.editor().graph()).unwrap_or_default()
    }

    /// Marquee rectangle being dragged, in world coordinates, as JSON
    /// (`null` outside a marquee gesture).
    #[wasm_bindgen(js_name = getMarqueeJson)]
    #[must_use]
    pub fn get_marquee_json(&self) -> String {
        let marquee = self.bridge.editor().controller().marquee();
        serde_json::to_string(&marquee).unwrap_or_else(|_| "null".to_string())
    }

    /// Whether a frame should be drawn.
    #[wasm_bindgen(js_name = frameRequested)]
    #[must_use]
    pub fn frame_requested(&self) -> bool {
        self.bridge.editor().frame_requested()
    }

    /// Acknowledge a drawn frame.
    #[wasm_bindgen(js_name = frameRendered)]
    pub fn frame_rendered(&mut self) {
        self.bridge.editor_mut().frame_rendered();
    }
}
