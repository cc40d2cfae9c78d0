//! Editor session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_MOVE_BATCH_WINDOW_MS;
use crate::history::DEFAULT_HISTORY_DEPTH;

/// Backoff policy for re-checking renderer readiness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of readiness checks before queued commands are dropped.
    pub max_retries: u32,
    /// Initial delay between checks in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between checks in milliseconds (cap for backoff).
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each check.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 50,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom values.
    #[must_use]
    pub const fn new(
        max_retries: u32,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            max_delay_ms,
            backoff_multiplier,
        }
    }

    /// Delay before the given check (0-indexed).
    ///
    /// Uses exponential backoff: `delay = initial * multiplier^attempt`,
    /// capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier.powi(attempt.min(64) as i32);
        let delay_ms = (base_delay * multiplier).min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Tunables of an editor session. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo depth limit.
    pub history_depth: usize,
    /// `state.move` coalescing window in milliseconds.
    pub move_batch_window_ms: u64,
    /// Lower zoom bound.
    pub min_zoom: f64,
    /// Upper zoom bound.
    pub max_zoom: f64,
    /// Scale factor of one zoom step or wheel notch.
    pub zoom_step: f64,
    /// Screen padding used by `fit_content`.
    pub fit_padding: f64,
    /// Canvas width in screen pixels.
    pub canvas_width: f64,
    /// Canvas height in screen pixels.
    pub canvas_height: f64,
    /// Emit per-entity `state.*` / `transition.*` notifications with patches.
    pub legacy_notifications: bool,
    /// Accept `{type, payload}` envelopes without a version.
    pub accept_legacy_envelopes: bool,
    /// Mirror diagnostics to the host as `log` events.
    pub forward_diagnostics: bool,
    /// Whether the renderer is ready when the session starts.
    pub renderer_ready: bool,
    /// Commands held while the renderer is not ready.
    pub pending_command_capacity: usize,
    /// Readiness re-check policy.
    pub retry: RetryConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            move_batch_window_ms: DEFAULT_MOVE_BATCH_WINDOW_MS,
            min_zoom: 0.4,
            max_zoom: 2.5,
            zoom_step: 1.1,
            fit_padding: 40.0,
            canvas_width: 800.0,
            canvas_height: 600.0,
            legacy_notifications: true,
            accept_legacy_envelopes: false,
            forward_diagnostics: false,
            renderer_ready: true,
            pending_command_capacity: 64,
            retry: RetryConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON, defaulting missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> crate::EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Clamp a zoom value into the configured range.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
