//! Coalescing of `state.move` notifications.
//!
//! A single-slot pending batch plus one scheduled flush. The first update
//! into an empty buffer fixes the flush deadline; later updates only replace
//! buffered positions. When the deadline passes every buffered update is
//! flushed together, one per state, in first-queued order.

use serde::{Deserialize, Serialize};

use crate::{Point, StateId};

/// Default coalescing window in milliseconds.
pub const DEFAULT_MOVE_BATCH_WINDOW_MS: u64 = 80;

/// Latest known position of a moved state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveUpdate {
    /// Moved state.
    pub id: StateId,
    /// New centre X.
    pub x: f64,
    /// New centre Y.
    pub y: f64,
}

/// Debounce buffer for move notifications.
#[derive(Debug, Clone)]
pub struct MoveBatcher {
    pending: Vec<MoveUpdate>,
    deadline_ms: Option<u64>,
    window_ms: u64,
}

impl Default for MoveBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_BATCH_WINDOW_MS)
    }
}

impl MoveBatcher {
    /// Create an empty batcher with the given window.
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            pending: Vec::new(),
            deadline_ms: None,
            window_ms,
        }
    }

    /// Buffer a position update.
    ///
    /// Returns `true` when this call scheduled a new flush.
    pub fn schedule(&mut self, id: &StateId, position: Point, now_ms: u64) -> bool {
        match self.pending.iter_mut().find(|u| u.id == *id) {
            Some(update) => {
                update.x = position.x;
                update.y = position.y;
            }
            None => self.pending.push(MoveUpdate {
                id: id.clone(),
                x: position.x,
                y: position.y,
            }),
        }
        if self.deadline_ms.is_some() {
            return false;
        }
        self.deadline_ms = Some(now_ms.saturating_add(self.window_ms));
        true
    }

    /// Flush the buffer if its deadline has passed.
    pub fn flush_due(&mut self, now_ms: u64) -> Vec<MoveUpdate> {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Flush the buffer immediately.
    pub fn flush(&mut self) -> Vec<MoveUpdate> {
        self.deadline_ms = None;
        std::mem::take(&mut self.pending)
    }

    /// Forget a state, e.g. after it was deleted.
    pub fn discard(&mut self, id: &str) {
        self.retain(|pending| pending != id);
    }

    /// Keep only updates for states matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.pending.retain(|u| keep(u.id.as_str()));
        if self.pending.is_empty() {
            self.deadline_ms = None;
        }
    }

    /// When the scheduled flush fires, if any.
    #[must_use]
    pub const fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Number of buffered updates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
