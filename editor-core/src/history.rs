//! # Undo/Redo History
//!
//! Bounded undo and redo stacks of graph snapshots.
//!
//! ```text
//! edit:  push_undo(before)        undo: [.., before]  redo: []
//! undo:  undo(current) -> before  undo: [..]          redo: [current]
//! redo:  redo(current) -> after   undo: [.., current] redo: []
//! ```
//!
//! Undo and redo move snapshots between the paired stacks only; neither is
//! recorded as a fresh edit.

use std::collections::VecDeque;

use crate::Snapshot;

/// Default maximum number of undo entries.
pub const DEFAULT_HISTORY_DEPTH: usize = 60;

/// Undo/redo stacks with a fixed depth limit.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create empty stacks with the default depth.
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// Create empty stacks with a custom depth (at least 1).
    #[must_use]
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the snapshot taken before an edit.
    ///
    /// Drops the oldest entry past the depth limit and invalidates redo.
    pub fn push_undo(&mut self, snapshot: Snapshot) {
        self.push_bounded(snapshot);
        self.redo.clear();
    }

    /// Step back. Returns the snapshot to restore, or `None` if there is
    /// nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo.pop_back()?;
        self.redo.push(current);
        Some(restored)
    }

    /// Step forward. Returns the snapshot to restore, or `None` if there is
    /// nothing to redo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo.pop()?;
        self.push_bounded(current);
        Some(restored)
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo entries.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Depth limit.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_bounded(&mut self, snapshot: Snapshot) {
        if self.undo.len() >= self.max_depth {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }
}
