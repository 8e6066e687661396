//! Linear undo/redo over album snapshots.
//!
//! Each entry stores deep copies of the state before and after one
//! mutating operation. Pushing a new entry clears the redo stack; the undo
//! stack is capped and drops its oldest entries first.

use crate::error::{LayoutError, Result};
use crate::model::AlbumState;

/// One reversible edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub description: String,
    pub before: AlbumState,
    pub after: AlbumState,
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a completed edit.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
        self.redo_stack.clear();
    }

    /// Restore the state from before the last edit.
    pub fn undo(&mut self, state: &mut AlbumState) -> Result<&str> {
        let entry = self.undo_stack.pop().ok_or(LayoutError::NothingToUndo)?;
        *state = entry.before.clone();
        self.redo_stack.push(entry);
        Ok(self.redo_stack.last().map(|e| e.description.as_str()).unwrap_or_default())
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self, state: &mut AlbumState) -> Result<&str> {
        let entry = self.redo_stack.pop().ok_or(LayoutError::NothingToRedo)?;
        *state = entry.after.clone();
        self.undo_stack.push(entry);
        Ok(self.undo_stack.last().map(|e| e.description.as_str()).unwrap_or_default())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.description.as_str())
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}
