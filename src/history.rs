//! Snapshot-based undo/redo history.
//!
//! The history is a bounded stack of serialized region-store snapshots. Two
//! states drive the component:
//!
//! - **Idle**: mutations may be recorded with [`HistoryManager::save`].
//! - **Restoring**: a snapshot is being applied to the live store. Any
//!   `save` call arriving in this state is silently dropped. This is the
//!   component's core correctness property: without the lock, a mutation
//!   observer reacting to the restore would record the restore itself as a
//!   fresh history entry and recurse.
//!
//! The stack always holds at least the baseline snapshot taken at image load
//! ([`HistoryManager::reset`]); undo never pops past it. A new `save` clears
//! the redo stack, so redo is only valid immediately after an undo.

use crate::constants::MAX_HISTORY_DEPTH;
use crate::region::RegionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryState {
    Idle,
    Restoring,
}

/// Bounded undo/redo stack over [`RegionStore`] snapshots.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    state: HistoryState,
    max_depth: usize,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            state: HistoryState::Idle,
            max_depth,
        }
    }

    /// True while a snapshot is being applied to the live store.
    pub fn is_restoring(&self) -> bool {
        self.state == HistoryState::Restoring
    }

    /// Undo requires more than the baseline snapshot.
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of retained undo snapshots (including the baseline).
    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Record the store's current state as a new history entry.
    ///
    /// Dropped silently while Restoring. Clears the redo stack (branching
    /// history is not supported) and evicts the oldest entry when the stack
    /// exceeds its depth bound. Returns whether a snapshot was pushed.
    pub fn save(&mut self, store: &RegionStore) -> bool {
        if self.is_restoring() {
            log::trace!("History: save suppressed during restore");
            return false;
        }
        let snapshot = match store.snapshot() {
            Ok(s) => s,
            Err(e) => {
                log::error!("History: snapshot failed: {}", e);
                return false;
            }
        };
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        log::debug!("History: saved snapshot (depth {})", self.undo_stack.len());
        true
    }

    /// Restore the previous snapshot into `store`.
    ///
    /// Only valid in Idle with more than the baseline on the stack. The
    /// popped entry moves to the redo stack. Returns whether anything was
    /// undone.
    pub fn undo(&mut self, store: &mut RegionStore) -> bool {
        if self.is_restoring() || !self.can_undo() {
            return false;
        }
        self.state = HistoryState::Restoring;
        // The top entry is the current state; the one below is the target.
        let current = self.undo_stack.pop().unwrap_or_default();
        let target = self.undo_stack.last().cloned().unwrap_or_default();
        let ok = match store.restore(&target) {
            Ok(()) => {
                self.redo_stack.push(current);
                log::debug!("History: undo (depth {})", self.undo_stack.len());
                true
            }
            Err(e) => {
                log::error!("History: undo restore failed: {}", e);
                self.undo_stack.push(current);
                false
            }
        };
        self.state = HistoryState::Idle;
        ok
    }

    /// Re-apply the most recently undone snapshot into `store`.
    pub fn redo(&mut self, store: &mut RegionStore) -> bool {
        if self.is_restoring() || !self.can_redo() {
            return false;
        }
        self.state = HistoryState::Restoring;
        let target = self.redo_stack.pop().unwrap_or_default();
        let ok = match store.restore(&target) {
            Ok(()) => {
                self.undo_stack.push(target);
                log::debug!("History: redo (depth {})", self.undo_stack.len());
                true
            }
            Err(e) => {
                log::error!("History: redo restore failed: {}", e);
                self.redo_stack.push(target);
                false
            }
        };
        self.state = HistoryState::Idle;
        ok
    }

    /// Clear both stacks and take a fresh baseline from `store`. Called on
    /// image load, after the viewport transform is established.
    pub fn reset(&mut self, store: &RegionStore) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = HistoryState::Idle;
        match store.snapshot() {
            Ok(s) => self.undo_stack.push(s),
            Err(e) => log::error!("History: baseline snapshot failed: {}", e),
        }
        log::debug!("History: reset to baseline");
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}
