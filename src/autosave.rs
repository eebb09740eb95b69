//! Debounced autosave scheduling.
//!
//! Every committed mutation restarts the debounce clock; the save fires only
//! once input has quiesced for the debounce duration. The manager is a pure
//! clock: the editor polls [`AutoSaveManager::should_save`] from its tick and
//! performs the actual write, so at most one save request is ever in flight.
//!
//! A failed save keeps the dirty flag set but disarms the timer: retry
//! happens on the next mutation or an explicit manual save, never
//! automatically.

use std::time::Duration;
use web_time::Instant;

/// Manages autosave timing with debouncing.
#[derive(Debug)]
pub struct AutoSaveManager {
    /// Wait this long after the last change before saving.
    debounce_delay: Duration,

    /// Time of the last change, while the timer is armed.
    last_change: Option<Instant>,

    /// Whether the debounce timer is armed.
    pending: bool,

    /// Whether there are unsaved changes (survives a failed save).
    dirty: bool,

    /// Whether autosave is enabled.
    enabled: bool,
}

impl AutoSaveManager {
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            debounce_delay,
            last_change: None,
            pending: false,
            dirty: false,
            enabled: true,
        }
    }

    /// Record a mutation: marks unsaved changes and restarts the debounce
    /// timer, cancelling any earlier pending save.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.pending = true;
        self.last_change = Some(Instant::now());
        log::trace!("Auto-save: timer restarted");
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Check if the debounced save should fire now.
    pub fn should_save(&self) -> bool {
        if !self.enabled || !self.pending {
            return false;
        }
        let Some(last_change) = self.last_change else {
            return false;
        };
        last_change.elapsed() >= self.debounce_delay
    }

    /// Mark that a save completed successfully.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.pending = false;
        self.last_change = None;
        log::trace!("Auto-save: saved");
    }

    /// Mark that a save failed. Local changes are still unsaved (`dirty`
    /// stays set), but the timer disarms: the next mutation or a manual save
    /// retries.
    pub fn mark_save_failed(&mut self) {
        self.pending = false;
        self.last_change = None;
        log::trace!("Auto-save: save failed, awaiting explicit retry");
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all scheduling state. Used when navigating to another image: a
    /// pending save for the old image must never fire.
    pub fn reset(&mut self) {
        self.pending = false;
        self.dirty = false;
        self.last_change = None;
    }
}
