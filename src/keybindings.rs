//! Keyboard shortcut configuration.
//!
//! Bindings map a [`Key`] plus modifier state to an [`EditorAction`]. The
//! defaults follow the original editor's surface (mode toggles, delete,
//! undo/redo, arrow navigation, save); bindings can be remapped by the host.

use crate::message::{EditorAction, Modifiers};

/// Physical key identifiers the editor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    BracketLeft,
    BracketRight,
    Delete,
    Backspace,
    Escape,
    Enter,
    Space,
}

/// Remappable keyboard shortcuts.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub mode_edit: Key,
    pub mode_draw: Key,
    pub delete: Key,
    pub cancel: Key,
    pub prev_image: Key,
    pub next_image: Key,
    pub bring_forward: Key,
    pub send_backward: Key,
    pub run_detection: Key,
    // Ctrl-modified bindings
    pub undo: Key,
    pub redo: Key,
    pub select_all: Key,
    pub save: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode_edit: Key::Q,
            mode_draw: Key::W,
            delete: Key::Delete,
            cancel: Key::Escape,
            prev_image: Key::ArrowLeft,
            next_image: Key::ArrowRight,
            bring_forward: Key::BracketRight,
            send_backward: Key::BracketLeft,
            run_detection: Key::R,
            undo: Key::Z,
            redo: Key::Y,
            select_all: Key::A,
            save: Key::S,
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a key press to an action, if bound.
    pub fn action_for(&self, key: Key, modifiers: Modifiers) -> Option<EditorAction> {
        if modifiers.ctrl {
            if key == self.undo {
                // Ctrl+Shift+Z is the conventional redo alias.
                return Some(if modifiers.shift {
                    EditorAction::Redo
                } else {
                    EditorAction::Undo
                });
            }
            if key == self.redo {
                return Some(EditorAction::Redo);
            }
            if key == self.select_all {
                return Some(EditorAction::SelectAll);
            }
            if key == self.save {
                return Some(EditorAction::Save);
            }
            return None;
        }

        if key == self.mode_edit {
            Some(EditorAction::SetEditMode)
        } else if key == self.mode_draw {
            Some(EditorAction::SetDrawMode)
        } else if key == self.delete || (key == Key::Backspace && self.delete == Key::Delete) {
            Some(EditorAction::DeleteSelected)
        } else if key == self.cancel {
            Some(EditorAction::Cancel)
        } else if key == self.prev_image {
            Some(EditorAction::PrevImage)
        } else if key == self.next_image {
            Some(EditorAction::NextImage)
        } else if key == self.bring_forward {
            Some(if modifiers.shift {
                EditorAction::BringToFront
            } else {
                EditorAction::BringForward
            })
        } else if key == self.send_backward {
            Some(if modifiers.shift {
                EditorAction::SendToBack
            } else {
                EditorAction::SendBackward
            })
        } else if key == self.run_detection {
            Some(EditorAction::RunDetection)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_keys() {
        let b = KeyBindings::new();
        assert_eq!(b.action_for(Key::Q, Modifiers::NONE), Some(EditorAction::SetEditMode));
        assert_eq!(b.action_for(Key::W, Modifiers::NONE), Some(EditorAction::SetDrawMode));
    }

    #[test]
    fn test_ctrl_combos() {
        let b = KeyBindings::new();
        assert_eq!(b.action_for(Key::Z, Modifiers::CTRL), Some(EditorAction::Undo));
        assert_eq!(b.action_for(Key::Z, Modifiers::CTRL_SHIFT), Some(EditorAction::Redo));
        assert_eq!(b.action_for(Key::Y, Modifiers::CTRL), Some(EditorAction::Redo));
        assert_eq!(b.action_for(Key::A, Modifiers::CTRL), Some(EditorAction::SelectAll));
        assert_eq!(b.action_for(Key::S, Modifiers::CTRL), Some(EditorAction::Save));
    }

    #[test]
    fn test_ctrl_does_not_leak_into_bare_bindings() {
        let b = KeyBindings::new();
        assert_eq!(b.action_for(Key::Q, Modifiers::CTRL), None);
        assert_eq!(b.action_for(Key::A, Modifiers::NONE), None);
    }

    #[test]
    fn test_shift_variants_of_z_order() {
        let b = KeyBindings::new();
        assert_eq!(
            b.action_for(Key::BracketRight, Modifiers::NONE),
            Some(EditorAction::BringForward)
        );
        assert_eq!(
            b.action_for(Key::BracketRight, Modifiers::SHIFT),
            Some(EditorAction::BringToFront)
        );
        assert_eq!(
            b.action_for(Key::BracketLeft, Modifiers::SHIFT),
            Some(EditorAction::SendToBack)
        );
    }

    #[test]
    fn test_backspace_aliases_delete() {
        let b = KeyBindings::new();
        assert_eq!(
            b.action_for(Key::Backspace, Modifiers::NONE),
            Some(EditorAction::DeleteSelected)
        );
    }

    #[test]
    fn test_remapping() {
        let mut b = KeyBindings::new();
        b.mode_draw = Key::D;
        assert_eq!(b.action_for(Key::D, Modifiers::NONE), Some(EditorAction::SetDrawMode));
        assert_eq!(b.action_for(Key::W, Modifiers::NONE), None);
    }
}
