//! Input events and editor actions.
//!
//! The host shell translates raw toolkit events into [`EditorEvent`]s and
//! feeds them to the editor; keyboard shortcuts resolve to [`EditorAction`]s
//! through [`crate::keybindings::KeyBindings`].

use crate::geometry::Point;

/// Editor interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Selection and manipulation enabled; drawing disabled.
    #[default]
    Edit,
    /// Click-to-place polygon drawing; selection disabled.
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Keyboard modifier state accompanying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
    };
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
    };
    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        shift: true,
    };
}

/// A pointer event in viewport coordinates of the main panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorEvent {
    PointerDown {
        pos: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    PointerMove {
        pos: Point,
    },
    PointerUp {
        button: MouseButton,
    },
    /// Wheel scroll; positive `delta` zooms in.
    Wheel {
        pos: Point,
        delta: f32,
    },
}

/// Semantic commands bound to keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    SetEditMode,
    SetDrawMode,
    DeleteSelected,
    SelectAll,
    Undo,
    Redo,
    Save,
    Cancel,
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,
    PrevImage,
    NextImage,
    RunDetection,
}
