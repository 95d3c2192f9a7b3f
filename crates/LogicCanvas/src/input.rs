//! # Input Protocol
//!
//! The events the host application feeds into [`crate::editor::Editor`]. The
//! host owns the window and the event loop; it translates whatever its
//! backend produces into these values and forwards them via
//! [`crate::editor::Editor::on_event`], alongside one
//! [`crate::editor::Editor::on_frame`] call per render tick with the
//! grid-snapped cursor.

use serde::{Deserialize, Serialize};

/// Mouse buttons the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    /// Commits: starts and finishes connections, erases in delete mode.
    Left,
    /// Cancels the in-progress action.
    Right,
}

/// Keyboard keys the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Toggles delete mode.
    Delete,
    /// Returns to idle, dropping any in-progress connection.
    Escape,
}

/// One input event, as seen by the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorEvent {
    MouseReleased(MouseButton),
    KeyPressed(Key),
}
