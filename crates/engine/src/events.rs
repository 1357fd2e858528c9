//! Event types for editor change notifications.
//!
//! The editor queues these as it runs; the host drains them after each call
//! and translates them into focus changes, repaints and status updates.

use gridedit_core::CellKey;

use crate::collab::RowTicket;
use crate::mode::{CursorPlacement, EditMode};

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// Move input focus to a cell editor.
    RequestFocus { key: CellKey, cursor: CursorPlacement },

    /// The edit state machine changed mode.
    ModeChanged { from: EditMode, to: EditMode },

    /// Active cell or selected ranges changed.
    SelectionChanged,

    /// Dirty or validation state of these cells changed.
    CellsChanged { keys: Vec<CellKey> },

    /// New rows were requested from the row creator.
    RowsRequested { ticket: RowTicket, count: usize },

    /// New rows were appended to the section.
    RowsAdded { ids: Vec<String> },

    /// Rows left the section (deleted or removed externally).
    RowsRemoved { ids: Vec<String> },

    /// A save completed; this many cells were written.
    Saved { cells: usize },
}
