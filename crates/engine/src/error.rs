use std::fmt;

use gridedit_core::CellKey;

/// Errors surfaced by public editor operations. None of them leave the
/// editor in a partially-applied state.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Cells with validation errors block saving.
    Validation { count: usize },
    /// Row creation, deletion or save failed in a collaborator.
    Operation(String),
    /// Clipboard could not be read, or held nothing usable.
    ClipboardAccess(String),
    /// The target row or column no longer exists.
    StaleReference { key: CellKey },
    /// Direct commit to a column that cannot be edited.
    ReadOnlyColumn { column: String },
    /// A paste is still waiting for its rows to be created.
    Busy,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { count } => {
                let noun = if *count == 1 { "cell has" } else { "cells have" };
                write!(f, "{count} {noun} validation errors; fix them before saving")
            }
            Self::Operation(msg) => write!(f, "operation failed: {msg}"),
            Self::ClipboardAccess(msg) => write!(f, "clipboard unavailable: {msg}"),
            Self::StaleReference { key } => write!(f, "cell {key} no longer exists"),
            Self::ReadOnlyColumn { column } => write!(f, "column '{column}' is read-only"),
            Self::Busy => write!(f, "waiting for new rows from a previous paste"),
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            GridError::Validation { count: 1 }.to_string(),
            "1 cell has validation errors; fix them before saving"
        );
        assert_eq!(
            GridError::StaleReference { key: CellKey::new("r1", "qty") }.to_string(),
            "cell r1|qty no longer exists"
        );
        assert_eq!(
            GridError::ClipboardAccess("permission denied".into()).to_string(),
            "clipboard unavailable: permission denied"
        );
    }
}
