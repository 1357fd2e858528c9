//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-4     | Input            | Dataset / script / config read failures  |
//! | 10-19   | Edit             | Commit, paste and save outcomes          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for` or the relevant command

use gridedit_engine::GridError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed range or position.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-4)
// =============================================================================

/// A dataset, script, clipboard input or config file could not be read.
pub const EXIT_IO: u8 = 3;

/// A dataset, script or config file was read but is malformed.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Edit (10-19)
// =============================================================================

/// Save refused: cells still have validation errors.
pub const EXIT_EDIT_VALIDATION: u8 = 10;

/// A collaborator operation failed (row creation, deletion, save).
pub const EXIT_EDIT_OPERATION: u8 = 11;

/// A commit or paste referenced a row or column that does not exist.
pub const EXIT_EDIT_STALE: u8 = 12;

/// A commit targeted a read-only column.
pub const EXIT_EDIT_READ_ONLY: u8 = 13;

/// Clipboard input was unavailable.
pub const EXIT_EDIT_CLIPBOARD: u8 = 14;

/// Paste refused while an earlier paste waits for rows.
pub const EXIT_EDIT_BUSY: u8 = 15;

/// Map an editor error to its exit code.
pub fn exit_code_for(err: &GridError) -> u8 {
    match err {
        GridError::Validation { .. } => EXIT_EDIT_VALIDATION,
        GridError::Operation(_) => EXIT_EDIT_OPERATION,
        GridError::StaleReference { .. } => EXIT_EDIT_STALE,
        GridError::ReadOnlyColumn { .. } => EXIT_EDIT_READ_ONLY,
        GridError::ClipboardAccess(_) => EXIT_EDIT_CLIPBOARD,
        GridError::Busy => EXIT_EDIT_BUSY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridedit_core::CellKey;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_PARSE,
            EXIT_EDIT_VALIDATION,
            EXIT_EDIT_OPERATION,
            EXIT_EDIT_STALE,
            EXIT_EDIT_READ_ONLY,
            EXIT_EDIT_CLIPBOARD,
            EXIT_EDIT_BUSY,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_grid_error_mapping() {
        assert_eq!(exit_code_for(&GridError::Validation { count: 2 }), EXIT_EDIT_VALIDATION);
        assert_eq!(
            exit_code_for(&GridError::StaleReference { key: CellKey::new("r", "c") }),
            EXIT_EDIT_STALE
        );
        assert_eq!(exit_code_for(&GridError::Busy), EXIT_EDIT_BUSY);
    }
}
