//! Clipboard engine: tab/newline delimited text to and from a 2-D grid.
//!
//! Format: rows separated by a line terminator, cells by a single tab. A
//! single trailing line terminator is ignored. Embedded tabs and newlines are
//! not escaped, so a field containing either will misalign on paste.

use serde::Serialize;

use gridedit_core::{CellPosition, CellRange};

use crate::collab::RowTicket;

/// Rectangular grid of raw cell strings, row-major.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipboardPayload {
    cells: Vec<Vec<String>>,
    cols: usize,
}

impl ClipboardPayload {
    /// Build from rows, padding ragged rows with empty cells.
    pub fn from_rows(mut cells: Vec<Vec<String>>) -> Self {
        let cols = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize(cols, String::new());
        }
        if cols == 0 {
            cells.clear();
        }
        Self { cells, cols }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_single_cell(&self) -> bool {
        self.rows() == 1 && self.cols == 1
    }

    /// Every cell with its offset from the top-left.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, v.as_str())))
    }
}

/// Normalize line endings: CR LF and lone CR both become LF.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse delimited text. Empty text gives an empty payload.
pub fn parse(text: &str) -> ClipboardPayload {
    let text = normalize_line_endings(text);
    if text.is_empty() {
        return ClipboardPayload::default();
    }
    let body = text.strip_suffix('\n').unwrap_or(&text);
    let rows = body
        .split('\n')
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect();
    ClipboardPayload::from_rows(rows)
}

/// Serialize one range using `display` for each cell's text.
pub fn serialize(range: CellRange, line_terminator: &str, display: impl Fn(CellPosition) -> String) -> String {
    let mut out = String::new();
    for row in range.start_row..=range.end_row {
        if row > range.start_row {
            out.push_str(line_terminator);
        }
        for col in range.start_col..=range.end_col {
            if col > range.start_col {
                out.push('\t');
            }
            out.push_str(&display(CellPosition::new(row, col)));
        }
    }
    out
}

/// Text inserted into an open cell editor: first line only, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Rows that must be created before a paste of `payload_rows` rows at
/// `anchor_row` fits in `row_count` existing rows.
pub fn rows_needed(anchor_row: usize, payload_rows: usize, row_count: usize) -> usize {
    (anchor_row + payload_rows).saturating_sub(row_count)
}

/// Outcome counts reported to the user after a paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PasteSummary {
    #[serde(rename = "cellsApplied")]
    pub cells_applied: usize,
    #[serde(rename = "cellsSkipped")]
    pub cells_skipped: usize,
    #[serde(rename = "rowsCreated")]
    pub rows_created: usize,
}

impl PasteSummary {
    /// Short status-bar text.
    pub fn status_text(&self) -> String {
        let mut text = format!("Pasted {} cell{}", self.cells_applied, if self.cells_applied == 1 { "" } else { "s" });
        if self.rows_created > 0 {
            text.push_str(&format!(", added {} row{}", self.rows_created, if self.rows_created == 1 { "" } else { "s" }));
        }
        if self.cells_skipped > 0 {
            text.push_str(&format!(" ({} skipped)", self.cells_skipped));
        }
        text
    }
}

/// What a paste call did.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteOutcome {
    /// Cells were applied now.
    Applied(PasteSummary),
    /// Waiting for the row creator to acknowledge this ticket.
    Pending(RowTicket),
    /// A cell editor was open; text went into its draft.
    IntoEditor { inserted: String },
}

impl PasteOutcome {
    pub fn summary(&self) -> Option<&PasteSummary> {
        match self {
            PasteOutcome::Applied(summary) => Some(summary),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_single_trailing_newline() {
        let payload = parse("a\tb\nc\td\n");
        assert_eq!(payload.rows(), 2);
        assert_eq!(payload.cols(), 2);
        assert_eq!(payload.get(1, 1), Some("d"));

        // Only one trailing line is dropped
        let payload = parse("a\n\n");
        assert_eq!(payload.rows(), 2);
        assert_eq!(payload.get(1, 0), Some(""));
    }

    #[test]
    fn test_parse_pads_ragged_rows() {
        let payload = parse("1\t2\t3\n4\n5\t6");
        assert_eq!(payload.cols(), 3);
        assert_eq!(payload.get(1, 0), Some("4"));
        assert_eq!(payload.get(1, 2), Some(""));
        assert_eq!(payload.get(2, 2), Some(""));
    }

    #[test]
    fn test_parse_crlf() {
        let payload = parse("a\tb\r\nc\td\r\n");
        assert_eq!(payload.rows(), 2);
        assert_eq!(payload.get(0, 1), Some("b"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
        let single = parse("x");
        assert!(single.is_single_cell());
        // A lone newline is one empty cell
        assert!(parse("\n").is_single_cell());
    }

    #[test]
    fn test_serialize_range() {
        let range = CellRange::new(1, 1, 2, 2);
        let text = serialize(range, "\n", |p| format!("{}{}", p.row, p.col));
        assert_eq!(text, "11\t12\n21\t22");
        let text = serialize(range, "\r\n", |p| format!("{}{}", p.row, p.col));
        assert_eq!(text, "11\t12\r\n21\t22");
    }

    #[test]
    fn test_rows_needed() {
        assert_eq!(rows_needed(2, 5, 3), 4);
        assert_eq!(rows_needed(0, 2, 3), 0);
        assert_eq!(rows_needed(3, 1, 3), 1);
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("  abc \nsecond"), "abc");
        assert_eq!(first_line("x\ty"), "x\ty");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_summary_status_text() {
        let summary = PasteSummary { cells_applied: 10, cells_skipped: 2, rows_created: 4 };
        assert_eq!(summary.status_text(), "Pasted 10 cells, added 4 rows (2 skipped)");
        assert_eq!(PasteSummary { cells_applied: 1, ..Default::default() }.status_text(), "Pasted 1 cell");
    }
}
