use crate::cell::{CellPosition, GridBounds};
use serde::{Deserialize, Serialize};

/// A rectangular range of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    /// Create a new range, automatically normalizing so start <= end.
    pub fn new(r1: usize, c1: usize, r2: usize, c2: usize) -> Self {
        Self {
            start_row: r1.min(r2),
            start_col: c1.min(c2),
            end_row: r1.max(r2),
            end_col: c1.max(c2),
        }
    }

    /// Create a single-cell range.
    pub fn single(row: usize, col: usize) -> Self {
        Self {
            start_row: row,
            start_col: col,
            end_row: row,
            end_col: col,
        }
    }

    /// Range spanning two corner cells, in either order.
    pub fn spanning(a: CellPosition, b: CellPosition) -> Self {
        Self::new(a.row, a.col, b.row, b.col)
    }

    pub fn top_left(&self) -> CellPosition {
        CellPosition::new(self.start_row, self.start_col)
    }

    pub fn bottom_right(&self) -> CellPosition {
        CellPosition::new(self.end_row, self.end_col)
    }

    /// Check if this range contains a cell.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row &&
        col >= self.start_col && col <= self.end_col
    }

    pub fn rows(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn cols(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    /// Number of cells in this range.
    pub fn cell_count(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Iterate over all cells in this range (row-major order).
    pub fn cells(&self) -> impl Iterator<Item = CellPosition> {
        let start_row = self.start_row;
        let end_row = self.end_row;
        let start_col = self.start_col;
        let end_col = self.end_col;

        (start_row..=end_row).flat_map(move |r| {
            (start_col..=end_col).map(move |c| CellPosition::new(r, c))
        })
    }

    /// Check if this is a single cell.
    pub fn is_single(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &CellRange) -> CellRange {
        CellRange {
            start_row: self.start_row.min(other.start_row),
            start_col: self.start_col.min(other.start_col),
            end_row: self.end_row.max(other.end_row),
            end_col: self.end_col.max(other.end_col),
        }
    }

    /// Clip to the grid. `None` if the grid is empty.
    pub fn clipped(&self, bounds: GridBounds) -> Option<CellRange> {
        let a = bounds.clamp(self.start_row as isize, self.start_col as isize)?;
        let b = bounds.clamp(self.end_row as isize, self.end_col as isize)?;
        Some(CellRange::spanning(a, b))
    }
}

/// The selection model: ordered list of ranges, one of which is the anchor
/// range that drag and keyboard extension act on.
///
/// A selection over an empty grid holds no ranges.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ranges: Vec<CellRange>,
    active_range: usize,
    anchor: CellPosition,
    dragging: bool,
}

impl Selection {
    /// Create a new selection with a single cell.
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            ranges: vec![CellRange::single(row, col)],
            active_range: 0,
            anchor: CellPosition::new(row, col),
            dragging: false,
        }
    }

    /// A selection with no ranges (empty grid).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Drop every range.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.active_range = 0;
        self.anchor = CellPosition::default();
        self.dragging = false;
    }

    /// Get the anchor cell (for extending selections).
    pub fn anchor(&self) -> CellPosition {
        self.anchor
    }

    /// The range drag and keyboard extension act on.
    pub fn primary_range(&self) -> Option<CellRange> {
        self.ranges.get(self.active_range).copied()
    }

    /// Get all ranges.
    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    /// Smallest range covering every selected range.
    pub fn bounding_box(&self) -> Option<CellRange> {
        let mut iter = self.ranges.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(r)))
    }

    /// Check if a cell is selected.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(row, col))
    }

    /// Check if selection is a single cell.
    pub fn is_single_cell(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_single()
    }

    /// More than one cell selected, across all ranges.
    pub fn is_multi_cell(&self) -> bool {
        self.ranges.len() > 1 || self.ranges.first().map_or(false, |r| !r.is_single())
    }

    /// Total number of selected cells (overlaps counted once per range).
    pub fn cell_count(&self) -> usize {
        self.ranges.iter().map(|r| r.cell_count()).sum()
    }

    /// Every selected cell once, row-major, even when ranges overlap.
    pub fn unique_cells(&self) -> Vec<CellPosition> {
        let mut cells: Vec<CellPosition> = self.ranges.iter().flat_map(|r| r.cells()).collect();
        cells.sort();
        cells.dedup();
        cells
    }

    /// Begin a new single-cell range. Additive keeps the existing ranges (ctrl+click).
    pub fn start_range(&mut self, row: usize, col: usize, additive: bool) {
        if additive && !self.ranges.is_empty() {
            self.ranges.push(CellRange::single(row, col));
            self.active_range = self.ranges.len() - 1;
        } else {
            self.ranges = vec![CellRange::single(row, col)];
            self.active_range = 0;
        }
        self.anchor = CellPosition::new(row, col);
    }

    /// Set selection to a single cell (click).
    pub fn select_cell(&mut self, row: usize, col: usize) {
        self.start_range(row, col, false);
    }

    /// Extend the active range from anchor to the given cell (shift+click/arrow).
    /// Coordinates are clipped to the grid.
    pub fn extend_to(&mut self, row: usize, col: usize, bounds: GridBounds) {
        let Some(target) = bounds.clamp(row as isize, col as isize) else {
            return;
        };
        if self.ranges.is_empty() {
            self.select_cell(target.row, target.col);
            return;
        }
        self.ranges[self.active_range] = CellRange::spanning(self.anchor, target);
    }

    /// Extend selection by delta from current extent.
    pub fn extend_by(&mut self, d_row: isize, d_col: isize, bounds: GridBounds) {
        let Some(range) = self.primary_range() else {
            return;
        };

        // The corner opposite the anchor is the one that moves
        let current_row = if self.anchor.row == range.start_row { range.end_row } else { range.start_row };
        let current_col = if self.anchor.col == range.start_col { range.end_col } else { range.start_col };

        let new_row = current_row as isize + d_row;
        let new_col = current_col as isize + d_col;
        if let Some(target) = bounds.clamp(new_row, new_col) {
            self.ranges[self.active_range] = CellRange::spanning(self.anchor, target);
        }
    }

    /// Replace the selection with one range covering everything.
    pub fn select_all(&mut self, rows: usize, cols: usize) {
        if rows == 0 || cols == 0 {
            self.clear();
            return;
        }
        self.ranges = vec![CellRange::new(0, 0, rows - 1, cols - 1)];
        self.active_range = 0;
        self.anchor = CellPosition::new(0, 0);
    }

    /// Widen the active range to entire rows.
    pub fn select_entire_rows(&mut self, bounds: GridBounds) {
        let Some(range) = self.primary_range() else { return };
        if bounds.is_empty() {
            return;
        }
        self.ranges[self.active_range] = CellRange::new(range.start_row, 0, range.end_row, bounds.cols - 1);
        // Keep anchor at start of row
        self.anchor = CellPosition::new(range.start_row, 0);
    }

    /// Widen the active range to entire columns.
    pub fn select_entire_columns(&mut self, bounds: GridBounds) {
        let Some(range) = self.primary_range() else { return };
        if bounds.is_empty() {
            return;
        }
        self.ranges[self.active_range] = CellRange::new(0, range.start_col, bounds.rows - 1, range.end_col);
        // Keep anchor at top of column
        self.anchor = CellPosition::new(0, range.start_col);
    }

    // =========================================================================
    // Pointer drag
    // =========================================================================

    /// Primary button pressed on a cell.
    pub fn pointer_down(&mut self, row: usize, col: usize, additive: bool) {
        self.start_range(row, col, additive);
        self.begin_drag();
    }

    /// Start tracking a drag from the current anchor range.
    pub fn begin_drag(&mut self) {
        self.dragging = !self.ranges.is_empty();
    }

    /// Pointer moved over a cell. Only extends while a drag started by
    /// `pointer_down` is in progress and the button is still held.
    /// Returns true if the selection changed.
    pub fn pointer_move(&mut self, row: usize, col: usize, button_held: bool, bounds: GridBounds) -> bool {
        if !button_held {
            // Button released outside our view: the drag is over
            self.dragging = false;
            return false;
        }
        if !self.dragging {
            return false;
        }
        let before = self.primary_range();
        self.extend_to(row, col, bounds);
        before != self.primary_range()
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Clip every range to the grid after rows or columns disappear.
    pub fn clamp_to(&mut self, bounds: GridBounds) {
        if bounds.is_empty() {
            self.clear();
            return;
        }
        for range in &mut self.ranges {
            if let Some(clipped) = range.clipped(bounds) {
                *range = clipped;
            }
        }
        self.ranges.dedup();
        if self.active_range >= self.ranges.len() {
            self.active_range = self.ranges.len().saturating_sub(1);
        }
        if let Some(anchor) = bounds.clamp(self.anchor.row as isize, self.anchor.col as isize) {
            self.anchor = anchor;
        }
    }
}
