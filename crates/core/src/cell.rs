//! Cell coordinates and identity.
//!
//! A [`CellPosition`] is a logical grid coordinate and changes whenever rows are
//! inserted or removed. A [`CellKey`] names a cell by row id and column id, so it
//! survives column reordering, resizing and row deletion elsewhere in the grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between row id and column id in the string form of a [`CellKey`].
pub const KEY_SEPARATOR: char = '|';

/// Logical grid coordinates (0-based), not pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for CellPosition {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Row and column counts of the loaded section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridBounds {
    pub rows: usize,
    pub cols: usize,
}

impl GridBounds {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// True when there is no addressable cell.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn contains(&self, pos: CellPosition) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Clip signed coordinates into `[0, rows-1] x [0, cols-1]`.
    /// Returns `None` for an empty grid.
    pub fn clamp(&self, row: isize, col: isize) -> Option<CellPosition> {
        if self.is_empty() {
            return None;
        }
        let row = row.clamp(0, self.rows as isize - 1) as usize;
        let col = col.clamp(0, self.cols as isize - 1) as usize;
        Some(CellPosition { row, col })
    }

    /// Move `pos` by a delta, clipped to the grid.
    pub fn offset(&self, pos: CellPosition, d_row: isize, d_col: isize) -> Option<CellPosition> {
        self.clamp(pos.row as isize + d_row, pos.col as isize + d_col)
    }
}

/// Stable, index-independent identity of a cell: `rowId + "|" + columnId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CellKey {
    row_id: String,
    column_id: String,
}

impl CellKey {
    pub fn new(row_id: impl Into<String>, column_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            column_id: column_id.into(),
        }
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    /// Parse the string form. The first separator splits row id from column id;
    /// row ids never contain it, column ids may.
    pub fn parse(raw: &str) -> Option<Self> {
        let (row_id, column_id) = raw.split_once(KEY_SEPARATOR)?;
        if row_id.is_empty() || column_id.is_empty() {
            return None;
        }
        Some(Self::new(row_id, column_id))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.row_id, KEY_SEPARATOR, self.column_id)
    }
}

impl From<CellKey> for String {
    fn from(key: CellKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CellKey {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        CellKey::parse(&raw).ok_or_else(|| format!("invalid cell key '{raw}'"))
    }
}
