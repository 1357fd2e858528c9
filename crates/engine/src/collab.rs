//! Collaborator interfaces the editor calls out to.
//!
//! Each trait has a blanket implementation for closures of the matching shape,
//! so hosts and tests can pass a plain `FnMut`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gridedit_core::{CellKey, CellValue};

use crate::edit_buffer::EditRecord;

/// Initial values for a row the editor asks the host to create.
pub type NewRow = BTreeMap<String, CellValue>;

/// Identifies one row-creation request until it is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct RowTicket(pub u64);

impl fmt::Display for RowTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Answer from a [`RowCreator`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowCreation {
    /// Rows exist now; ids in request order.
    Created(Vec<String>),
    /// The host will call `GridEditor::acknowledge_rows` (or `reject_rows`) later.
    Pending,
    /// Nothing was created.
    Failed(String),
}

pub trait RowCreator {
    fn create_rows(&mut self, ticket: RowTicket, rows: &[NewRow]) -> RowCreation;
}

impl<F> RowCreator for F
where
    F: FnMut(RowTicket, &[NewRow]) -> RowCreation,
{
    fn create_rows(&mut self, ticket: RowTicket, rows: &[NewRow]) -> RowCreation {
        self(ticket, rows)
    }
}

pub trait SaveHandler {
    fn save(&mut self, entries: &BTreeMap<CellKey, EditRecord>) -> Result<(), String>;
}

impl<F> SaveHandler for F
where
    F: FnMut(&BTreeMap<CellKey, EditRecord>) -> Result<(), String>,
{
    fn save(&mut self, entries: &BTreeMap<CellKey, EditRecord>) -> Result<(), String> {
        self(entries)
    }
}

pub trait RowDeleter {
    fn delete_rows(&mut self, ids: &BTreeSet<String>) -> Result<(), String>;
}

impl<F> RowDeleter for F
where
    F: FnMut(&BTreeSet<String>) -> Result<(), String>,
{
    fn delete_rows(&mut self, ids: &BTreeSet<String>) -> Result<(), String> {
        self(ids)
    }
}

/// Host clipboard. `Err` means access was denied or the clipboard is unavailable.
pub trait ClipboardSource {
    fn read_text(&mut self) -> Result<String, String>;
}

impl<F> ClipboardSource for F
where
    F: FnMut() -> Result<String, String>,
{
    fn read_text(&mut self) -> Result<String, String> {
        self()
    }
}

/// Per-cell validator: `Some(message)` marks the value invalid.
///
/// Takes `&self` and never sees the editor, so it cannot start another commit.
pub trait CellValidator {
    fn validate(&self, row_id: &str, column_id: &str, value: &CellValue) -> Option<String>;
}

impl<F> CellValidator for F
where
    F: Fn(&str, &str, &CellValue) -> Option<String>,
{
    fn validate(&self, row_id: &str, column_id: &str, value: &CellValue) -> Option<String> {
        self(row_id, column_id, value)
    }
}
