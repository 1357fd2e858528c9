//! The grid editor: owns the section's data and routes every user action
//! through the navigation state machine, the commit pipeline and the
//! clipboard engine.
//!
//! Direct edits and paste share [`GridEditor::commit`]'s pipeline, so dirty
//! accounting and validation happen in exactly one place.

use std::collections::{BTreeSet, HashSet};

use gridedit_config::EditorSettings;
use gridedit_core::{
    CellKey, CellPosition, CellValue, ColumnDescriptor, DisplayOptions, GridBounds, RowRecord, RowStore,
    Selection,
};

use crate::clipboard::{self, ClipboardPayload, PasteOutcome, PasteSummary};
use crate::collab::{
    CellValidator, ClipboardSource, NewRow, RowCreation, RowCreator, RowDeleter, RowTicket, SaveHandler,
};
use crate::edit_buffer::{CommitOutcome, EditBuffer};
use crate::error::GridError;
use crate::events::GridEvent;
use crate::mode::{CursorPlacement, EditMode};
use crate::navigation::{Modifiers, NavContext, NavEffect, NavEvent, NavigationController};
use crate::validation::ValidationGateway;

/// Display options derived from user settings.
pub fn display_options(settings: &EditorSettings) -> DisplayOptions {
    DisplayOptions {
        group_thousands: settings.group_thousands,
        date_format: settings.date_format.clone(),
    }
}

/// A row-creation request waiting for the host.
#[derive(Debug)]
struct PendingRows {
    ticket: RowTicket,
    count: usize,
    purpose: PendingPurpose,
}

#[derive(Debug)]
enum PendingPurpose {
    /// Paste deferred until the rows exist. `targets` holds the ids of the
    /// existing rows the payload covers, captured when the paste started.
    Paste { payload: ClipboardPayload, anchor_col: usize, targets: Vec<Option<String>> },
    /// Explicit add-rows request.
    Add,
}

/// Current value of a cell: the buffered edit if dirty, else the stored value.
fn current_value<'a>(
    rows: &'a RowStore,
    columns: &'a [ColumnDescriptor],
    edits: &'a EditBuffer,
    pos: CellPosition,
) -> Option<(&'a ColumnDescriptor, &'a CellValue)> {
    let row = rows.get(pos.row)?;
    let column = columns.get(pos.col)?;
    let key = CellKey::new(row.id.as_str(), column.id.as_str());
    let value = match edits.get(&key) {
        Some(record) => &record.current_value,
        None => row.value(&column.id),
    };
    Some((column, value))
}

pub struct GridEditor {
    columns: Vec<ColumnDescriptor>,
    rows: RowStore,
    selection: Selection,
    nav: NavigationController,
    edits: EditBuffer,
    validation: ValidationGateway,
    settings: EditorSettings,
    display: DisplayOptions,

    row_creator: Option<Box<dyn RowCreator>>,
    saver: Option<Box<dyn SaveHandler>>,
    deleter: Option<Box<dyn RowDeleter>>,
    pending: Option<PendingRows>,
    next_ticket: u64,

    pub status_message: Option<String>,
    changed: Vec<CellKey>,
    events: Vec<GridEvent>,
}

impl GridEditor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<RowRecord>, settings: EditorSettings) -> Self {
        let mut editor = Self {
            columns: Vec::new(),
            rows: RowStore::default(),
            selection: Selection::empty(),
            nav: NavigationController::new(),
            edits: EditBuffer::new(),
            validation: ValidationGateway::new(),
            display: display_options(&settings),
            settings,
            row_creator: None,
            saver: None,
            deleter: None,
            pending: None,
            next_ticket: 1,
            status_message: None,
            changed: Vec::new(),
            events: Vec::new(),
        };
        editor.load_section(columns, rows);
        editor
    }

    // =========================================================================
    // Collaborators and settings
    // =========================================================================

    pub fn set_validator(&mut self, validator: Box<dyn CellValidator>) {
        self.validation.set_validator(Some(validator));
    }

    pub fn set_row_creator(&mut self, creator: Box<dyn RowCreator>) {
        self.row_creator = Some(creator);
    }

    pub fn set_save_handler(&mut self, saver: Box<dyn SaveHandler>) {
        self.saver = Some(saver);
    }

    pub fn set_row_deleter(&mut self, deleter: Box<dyn RowDeleter>) {
        self.deleter = Some(deleter);
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.display = display_options(&settings);
        self.settings = settings;
    }

    // =========================================================================
    // Section lifecycle
    // =========================================================================

    /// Replace the section's columns and rows. Edits, errors, any open editor
    /// and any pending row request are dropped.
    pub fn load_section(&mut self, columns: Vec<ColumnDescriptor>, rows: Vec<RowRecord>) {
        self.columns = columns;
        self.rows = RowStore::new(rows);
        self.edits.clear();
        self.validation.clear();
        self.pending = None;
        self.changed.clear();
        self.events.clear();
        self.status_message = None;

        let bounds = self.bounds();
        self.nav.reset(bounds);
        self.selection = match self.nav.active() {
            Some(pos) => Selection::new(pos.row, pos.col),
            None => Selection::empty(),
        };
        log::info!("loaded section: {} rows x {} columns", bounds.rows, bounds.cols);
        self.events.push(GridEvent::SelectionChanged);
    }

    /// Swap the column set. Edits and errors for columns that no longer
    /// exist are dropped.
    pub fn set_columns(&mut self, columns: Vec<ColumnDescriptor>) {
        let mode_before = self.nav.mode();
        self.columns = columns;
        let live: HashSet<&str> = self.columns.iter().map(|c| c.id.as_str()).collect();
        let mut stale = self.edits.retain(|k| live.contains(k.column_id()));
        stale.extend(self.validation.retain(|k| live.contains(k.column_id())));
        if !stale.is_empty() {
            log::warn!("dropped {} edits for removed columns", stale.len());
            self.changed.extend(stale);
        }
        self.after_shape_change(mode_before);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.rows.len(), self.columns.len())
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> EditMode {
        self.nav.mode()
    }

    pub fn active_cell(&self) -> Option<CellPosition> {
        self.nav.active()
    }

    /// Text in the open cell editor.
    pub fn draft(&self) -> &str {
        self.nav.draft()
    }

    pub fn edits(&self) -> &EditBuffer {
        &self.edits
    }

    pub fn dirty_count(&self) -> usize {
        self.edits.len()
    }

    pub fn is_dirty(&self, row_id: &str, column_id: &str) -> bool {
        self.edits.contains(&CellKey::new(row_id, column_id))
    }

    pub fn error_for(&self, row_id: &str, column_id: &str) -> Option<&str> {
        self.validation.error_for(&CellKey::new(row_id, column_id))
    }

    pub fn error_count(&self) -> usize {
        self.validation.len()
    }

    pub fn validation(&self) -> &ValidationGateway {
        &self.validation
    }

    /// Ticket of the row request still waiting for the host, if any.
    pub fn pending_ticket(&self) -> Option<RowTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub fn key_at(&self, pos: CellPosition) -> Option<CellKey> {
        let row = self.rows.get(pos.row)?;
        let column = self.columns.get(pos.col)?;
        Some(CellKey::new(row.id.as_str(), column.id.as_str()))
    }

    pub fn position_of(&self, key: &CellKey) -> Option<CellPosition> {
        let row = self.rows.position(key.row_id())?;
        let col = self.columns.iter().position(|c| c.id == key.column_id())?;
        Some(CellPosition::new(row, col))
    }

    /// Current value (buffered edit or stored) at a position.
    pub fn value_at(&self, pos: CellPosition) -> Option<&CellValue> {
        current_value(&self.rows, &self.columns, &self.edits, pos).map(|(_, v)| v)
    }

    /// Display string for a cell, formatted by its column's data type.
    pub fn display_value(&self, row: usize, col: usize) -> String {
        match current_value(&self.rows, &self.columns, &self.edits, CellPosition::new(row, col)) {
            Some((column, value)) => column.format(value, &self.display),
            None => String::new(),
        }
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Feed one input event through the state machine and apply its effects.
    pub fn handle(&mut self, event: NavEvent) {
        let mode_before = self.nav.mode();
        let bounds = self.bounds();
        let effects = {
            let (rows, columns, edits) = (&self.rows, &self.columns, &self.edits);
            let cell_text = move |pos: CellPosition| match current_value(rows, columns, edits, pos) {
                Some((column, value)) => column.edit_text(value),
                None => String::new(),
            };
            let ctx = NavContext {
                bounds,
                columns: &self.columns,
                page_rows: self.settings.page_rows,
                wrap_tab: self.settings.wrap_tab,
                cell_text: &cell_text,
            };
            self.nav.handle(&event, &ctx)
        };

        for effect in effects {
            self.apply_effect(effect, bounds);
        }
        self.note_mode_change(mode_before);
        self.flush_changed();
    }

    fn apply_effect(&mut self, effect: NavEffect, bounds: GridBounds) {
        match effect {
            NavEffect::Select(pos) => {
                self.selection.select_cell(pos.row, pos.col);
                self.events.push(GridEvent::SelectionChanged);
            }
            NavEffect::Extend(pos) => {
                self.selection.extend_to(pos.row, pos.col, bounds);
                self.events.push(GridEvent::SelectionChanged);
            }
            NavEffect::ExtendBy { d_row, d_col } => {
                self.selection.extend_by(d_row, d_col, bounds);
                self.events.push(GridEvent::SelectionChanged);
            }
            NavEffect::AddRange(pos) => {
                self.selection.start_range(pos.row, pos.col, true);
                self.events.push(GridEvent::SelectionChanged);
            }
            NavEffect::SelectAll => {
                self.selection.select_all(bounds.rows, bounds.cols);
                self.events.push(GridEvent::SelectionChanged);
            }
            NavEffect::BeginEdit { position, cursor } => {
                self.status_message = None;
                if let Some(key) = self.key_at(position) {
                    self.events.push(GridEvent::RequestFocus { key, cursor });
                }
            }
            NavEffect::Commit { position, value } => self.commit_text(position, &value),
            NavEffect::Discard { position } => {
                log::debug!("discarded edit at ({}, {})", position.row, position.col);
            }
            NavEffect::ClearSelection => {
                let cleared = self.clear_cells(self.selection.unique_cells());
                if cleared > 0 {
                    self.status_message = Some(format!("Cleared {cleared} cell{}", if cleared == 1 { "" } else { "s" }));
                }
            }
            NavEffect::ReadOnly(position) => {
                let name = self.columns.get(position.col).map_or("", |c| c.display_name.as_str());
                self.status_message = Some(format!("Column '{name}' is read-only"));
            }
        }
    }

    /// Primary button pressed on a cell; starts a drag unless extending.
    pub fn pointer_down(&mut self, row: usize, col: usize, mods: Modifiers) {
        self.handle(NavEvent::Activate { position: CellPosition::new(row, col), mods });
        if !mods.shift && self.nav.mode().is_selection() {
            self.selection.begin_drag();
        }
    }

    /// Pointer moved over a cell. Only a drag with the button held extends.
    pub fn pointer_move(&mut self, row: usize, col: usize, button_held: bool) -> bool {
        let changed = self.selection.pointer_move(row, col, button_held, self.bounds());
        if changed {
            self.events.push(GridEvent::SelectionChanged);
        }
        changed
    }

    pub fn pointer_up(&mut self) {
        self.selection.pointer_up();
    }

    pub fn select_entire_rows(&mut self) {
        self.selection.select_entire_rows(self.bounds());
        self.events.push(GridEvent::SelectionChanged);
    }

    pub fn select_entire_columns(&mut self) {
        self.selection.select_entire_columns(self.bounds());
        self.events.push(GridEvent::SelectionChanged);
    }

    /// Jump to the next cell (row-major, wrapping) that has a validation
    /// error and open it for editing with its whole content selected.
    pub fn focus_next_invalid(&mut self) -> Option<CellKey> {
        let mode_before = self.nav.mode();
        self.take_and_commit_pending();

        let mut invalid: Vec<(CellPosition, CellKey)> = self
            .validation
            .iter()
            .filter_map(|(key, _)| self.position_of(key).map(|pos| (pos, key.clone())))
            .collect();
        invalid.sort();

        let current = self.nav.active();
        let Some((pos, key)) = invalid
            .iter()
            .find(|(pos, _)| current.map_or(true, |c| *pos > c))
            .or_else(|| invalid.first())
            .cloned()
        else {
            self.note_mode_change(mode_before);
            self.flush_changed();
            return None;
        };

        let draft = match current_value(&self.rows, &self.columns, &self.edits, pos) {
            Some((column, value)) => column.edit_text(value),
            None => String::new(),
        };
        self.selection.select_cell(pos.row, pos.col);
        self.events.push(GridEvent::SelectionChanged);
        if self.columns.get(pos.col).is_some_and(|c| c.is_editable()) {
            self.nav.open_editor(pos, draft);
            self.events.push(GridEvent::RequestFocus { key: key.clone(), cursor: CursorPlacement::All });
        } else {
            self.nav.set_active(Some(pos));
        }
        self.note_mode_change(mode_before);
        self.flush_changed();
        Some(key)
    }

    // =========================================================================
    // Commit pipeline
    // =========================================================================

    /// Record `value` for one cell. Returns true if a change was recorded
    /// (false when the value matches the cell's baseline).
    pub fn commit(&mut self, row_id: &str, column_id: &str, value: CellValue) -> Result<bool, GridError> {
        let outcome = self.commit_value(row_id, column_id, value);
        self.flush_changed();
        outcome.map(|o| o.is_recorded())
    }

    fn commit_value(&mut self, row_id: &str, column_id: &str, value: CellValue) -> Result<CommitOutcome, GridError> {
        let key = CellKey::new(row_id, column_id);
        let Some(column) = self.columns.iter().find(|c| c.id == column_id) else {
            return Err(GridError::StaleReference { key });
        };
        let Some(row) = self.rows.by_id(row_id) else {
            return Err(GridError::StaleReference { key });
        };
        if !column.is_editable() {
            return Err(GridError::ReadOnlyColumn { column: column.id.clone() });
        }

        let value = column.resolve_value(value);
        let baseline = self.edits.baseline(&key, row.value(column_id)).clone();
        let outcome = self.edits.record(key.clone(), column, baseline, value);

        let had_error = match outcome {
            CommitOutcome::Recorded => {
                let current = self.edits.get(&key).map(|r| r.current_value.clone()).unwrap_or_default();
                self.validation.check(&key, &current);
                false
            }
            CommitOutcome::Reverted | CommitOutcome::Unchanged => self.validation.clear_key(&key),
        };

        log::debug!("commit {key}: {outcome:?}");
        if outcome.touched() || had_error {
            self.changed.push(key);
        }
        Ok(outcome)
    }

    /// Commit an editor's text for the cell at `pos`.
    fn commit_text(&mut self, pos: CellPosition, text: &str) {
        let Some(key) = self.key_at(pos) else {
            log::warn!("commit target ({}, {}) no longer exists", pos.row, pos.col);
            return;
        };
        let value = match self.columns.get(pos.col) {
            Some(column) => column.parse(text),
            None => return,
        };
        if let Err(err) = self.commit_value(key.row_id(), key.column_id(), value) {
            log::warn!("commit failed: {err}");
            self.status_message = Some(err.to_string());
        }
    }

    /// Commit the open editor's text in place, without moving.
    pub fn commit_pending_edit(&mut self) {
        let mode_before = self.nav.mode();
        self.take_and_commit_pending();
        self.note_mode_change(mode_before);
        self.flush_changed();
    }

    /// Commit the open editor's draft without flushing; the caller flushes once.
    fn take_and_commit_pending(&mut self) {
        if let Some((pos, draft)) = self.nav.take_pending() {
            self.commit_text(pos, &draft);
        }
    }

    /// Drop the open editor's text. Edits already committed stay.
    pub fn cancel_edit(&mut self) -> bool {
        let mode_before = self.nav.mode();
        let cancelled = self.nav.cancel().is_some();
        self.note_mode_change(mode_before);
        cancelled
    }

    /// Throw away every uncommitted change: the open editor, all dirty cells
    /// and all validation errors. Returns how many dirty cells were reverted.
    pub fn revert_all(&mut self) -> usize {
        self.cancel_edit();
        let reverted = self.edits.clear();
        let count = reverted.len();
        self.changed.extend(reverted);
        self.changed.extend(self.validation.clear());
        self.flush_changed();
        // A paste still waiting for rows belongs to the batch being cancelled.
        let dropped = self.pending.take();
        if let Some(pending) = &dropped {
            log::info!("dropped row request {} on revert", pending.ticket);
        }
        if count > 0 || dropped.is_some() {
            log::info!("reverted {count} edits");
            let mut status = format!("Reverted {count} change{}", if count == 1 { "" } else { "s" });
            if dropped.is_some() {
                status.push_str("; pending rows dropped");
            }
            self.status_message = Some(status);
        }
        count
    }

    /// Commit empty values into every editable cell of `cells`.
    fn clear_cells(&mut self, cells: Vec<CellPosition>) -> usize {
        let mut cleared = 0;
        for pos in cells {
            let Some(key) = self.key_at(pos) else { continue };
            if !self.columns[pos.col].is_editable() {
                continue;
            }
            if self.commit_value(key.row_id(), key.column_id(), CellValue::Empty).is_ok() {
                cleared += 1;
            }
        }
        cleared
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Display text of the primary range, tab and line delimited.
    pub fn copy(&mut self) -> Option<String> {
        if self.nav.mode().is_editing() {
            return None;
        }
        let range = self.selection.primary_range()?.clipped(self.bounds())?;
        let text = clipboard::serialize(range, &self.settings.line_terminator, |pos| {
            self.display_value(pos.row, pos.col)
        });
        let cells = range.cell_count();
        self.status_message = Some(format!("Copied {cells} cell{}", if cells == 1 { "" } else { "s" }));
        Some(text)
    }

    /// Copy, then clear the editable cells of the primary range.
    pub fn cut(&mut self) -> Option<String> {
        let text = self.copy()?;
        let cells: Vec<CellPosition> = match self.selection.primary_range() {
            Some(range) => range.cells().filter(|p| self.bounds().contains(*p)).collect(),
            None => Vec::new(),
        };
        let cleared = self.clear_cells(cells);
        self.flush_changed();
        self.status_message = Some(format!("Cut {cleared} cell{}", if cleared == 1 { "" } else { "s" }));
        Some(text)
    }

    /// Read the host clipboard and paste it. Access failures become a status
    /// message and never reach the parser.
    pub fn paste_from(&mut self, source: &mut dyn ClipboardSource) -> Result<PasteOutcome, GridError> {
        match source.read_text() {
            Ok(text) => self.paste_text(&text),
            Err(reason) => {
                log::warn!("clipboard read failed: {reason}");
                self.status_message = Some(format!("Clipboard unavailable: {reason}"));
                Err(GridError::ClipboardAccess(reason))
            }
        }
    }

    /// Paste delimited text at the active cell (or the selection's top-left).
    pub fn paste_text(&mut self, text: &str) -> Result<PasteOutcome, GridError> {
        if self.nav.mode().is_editing() {
            let line = clipboard::first_line(text).to_string();
            if !line.is_empty() {
                self.nav.append_draft(&line);
                self.status_message = Some(format!("Pasted: {line}"));
            }
            return Ok(PasteOutcome::IntoEditor { inserted: line });
        }
        if self.pending.is_some() {
            return Err(GridError::Busy);
        }

        let payload = clipboard::parse(text);
        if payload.is_empty() {
            self.status_message = Some("Clipboard is empty".to_string());
            return Ok(PasteOutcome::Applied(PasteSummary::default()));
        }

        if payload.is_single_cell() && self.settings.broadcast_single_value && self.selection.is_multi_cell() {
            let summary = self.broadcast(payload.get(0, 0).unwrap_or(""));
            return Ok(PasteOutcome::Applied(self.finish_paste(summary)));
        }

        let anchor = self
            .nav
            .active()
            .or_else(|| self.selection.bounding_box().map(|r| r.top_left()))
            .unwrap_or_default();
        let row_count = self.rows.len();
        let mut targets: Vec<Option<String>> = (anchor.row..row_count.min(anchor.row + payload.rows()))
            .map(|i| self.rows.get(i).map(|r| r.id.clone()))
            .collect();
        let needed = clipboard::rows_needed(anchor.row, payload.rows(), row_count);

        if needed == 0 {
            let summary = self.apply_payload(&payload, anchor.col, &targets);
            return Ok(PasteOutcome::Applied(self.finish_paste(summary)));
        }

        if !self.settings.create_rows_on_paste || self.row_creator.is_none() {
            log::debug!("paste overflows by {needed} rows; row creation unavailable");
            let summary = self.apply_payload(&payload, anchor.col, &targets);
            return Ok(PasteOutcome::Applied(self.finish_paste(summary)));
        }

        match self.request_rows(needed)? {
            Some(created) => {
                targets.extend(created.iter().cloned().map(Some));
                let mut summary = self.apply_payload(&payload, anchor.col, &targets);
                summary.rows_created = created.len();
                Ok(PasteOutcome::Applied(self.finish_paste(summary)))
            }
            None => {
                let ticket = self.issue_pending(needed, PendingPurpose::Paste {
                    payload,
                    anchor_col: anchor.col,
                    targets,
                });
                Ok(PasteOutcome::Pending(ticket))
            }
        }
    }

    /// Apply payload cells starting at `anchor_col`; row `r` of the payload
    /// lands on `targets[r]`. Cells past the last column are dropped; cells
    /// without a target row or in read-only columns are skipped.
    fn apply_payload(&mut self, payload: &ClipboardPayload, anchor_col: usize, targets: &[Option<String>]) -> PasteSummary {
        let mut summary = PasteSummary::default();
        for (r, c, text) in payload.cells() {
            let Some(column) = self.columns.get(anchor_col + c) else {
                continue;
            };
            let Some(Some(row_id)) = targets.get(r) else {
                summary.cells_skipped += 1;
                continue;
            };
            if !column.is_editable() {
                summary.cells_skipped += 1;
                continue;
            }
            let value = column.parse(text);
            let column_id = column.id.clone();
            match self.commit_value(row_id, &column_id, value) {
                Ok(_) => summary.cells_applied += 1,
                Err(err) => {
                    log::warn!("paste skipped a cell: {err}");
                    summary.cells_skipped += 1;
                }
            }
        }
        summary
    }

    /// One value into every selected cell.
    fn broadcast(&mut self, text: &str) -> PasteSummary {
        let mut summary = PasteSummary::default();
        for pos in self.selection.unique_cells() {
            let Some(key) = self.key_at(pos) else { continue };
            let column = &self.columns[pos.col];
            if !column.is_editable() {
                summary.cells_skipped += 1;
                continue;
            }
            let value = column.parse(text);
            match self.commit_value(key.row_id(), key.column_id(), value) {
                Ok(_) => summary.cells_applied += 1,
                Err(_) => summary.cells_skipped += 1,
            }
        }
        summary
    }

    fn finish_paste(&mut self, summary: PasteSummary) -> PasteSummary {
        self.flush_changed();
        log::debug!("paste applied: {summary:?}");
        self.status_message = Some(summary.status_text());
        summary
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Ask the row creator for `count` rows. `Ok(Some(ids))` if they exist
    /// now, `Ok(None)` if the host will acknowledge later.
    fn request_rows(&mut self, count: usize) -> Result<Option<Vec<String>>, GridError> {
        let ticket = RowTicket(self.next_ticket);
        let Some(creator) = self.row_creator.as_mut() else {
            return Err(GridError::Operation("no row creator configured".to_string()));
        };
        let blank = vec![NewRow::new(); count];
        let answer = creator.create_rows(ticket, &blank);
        self.events.push(GridEvent::RowsRequested { ticket, count });

        match answer {
            RowCreation::Created(ids) => {
                self.next_ticket += 1;
                Ok(Some(self.accept_rows(ticket, ids, count)))
            }
            RowCreation::Pending => Ok(None),
            RowCreation::Failed(reason) => {
                self.next_ticket += 1;
                log::warn!("row creation {ticket} failed: {reason}");
                self.status_message = Some(format!("Could not add rows: {reason}"));
                Err(GridError::Operation(reason))
            }
        }
    }

    fn issue_pending(&mut self, count: usize, purpose: PendingPurpose) -> RowTicket {
        let ticket = RowTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(PendingRows { ticket, count, purpose });
        self.status_message = Some(format!("Waiting for {count} new row{}", if count == 1 { "" } else { "s" }));
        ticket
    }

    /// Append acknowledged rows after checking their ids. Empty, duplicate
    /// or already-present ids are refused, and at most `expected` are taken.
    fn accept_rows(&mut self, ticket: RowTicket, ids: Vec<String>, expected: usize) -> Vec<String> {
        if ids.len() != expected {
            log::warn!("row request {ticket}: asked for {expected} rows, got {} ids", ids.len());
        }
        let mut accepted = Vec::with_capacity(expected);
        for id in ids {
            if accepted.len() == expected {
                break;
            }
            if !self.rows.push(RowRecord::new(id.as_str())) {
                log::warn!("row request {ticket}: refusing id '{id}'");
                continue;
            }
            accepted.push(id);
        }
        if !accepted.is_empty() {
            log::info!("row request {ticket}: {} rows added", accepted.len());
            self.events.push(GridEvent::RowsAdded { ids: accepted.clone() });
            if self.nav.active().is_none() {
                self.nav.reset(self.bounds());
                if let Some(pos) = self.nav.active() {
                    self.selection.select_cell(pos.row, pos.col);
                }
            }
        }
        accepted
    }

    /// Append `count` blank rows through the row creator. `Ok(None)` when
    /// they were created immediately, `Ok(Some(ticket))` when the host will
    /// acknowledge later.
    pub fn add_rows(&mut self, count: usize) -> Result<Option<RowTicket>, GridError> {
        if count == 0 {
            return Ok(None);
        }
        if self.pending.is_some() {
            return Err(GridError::Busy);
        }
        match self.request_rows(count)? {
            Some(created) => {
                self.status_message = Some(format!("Added {} row{}", created.len(), if created.len() == 1 { "" } else { "s" }));
                Ok(None)
            }
            None => Ok(Some(self.issue_pending(count, PendingPurpose::Add))),
        }
    }

    /// The host created the rows for `ticket`. A deferred paste is applied now.
    pub fn acknowledge_rows(&mut self, ticket: RowTicket, ids: Vec<String>) -> Result<PasteSummary, GridError> {
        let pending = match self.pending.take() {
            Some(p) if p.ticket == ticket => p,
            other => {
                self.pending = other;
                log::warn!("acknowledgement for unknown row request {ticket}");
                return Err(GridError::Operation(format!("no pending row request {ticket}")));
            }
        };

        let created = self.accept_rows(ticket, ids, pending.count);
        let summary = match pending.purpose {
            PendingPurpose::Paste { payload, anchor_col, mut targets } => {
                targets.extend(created.iter().cloned().map(Some));
                let mut summary = self.apply_payload(&payload, anchor_col, &targets);
                summary.rows_created = created.len();
                self.finish_paste(summary)
            }
            PendingPurpose::Add => {
                let n = created.len();
                self.status_message = Some(format!("Added {n} row{}", if n == 1 { "" } else { "s" }));
                PasteSummary { rows_created: n, ..PasteSummary::default() }
            }
        };
        Ok(summary)
    }

    /// The host could not create the rows for `ticket`. Nothing from the
    /// deferred paste is applied. Returns false if `ticket` was not pending.
    pub fn reject_rows(&mut self, ticket: RowTicket, reason: &str) -> bool {
        if self.pending_ticket() != Some(ticket) {
            return false;
        }
        self.pending = None;
        log::warn!("row request {ticket} rejected: {reason}");
        self.status_message = Some(GridError::Operation(reason.to_string()).to_string());
        true
    }

    /// Delete rows through the row deleter, then drop them locally.
    pub fn delete_rows(&mut self, ids: &BTreeSet<String>) -> Result<usize, GridError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let Some(deleter) = self.deleter.as_mut() else {
            return Err(GridError::Operation("no row deleter configured".to_string()));
        };
        if let Err(reason) = deleter.delete_rows(ids) {
            log::warn!("row delete failed: {reason}");
            self.status_message = Some(format!("Could not delete rows: {reason}"));
            return Err(GridError::Operation(reason));
        }
        let removed = self.remove_rows_external(ids);
        log::info!("deleted {removed} rows");
        Ok(removed)
    }

    /// Rows disappeared outside the editor. Their edits and errors are
    /// dropped and an edit open on one of them is cancelled.
    pub fn remove_rows_external(&mut self, ids: &BTreeSet<String>) -> usize {
        let mode_before = self.nav.mode();
        let active_id = self.nav.active().and_then(|p| self.rows.get(p.row)).map(|r| r.id.clone());

        let removed = self.rows.remove_ids(ids);
        if removed.is_empty() {
            return 0;
        }

        let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
        let mut stale = self.edits.retain(|k| !gone.contains(k.row_id()));
        stale.extend(self.validation.retain(|k| !gone.contains(k.row_id())));
        if !stale.is_empty() {
            log::warn!("dropped {} stale cell entries after row removal", stale.len());
            self.changed.extend(stale);
        }

        match active_id {
            Some(id) if gone.contains(id.as_str()) => {
                self.nav.cancel();
            }
            Some(id) => {
                if let (Some(row), Some(active)) = (self.rows.position(&id), self.nav.active()) {
                    self.nav.relocate(CellPosition::new(row, active.col));
                }
            }
            None => {}
        }

        self.events.push(GridEvent::RowsRemoved { ids: removed.clone() });
        self.after_shape_change(mode_before);
        removed.len()
    }

    /// Clip navigation and selection after rows or columns changed.
    fn after_shape_change(&mut self, mode_before: EditMode) {
        let bounds = self.bounds();
        if self.nav.revalidate(bounds, &self.columns) {
            log::warn!("open edit cancelled: its cell is no longer editable");
        }
        self.selection.clamp_to(bounds);
        if let Some(pos) = self.nav.active() {
            if !self.selection.contains(pos.row, pos.col) {
                self.selection.select_cell(pos.row, pos.col);
            }
        }
        self.events.push(GridEvent::SelectionChanged);
        self.note_mode_change(mode_before);
        self.flush_changed();
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Hand every dirty cell to the save handler. Blocked while validation
    /// errors exist. On success the stored rows take the new values and both
    /// maps are cleared together; on failure nothing changes.
    pub fn save(&mut self) -> Result<usize, GridError> {
        let mode_before = self.nav.mode();
        self.take_and_commit_pending();
        self.note_mode_change(mode_before);

        if self.validation.has_errors() {
            self.flush_changed();
            let err = GridError::Validation { count: self.validation.len() };
            self.status_message = Some(err.to_string());
            return Err(err);
        }
        if self.edits.is_empty() {
            self.flush_changed();
            self.status_message = Some("Nothing to save".to_string());
            return Ok(0);
        }

        let snapshot = self.edits.snapshot();
        let Some(saver) = self.saver.as_mut() else {
            self.flush_changed();
            return Err(GridError::Operation("no save handler configured".to_string()));
        };
        if let Err(reason) = saver.save(&snapshot) {
            log::warn!("save failed: {reason}");
            self.flush_changed();
            self.status_message = Some(format!("Save failed: {reason}"));
            return Err(GridError::Operation(reason));
        }

        for (key, record) in &snapshot {
            self.rows.set_value(key.row_id(), key.column_id(), record.current_value.clone());
        }
        self.edits.clear();
        self.validation.clear();
        let cells = snapshot.len();
        self.changed.extend(snapshot.into_keys());
        self.flush_changed();

        log::info!("saved {cells} cells");
        self.events.push(GridEvent::Saved { cells });
        self.status_message = Some(format!("Saved {cells} cell{}", if cells == 1 { "" } else { "s" }));
        Ok(cells)
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn note_mode_change(&mut self, before: EditMode) {
        let after = self.nav.mode();
        if after != before {
            self.events.push(GridEvent::ModeChanged { from: before, to: after });
        }
    }

    fn flush_changed(&mut self) {
        if self.changed.is_empty() {
            return;
        }
        let mut keys = std::mem::take(&mut self.changed);
        keys.sort();
        keys.dedup();
        self.events.push(GridEvent::CellsChanged { keys });
    }
}

impl std::fmt::Debug for GridEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEditor")
            .field("bounds", &self.bounds())
            .field("mode", &self.nav.mode())
            .field("active", &self.nav.active())
            .field("dirty", &self.edits.len())
            .field("errors", &self.validation.len())
            .field("pending", &self.pending_ticket())
            .finish()
    }
}
