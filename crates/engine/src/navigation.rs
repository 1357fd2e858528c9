//! Navigation controller: active cell plus the three-mode edit state machine.
//!
//! [`transition`] is a pure function from `(state, event)` to
//! `(state, effects)`. It never touches the selection, the edit buffer or
//! the host; the effects it returns describe what the editor must do, in
//! order. [`NavigationController`] just holds the current state.

use gridedit_core::{CellPosition, ColumnDescriptor, GridBounds};

use crate::mode::{CursorPlacement, EditMode};

/// Keys the state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    F2,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Delete,
    Backspace,
    Char(char),
}

impl Key {
    /// Row/column delta for arrow keys.
    fn arrow_delta(self) -> Option<(isize, isize)> {
        match self {
            Key::Up => Some((-1, 0)),
            Key::Down => Some((1, 0)),
            Key::Left => Some((0, -1)),
            Key::Right => Some((0, 1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false };
    pub const CTRL: Modifiers = Modifiers { shift: false, ctrl: true };
}

/// User input as seen by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Key { key: Key, mods: Modifiers },
    /// Single click (or tap) on a cell.
    Activate { position: CellPosition, mods: Modifiers },
    /// Double click on a cell.
    DoubleActivate(CellPosition),
    /// The host's editor text changed; replaces the draft.
    Input(String),
    /// Explicit save trigger (e.g. the editor lost focus with a value).
    Save,
    /// Explicit cancel trigger.
    Cancel,
}

impl NavEvent {
    pub fn key(key: Key) -> Self {
        NavEvent::Key { key, mods: Modifiers::NONE }
    }

    pub fn key_with(key: Key, mods: Modifiers) -> Self {
        NavEvent::Key { key, mods }
    }

    pub fn click(row: usize, col: usize) -> Self {
        NavEvent::Activate { position: CellPosition::new(row, col), mods: Modifiers::NONE }
    }
}

/// Work the editor performs on behalf of a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEffect {
    /// Collapse the selection to one cell.
    Select(CellPosition),
    /// Extend the anchor range to a cell.
    Extend(CellPosition),
    /// Extend the anchor range's moving corner by a delta.
    ExtendBy { d_row: isize, d_col: isize },
    /// Start an additional range (ctrl+click).
    AddRange(CellPosition),
    SelectAll,
    /// A cell editor opened; the host should focus it.
    BeginEdit { position: CellPosition, cursor: CursorPlacement },
    /// Run the commit pipeline for this cell with the editor's text.
    Commit { position: CellPosition, value: String },
    /// The in-flight edit was thrown away.
    Discard { position: CellPosition },
    /// Clear every editable selected cell.
    ClearSelection,
    /// An edit was attempted on a cell that cannot be edited.
    ReadOnly(CellPosition),
}

/// The single `(active cell, mode)` pair plus the editor's pending text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavState {
    pub active: Option<CellPosition>,
    pub mode: EditMode,
    pub draft: String,
}

impl NavState {
    pub fn at(row: usize, col: usize) -> Self {
        Self { active: Some(CellPosition::new(row, col)), ..Self::default() }
    }
}

/// Read-only view of the grid that transitions consult.
pub struct NavContext<'a> {
    pub bounds: GridBounds,
    pub columns: &'a [ColumnDescriptor],
    pub page_rows: usize,
    pub wrap_tab: bool,
    /// Editor text for a cell, used when opening Edit mode.
    pub cell_text: &'a dyn Fn(CellPosition) -> String,
}

impl NavContext<'_> {
    fn is_editable(&self, pos: CellPosition) -> bool {
        self.bounds.contains(pos) && self.columns.get(pos.col).is_some_and(|c| c.is_editable())
    }

    fn first_cell(&self) -> Option<CellPosition> {
        self.bounds.clamp(0, 0)
    }
}

/// Next cell in tab order. Stays put at the last (or first) cell.
pub fn tab_order(pos: CellPosition, backward: bool, bounds: GridBounds, wrap: bool) -> CellPosition {
    if bounds.is_empty() {
        return pos;
    }
    let last_col = bounds.cols - 1;
    if backward {
        if pos.col > 0 {
            CellPosition::new(pos.row, pos.col - 1)
        } else if wrap && pos.row > 0 {
            CellPosition::new(pos.row - 1, last_col)
        } else {
            pos
        }
    } else if pos.col < last_col {
        CellPosition::new(pos.row, pos.col + 1)
    } else if wrap && pos.row + 1 < bounds.rows {
        CellPosition::new(pos.row + 1, 0)
    } else {
        pos
    }
}

/// Apply one event to a state. Pure: the same inputs always give the same outputs.
pub fn transition(state: &NavState, event: &NavEvent, ctx: &NavContext<'_>) -> (NavState, Vec<NavEffect>) {
    match state.mode {
        EditMode::Selection => selection_transition(state, event, ctx),
        EditMode::Edit | EditMode::Replace => editing_transition(state, event, ctx),
    }
}

fn begin_edit(pos: CellPosition, mode: EditMode, draft: String) -> (NavState, Vec<NavEffect>) {
    let state = NavState { active: Some(pos), mode, draft };
    (state, vec![NavEffect::BeginEdit { position: pos, cursor: CursorPlacement::End }])
}

fn select(pos: CellPosition) -> (NavState, Vec<NavEffect>) {
    (NavState { active: Some(pos), ..NavState::default() }, vec![NavEffect::Select(pos)])
}

fn unchanged(state: &NavState) -> (NavState, Vec<NavEffect>) {
    (state.clone(), Vec::new())
}

fn selection_transition(state: &NavState, event: &NavEvent, ctx: &NavContext<'_>) -> (NavState, Vec<NavEffect>) {
    match event {
        NavEvent::Activate { position, mods } => {
            if !ctx.bounds.contains(*position) {
                return unchanged(state);
            }
            if mods.shift && state.active.is_some() {
                (state.clone(), vec![NavEffect::Extend(*position)])
            } else if mods.ctrl {
                let next = NavState { active: Some(*position), ..NavState::default() };
                (next, vec![NavEffect::AddRange(*position)])
            } else {
                select(*position)
            }
        }
        NavEvent::DoubleActivate(position) => {
            if !ctx.bounds.contains(*position) {
                return unchanged(state);
            }
            let (next, mut effects) = select(*position);
            if ctx.is_editable(*position) {
                let (edit, open) = begin_edit(*position, EditMode::Edit, (ctx.cell_text)(*position));
                effects.extend(open);
                (edit, effects)
            } else {
                effects.push(NavEffect::ReadOnly(*position));
                (next, effects)
            }
        }
        NavEvent::Key { key, mods } => selection_key(state, *key, *mods, ctx),
        NavEvent::Input(_) | NavEvent::Save | NavEvent::Cancel => unchanged(state),
    }
}

fn selection_key(state: &NavState, key: Key, mods: Modifiers, ctx: &NavContext<'_>) -> (NavState, Vec<NavEffect>) {
    if mods.ctrl && matches!(key, Key::Char('a' | 'A')) {
        return (state.clone(), vec![NavEffect::SelectAll]);
    }

    let Some(active) = state.active else {
        // Nothing active yet: any movement lands on the first cell
        return match (key, ctx.first_cell()) {
            (Key::Up | Key::Down | Key::Left | Key::Right | Key::Tab | Key::PageUp | Key::PageDown, Some(first)) => {
                select(first)
            }
            _ => unchanged(state),
        };
    };

    if let Some((d_row, d_col)) = key.arrow_delta() {
        if mods.shift {
            return (state.clone(), vec![NavEffect::ExtendBy { d_row, d_col }]);
        }
        return match ctx.bounds.offset(active, d_row, d_col) {
            Some(next) => select(next),
            None => unchanged(state),
        };
    }

    match key {
        Key::Enter | Key::F2 => {
            if ctx.is_editable(active) {
                begin_edit(active, EditMode::Edit, (ctx.cell_text)(active))
            } else {
                (state.clone(), vec![NavEffect::ReadOnly(active)])
            }
        }
        Key::Char(c) if !mods.ctrl && !c.is_control() => {
            if ctx.is_editable(active) {
                begin_edit(active, EditMode::Replace, c.to_string())
            } else {
                (state.clone(), vec![NavEffect::ReadOnly(active)])
            }
        }
        Key::Tab => select(tab_order(active, mods.shift, ctx.bounds, ctx.wrap_tab)),
        Key::PageUp | Key::PageDown => {
            let rows = ctx.page_rows.max(1) as isize;
            let d_row = if key == Key::PageUp { -rows } else { rows };
            match ctx.bounds.offset(active, d_row, 0) {
                Some(next) => select(next),
                None => unchanged(state),
            }
        }
        Key::Delete | Key::Backspace => (state.clone(), vec![NavEffect::ClearSelection]),
        _ => unchanged(state),
    }
}

fn editing_transition(state: &NavState, event: &NavEvent, ctx: &NavContext<'_>) -> (NavState, Vec<NavEffect>) {
    // Editing without an addressable cell is never a valid state
    let Some(active) = state.active.filter(|p| ctx.bounds.contains(*p)) else {
        return (NavState { active: None, ..NavState::default() }, Vec::new());
    };

    let commit = || NavEffect::Commit { position: active, value: state.draft.clone() };
    let commit_and_select = |next: CellPosition| {
        let landed = NavState { active: Some(next), ..NavState::default() };
        (landed, vec![commit(), NavEffect::Select(next)])
    };

    match event {
        NavEvent::Save => commit_and_select(tab_order(active, false, ctx.bounds, ctx.wrap_tab)),
        NavEvent::Cancel => discard(active),
        NavEvent::Input(text) => {
            let mut next = state.clone();
            next.draft = text.clone();
            (next, Vec::new())
        }
        NavEvent::Activate { position, .. } => {
            if *position == active || !ctx.bounds.contains(*position) {
                return unchanged(state);
            }
            commit_and_select(*position)
        }
        NavEvent::DoubleActivate(position) => {
            if *position == active || !ctx.bounds.contains(*position) {
                return unchanged(state);
            }
            let (next, mut effects) = commit_and_select(*position);
            if ctx.is_editable(*position) {
                let (edit, open) = begin_edit(*position, EditMode::Edit, (ctx.cell_text)(*position));
                effects.extend(open);
                (edit, effects)
            } else {
                (next, effects)
            }
        }
        NavEvent::Key { key, mods } => match key {
            Key::Enter | Key::Tab => {
                let backward = *key == Key::Tab && mods.shift;
                commit_and_select(tab_order(active, backward, ctx.bounds, ctx.wrap_tab))
            }
            Key::Escape => discard(active),
            Key::Backspace => {
                let mut next = state.clone();
                next.draft.pop();
                (next, Vec::new())
            }
            Key::Char(c) if !mods.ctrl && !c.is_control() => {
                let mut next = state.clone();
                next.draft.push(*c);
                (next, Vec::new())
            }
            Key::Up | Key::Down | Key::Left | Key::Right if state.mode == EditMode::Replace => {
                let (d_row, d_col) = key.arrow_delta().unwrap_or((0, 0));
                let target = ctx.bounds.offset(active, d_row, d_col).unwrap_or(active);
                commit_and_select(target)
            }
            // Caret movement belongs to the host's text editor
            _ => unchanged(state),
        },
    }
}

fn discard(active: CellPosition) -> (NavState, Vec<NavEffect>) {
    let state = NavState { active: Some(active), ..NavState::default() };
    (state, vec![NavEffect::Discard { position: active }])
}

/// Holds the current [`NavState`] and feeds events through [`transition`].
#[derive(Debug, Clone, Default)]
pub struct NavigationController {
    state: NavState,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn active(&self) -> Option<CellPosition> {
        self.state.active
    }

    pub fn mode(&self) -> EditMode {
        self.state.mode
    }

    pub fn draft(&self) -> &str {
        &self.state.draft
    }

    pub fn handle(&mut self, event: &NavEvent, ctx: &NavContext<'_>) -> Vec<NavEffect> {
        let (next, effects) = transition(&self.state, event, ctx);
        if next.mode != self.state.mode {
            log::debug!("edit mode {:?} -> {:?} at {:?}", self.state.mode, next.mode, next.active);
        }
        self.state = next;
        effects
    }

    /// Move the active cell without going through the state machine. Any
    /// open edit is dropped.
    pub fn set_active(&mut self, active: Option<CellPosition>) {
        self.state = NavState { active, ..NavState::default() };
    }

    /// Back to Selection mode at the first cell (or nothing, for an empty grid).
    pub fn reset(&mut self, bounds: GridBounds) {
        self.set_active(bounds.clamp(0, 0));
    }

    /// Move the active cell to where its row now sits, keeping any open edit.
    pub fn relocate(&mut self, active: CellPosition) {
        self.state.active = Some(active);
    }

    /// Open an editor on `pos` seeded with `draft`.
    pub fn open_editor(&mut self, pos: CellPosition, draft: String) {
        self.state = NavState { active: Some(pos), mode: EditMode::Edit, draft };
    }

    /// Insert pasted text at the end of the open editor's draft.
    pub fn append_draft(&mut self, text: &str) -> bool {
        if !self.state.mode.is_editing() {
            return false;
        }
        self.state.draft.push_str(text);
        true
    }

    /// Leave Edit/Replace without committing. Returns the cell that was being edited.
    pub fn cancel(&mut self) -> Option<CellPosition> {
        if !self.state.mode.is_editing() {
            return None;
        }
        self.state.mode = EditMode::Selection;
        self.state.draft.clear();
        self.state.active
    }

    /// Leave Edit/Replace and hand back the pending text for committing in
    /// place. The active cell does not move.
    pub fn take_pending(&mut self) -> Option<(CellPosition, String)> {
        if !self.state.mode.is_editing() {
            return None;
        }
        let active = self.state.active?;
        self.state.mode = EditMode::Selection;
        Some((active, std::mem::take(&mut self.state.draft)))
    }

    /// Re-check the state after the grid changed shape. An edit whose cell is
    /// gone or no longer editable is cancelled (returns true); the active
    /// cell is clipped into the grid.
    pub fn revalidate(&mut self, bounds: GridBounds, columns: &[ColumnDescriptor]) -> bool {
        let editable = |p: CellPosition| bounds.contains(p) && columns.get(p.col).is_some_and(|c| c.is_editable());
        let mut cancelled = false;
        if self.state.mode.is_editing() && !self.state.active.is_some_and(editable) {
            self.state.mode = EditMode::Selection;
            self.state.draft.clear();
            cancelled = true;
        }
        self.state.active = match self.state.active {
            Some(p) => bounds.clamp(p.row as isize, p.col as isize),
            None => None,
        };
        cancelled
    }
}
