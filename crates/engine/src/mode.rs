/// Edit state of the single active cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Selection,  // Grid focus: keystrokes move the active cell
    Edit,       // In-place editor opened on the cell's current value
    Replace,    // Typing over the cell: the first character seeds a fresh value
}

impl EditMode {
    /// True if a cell editor is open (Edit or Replace)
    pub fn is_editing(&self) -> bool {
        matches!(self, EditMode::Edit | EditMode::Replace)
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, EditMode::Selection)
    }
}

/// Where the host should put the text cursor when focusing a cell editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorPlacement {
    End,  // Caret after the last character, nothing selected
    All,  // Whole content selected
}
