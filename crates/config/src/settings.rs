// Editor settings
// Loaded from ~/.config/gridedit/settings.json

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SettingsError {
    /// File could not be read or written.
    Io(String),
    /// File contents did not parse.
    Parse(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "settings IO error: {msg}"),
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    // Clipboard
    #[serde(rename = "clipboard.lineTerminator")]
    pub line_terminator: String,

    // Paste
    #[serde(rename = "paste.createRows")]
    pub create_rows_on_paste: bool,

    #[serde(rename = "paste.broadcastSingleValue")]
    pub broadcast_single_value: bool,

    // Navigation
    #[serde(rename = "navigation.pageRows")]
    pub page_rows: usize,

    #[serde(rename = "navigation.wrapTab")]
    pub wrap_tab: bool,

    // Display
    #[serde(rename = "display.groupThousands")]
    pub group_thousands: bool,

    #[serde(rename = "display.dateFormat")]
    pub date_format: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            // Clipboard
            line_terminator: "\n".to_string(),
            // Paste
            create_rows_on_paste: true,
            broadcast_single_value: true,
            // Navigation
            page_rows: 20,
            wrap_tab: true,
            // Display
            group_thousands: true,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl EditorSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridedit");
        config_dir.join("settings.json")
    }

    /// Load the user's settings file, writing a commented default one on first run.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_or_create(&Self::config_path())
    }

    /// Read `path`, or create it with the commented defaults when missing.
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(path);
            return Ok(settings);
        }
        Self::from_path(path)
    }

    /// Parse JSON settings. Lines starting with `//` are comments.
    pub fn from_json(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        let settings: Self = serde_json::from_str(&cleaned).map_err(|e| SettingsError::Parse(e.to_string()))?;
        Ok(settings.sanitized())
    }

    /// Parse TOML settings (same dotted keys, quoted).
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(contents).map_err(|e| SettingsError::Parse(e.to_string()))?;
        Ok(settings.sanitized())
    }

    /// Load an explicit settings file; `.toml` files are read as TOML, anything else as JSON.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Repair values that would break navigation or clipboard output.
    fn sanitized(mut self) -> Self {
        if self.page_rows == 0 {
            self.page_rows = 1;
        }
        if self.line_terminator != "\n" && self.line_terminator != "\r\n" {
            log::warn!("unsupported clipboard.lineTerminator {:?}; using \\n", self.line_terminator);
            self.line_terminator = "\n".to_string();
        }
        if self.date_format.trim().is_empty() {
            self.date_format = "%Y-%m-%d".to_string();
        } else if !date_format_renders(&self.date_format) {
            log::warn!("display.dateFormat {:?} cannot format a date; using %Y-%m-%d", self.date_format);
            self.date_format = "%Y-%m-%d".to_string();
        }
        self
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {e}");
                return;
            }
        }

        let default_config = r#"{
    // Clipboard: "\n" or "\r\n" between copied rows
    "clipboard.lineTerminator": "\n",

    // Paste: request new rows when a pasted block runs past the last row
    "paste.createRows": true,
    // Paste: a single copied value fills every selected cell
    "paste.broadcastSingleValue": true,

    // Navigation
    "navigation.pageRows": 20,
    "navigation.wrapTab": true,

    // Display
    "display.groupThousands": true,
    "display.dateFormat": "%Y-%m-%d"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {e}");
        }
    }
}

/// True when `fmt` formats a calendar date without time or offset fields.
fn date_format_renders(fmt: &str) -> bool {
    use std::fmt::Write;

    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    let Some(sample) = chrono::NaiveDate::from_ymd_opt(2024, 1, 31) else {
        return false;
    };
    let mut out = String::new();
    write!(out, "{}", sample.format(fmt)).is_ok()
}
