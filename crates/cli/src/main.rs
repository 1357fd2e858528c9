// gridedit CLI - headless grid editing sessions
// Loads a JSON dataset, drives the editor, prints the resulting state

mod dataset;
mod exit_codes;
mod script;

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use gridedit_config::{EditorSettings, SettingsError};
use gridedit_core::{CellKey, CellPosition};
use gridedit_engine::{
    EditMode, EditRecord, GridEditor, GridError, Modifiers, NavEvent, NewRow, PasteOutcome, PasteSummary,
    RowCreation, RowTicket,
};

use dataset::{parse_position, parse_range, Dataset};
use exit_codes::{exit_code_for, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};
use script::{parse_script, Step};

#[derive(Parser)]
#[command(name = "gridedit")]
#[command(about = "Spreadsheet-style grid editing, headless")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Settings file (.json or .toml); defaults to the user settings file if present
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log editor activity to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a range as tab-separated text
    #[command(after_help = "\
Examples:
  gridedit copy data.json --range 0,0:2,1
  gridedit copy data.json --range 3,2")]
    Copy {
        /// Dataset file (JSON with columns and rows)
        data: PathBuf,

        /// Range to copy: R1,C1:R2,C2 or R,C (0-based)
        #[arg(long)]
        range: String,
    },

    /// Paste tab-separated text into a dataset
    #[command(after_help = "\
Examples:
  printf 'a\\tb\\nc\\td' | gridedit paste data.json --at 1,0
  gridedit paste data.json --at 0,0 --input block.tsv --json")]
    Paste {
        /// Dataset file (JSON with columns and rows)
        data: PathBuf,

        /// Top-left target cell: R,C (0-based)
        #[arg(long)]
        at: String,

        /// Read the clipboard text from a file instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Drop rows that run past the end instead of creating new rows
        #[arg(long)]
        no_grow: bool,

        /// Print the resulting state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a script of key presses, clicks and commands
    #[command(after_help = "\
Script lines:
  click:R,C  shift-click:R,C  ctrl-click:R,C  dblclick:R,C
  Enter  F2  Tab  Shift+Tab  Esc  Up  Down  PageDown  Ctrl+A  Delete
  type:TEXT  char:C  input:TEXT  commit  cancel
  copy  cut  paste:TEXT (\\t and \\n escapes)
  save  revert  cancel-edit  focus-invalid  add-rows:N  delete-rows:ID,ID")]
    Replay {
        /// Dataset file (JSON with columns and rows)
        data: PathBuf,

        /// Script file, one step per line
        script: PathBuf,

        /// Print the resulting state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective editor settings
    Config {
        /// Print only the settings file path
        #[arg(long)]
        path: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  gridedit-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  gridedit-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: gridedit <command> [options]");
            eprintln!("       gridedit --help for more information");
            Ok(())
        }
        Some(Commands::Copy { data, range }) => cmd_copy(cli.config.as_deref(), &data, &range),
        Some(Commands::Paste { data, at, input, no_grow, json }) => {
            cmd_paste(cli.config.as_deref(), &data, &at, input.as_deref(), no_grow, json)
        }
        Some(Commands::Replay { data, script, json }) => cmd_replay(cli.config.as_deref(), &data, &script, json),
        Some(Commands::Config { path }) => cmd_config(cli.config.as_deref(), path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Create error from an editor error with its exit code.
    pub fn edit(err: GridError) -> Self {
        let hint = match &err {
            GridError::Validation { .. } => Some("fix or revert the invalid cells, then save again".to_string()),
            GridError::Busy => Some("wait for the pending row request before pasting again".to_string()),
            GridError::ReadOnlyColumn { .. } => Some("the column is not editable".to_string()),
            _ => None,
        };
        Self { code: exit_code_for(&err), message: err.to_string(), hint }
    }

    pub fn settings(err: SettingsError) -> Self {
        match err {
            SettingsError::Io(_) => Self::io(err.to_string()),
            SettingsError::Parse(_) => Self::parse(err.to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Session setup
// ============================================================================

/// Explicit `--config` must load; the user settings file is read only if it exists.
/// Default filter when RUST_LOG is unset: warnings, or debug output from our crates with `--verbose`.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,gridedit=debug,gridedit_core=debug,gridedit_engine=debug,gridedit_config=debug"
    } else {
        "warn"
    }
}

/// Route `log` records to stderr. RUST_LOG overrides the default filter.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    // Ignore the error if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_target(false)
        .without_time()
        .try_init();
}

fn load_settings(config: Option<&Path>) -> Result<EditorSettings, CliError> {
    if let Some(path) = config {
        return EditorSettings::from_path(path).map_err(CliError::settings);
    }
    EditorSettings::load().map_err(|e| {
        let hint = format!("check {} or pass --config", EditorSettings::config_path().display());
        CliError::settings(e).with_hint(hint)
    })
}

/// Row creator that answers immediately with fresh `new-N` ids.
fn sequential_ids(existing: BTreeSet<String>) -> impl FnMut(RowTicket, &[NewRow]) -> RowCreation {
    let mut next = 1usize;
    move |ticket: RowTicket, rows: &[NewRow]| {
        let mut ids = Vec::with_capacity(rows.len());
        while ids.len() < rows.len() {
            let id = format!("new-{next}");
            next += 1;
            if !existing.contains(&id) {
                ids.push(id);
            }
        }
        log::debug!("row request {ticket}: created {}", ids.join(", "));
        RowCreation::Created(ids)
    }
}

fn open_session(config: Option<&Path>, data: &Path) -> Result<GridEditor, CliError> {
    let settings = load_settings(config)?;
    let dataset = Dataset::load(data)?;
    let validator = dataset.validator();
    let existing: BTreeSet<String> = dataset.rows.iter().map(|r| r.id.clone()).collect();

    let mut editor = GridEditor::new(dataset.columns, dataset.rows, settings);
    if let Some(validator) = validator {
        editor.set_validator(validator);
    }
    editor.set_row_creator(Box::new(sequential_ids(existing)));
    editor.set_save_handler(Box::new(|entries: &BTreeMap<CellKey, EditRecord>| -> Result<(), String> {
        log::info!("saving {} cells", entries.len());
        Ok(())
    }));
    editor.set_row_deleter(Box::new(|ids: &BTreeSet<String>| -> Result<(), String> {
        log::info!("deleting {} rows", ids.len());
        Ok(())
    }));
    Ok(editor)
}

fn check_position(editor: &GridEditor, pos: CellPosition) -> Result<(), CliError> {
    let bounds = editor.bounds();
    if bounds.contains(pos) {
        Ok(())
    } else {
        Err(CliError::args(format!("cell {},{} is outside the grid", pos.row, pos.col))
            .with_hint(format!("grid has {} rows and {} columns", bounds.rows, bounds.cols)))
    }
}

fn log_events(editor: &mut GridEditor) {
    for event in editor.drain_events() {
        log::debug!("{event:?}");
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Serialize)]
struct Report {
    mode: EditMode,
    active: Option<CellPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paste: Option<PasteSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    copied: Vec<String>,
    saved: usize,
    dirty: BTreeMap<CellKey, EditRecord>,
    errors: BTreeMap<CellKey, String>,
    grid: Vec<Vec<String>>,
}

impl Report {
    fn capture(editor: &GridEditor) -> Self {
        let bounds = editor.bounds();
        let grid = (0..bounds.rows)
            .map(|row| (0..bounds.cols).map(|col| editor.display_value(row, col)).collect())
            .collect();
        Self {
            mode: editor.mode(),
            active: editor.active_cell(),
            status: editor.status_message.clone(),
            paste: None,
            copied: Vec::new(),
            saved: 0,
            dirty: editor.edits().snapshot(),
            errors: editor.validation().iter().map(|(k, m)| (k.clone(), m.to_string())).collect(),
            grid,
        }
    }

    fn print(&self, json: bool) -> Result<(), CliError> {
        if json {
            let out = serde_json::to_string_pretty(self).map_err(|e| CliError::io(e.to_string()))?;
            println!("{out}");
            return Ok(());
        }

        for row in &self.grid {
            println!("{}", row.join("\t"));
        }
        if let Some(status) = &self.status {
            eprintln!("status: {status}");
        }
        for (key, record) in &self.dirty {
            eprintln!("dirty:  {key} {} -> {}", record.original_value.raw_text(), record.current_value.raw_text());
        }
        for (key, message) in &self.errors {
            eprintln!("invalid: {key} {message}");
        }
        Ok(())
    }
}

// ============================================================================
// copy
// ============================================================================

fn cmd_copy(config: Option<&Path>, data: &Path, range: &str) -> Result<(), CliError> {
    let range = parse_range(range)?;
    let mut editor = open_session(config, data)?;
    let (start, end) = (range.top_left(), range.bottom_right());
    check_position(&editor, start)?;
    check_position(&editor, end)?;

    editor.handle(NavEvent::Activate { position: start, mods: Modifiers::NONE });
    editor.handle(NavEvent::Activate { position: end, mods: Modifiers::SHIFT });
    let text = editor.copy().ok_or_else(|| CliError::args("nothing selected"))?;
    log_events(&mut editor);

    print!("{text}{}", editor.settings().line_terminator);
    Ok(())
}

// ============================================================================
// paste
// ============================================================================

fn cmd_paste(
    config: Option<&Path>,
    data: &Path,
    at: &str,
    input: Option<&Path>,
    no_grow: bool,
    json: bool,
) -> Result<(), CliError> {
    let anchor = parse_position(at)?;
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::io(format!("cannot read stdin: {e}")))?;
            buf
        }
    };

    let mut editor = open_session(config, data)?;
    if no_grow {
        let mut settings = editor.settings().clone();
        settings.create_rows_on_paste = false;
        editor.set_settings(settings);
    }
    if !editor.bounds().is_empty() {
        check_position(&editor, anchor)?;
        editor.handle(NavEvent::Activate { position: anchor, mods: Modifiers::NONE });
    }

    let outcome = editor.paste_text(&text).map_err(CliError::edit)?;
    log_events(&mut editor);

    let mut report = Report::capture(&editor);
    report.paste = outcome.summary().copied();
    report.print(json)
}

// ============================================================================
// replay
// ============================================================================

fn cmd_replay(config: Option<&Path>, data: &Path, script_path: &Path, json: bool) -> Result<(), CliError> {
    let contents = std::fs::read_to_string(script_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", script_path.display())))?;
    let steps = parse_script(&contents)?;
    let mut editor = open_session(config, data)?;

    let mut last_paste = None;
    let mut copied = Vec::new();
    let mut saved = 0;
    for (i, step) in steps.into_iter().enumerate() {
        log::debug!("step {}: {step:?}", i + 1);
        let result = run_step(&mut editor, step, &mut last_paste, &mut copied, &mut saved);
        log_events(&mut editor);
        if let Err(err) = result {
            let mut cli_err = CliError::edit(err);
            cli_err.message = format!("step {}: {}", i + 1, cli_err.message);
            return Err(cli_err);
        }
    }

    let mut report = Report::capture(&editor);
    report.paste = last_paste;
    report.copied = copied;
    report.saved = saved;
    report.print(json)
}

fn run_step(
    editor: &mut GridEditor,
    step: Step,
    last_paste: &mut Option<PasteSummary>,
    copied: &mut Vec<String>,
    saved: &mut usize,
) -> Result<(), GridError> {
    match step {
        Step::Nav(event) => editor.handle(event),
        Step::Paste(text) => {
            if let PasteOutcome::Applied(summary) = editor.paste_text(&text)? {
                *last_paste = Some(summary);
            }
        }
        Step::Copy => copied.extend(editor.copy()),
        Step::Cut => copied.extend(editor.cut()),
        Step::Save => *saved += editor.save()?,
        Step::Revert => {
            editor.revert_all();
        }
        Step::CancelEdit => {
            editor.cancel_edit();
        }
        Step::FocusInvalid => {
            editor.focus_next_invalid();
        }
        Step::AddRows(count) => {
            editor.add_rows(count)?;
        }
        Step::DeleteRows(ids) => {
            let ids: BTreeSet<String> = ids.into_iter().collect();
            editor.delete_rows(&ids)?;
        }
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(config: Option<&Path>, path_only: bool) -> Result<(), CliError> {
    let path = config.map(Path::to_path_buf).unwrap_or_else(EditorSettings::config_path);
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }
    let settings = load_settings(config)?;
    let out = serde_json::to_string_pretty(&settings).map_err(|e| CliError::io(e.to_string()))?;
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for verbose in [false, true] {
            assert!(tracing_subscriber::EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
        assert!(default_filter(true).contains("gridedit_engine=debug"));
        assert_eq!(default_filter(false), "warn");
    }
}
