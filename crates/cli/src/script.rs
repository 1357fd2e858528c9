//! Replay scripts: one input event or editor command per line.
//!
//! ```text
//! # comments and blank lines are ignored
//! click:1,0
//! type:42          one Char key per character
//! Enter            key chords: Shift+Tab, Ctrl+A, Shift+Down, F2, Esc, ...
//! paste:a\tb\nc\td escapes: \t \n \\
//! save
//! ```

use gridedit_core::CellPosition;
use gridedit_engine::{Key, Modifiers, NavEvent};

use crate::dataset::parse_position;
use crate::CliError;

/// One replayed action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Nav(NavEvent),
    Paste(String),
    Copy,
    Cut,
    /// Persist dirty cells (not the editor's own save trigger, which is `commit`).
    Save,
    Revert,
    CancelEdit,
    FocusInvalid,
    AddRows(usize),
    DeleteRows(Vec<String>),
}

pub fn parse_script(text: &str) -> Result<Vec<Step>, CliError> {
    let mut steps = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = parse_line(line)
            .map_err(|msg| CliError::parse(format!("script line {}: {msg}", i + 1)))?;
        steps.extend(parsed);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> Result<Vec<Step>, String> {
    if let Some((command, arg)) = line.split_once(':') {
        return parse_command(command.trim(), arg);
    }
    let step = match line.to_ascii_lowercase().as_str() {
        "save" => Step::Save,
        "commit" => Step::Nav(NavEvent::Save),
        "cancel" => Step::Nav(NavEvent::Cancel),
        "cancel-edit" => Step::CancelEdit,
        "revert" => Step::Revert,
        "copy" => Step::Copy,
        "cut" => Step::Cut,
        "focus-invalid" => Step::FocusInvalid,
        _ => {
            let (key, mods) = parse_chord(line)?;
            Step::Nav(NavEvent::Key { key, mods })
        }
    };
    Ok(vec![step])
}

fn parse_command(command: &str, arg: &str) -> Result<Vec<Step>, String> {
    let click = |mods: Modifiers| -> Result<Vec<Step>, String> {
        let position = position(arg)?;
        Ok(vec![Step::Nav(NavEvent::Activate { position, mods })])
    };
    match command {
        "type" => Ok(arg.chars().map(|c| Step::Nav(NavEvent::key(Key::Char(c)))).collect()),
        "char" => {
            let mut chars = arg.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(vec![Step::Nav(NavEvent::key(Key::Char(c)))]),
                _ => Err(format!("char expects exactly one character, got '{arg}'")),
            }
        }
        "input" => Ok(vec![Step::Nav(NavEvent::Input(unescape(arg)))]),
        "paste" => Ok(vec![Step::Paste(unescape(arg))]),
        "click" => click(Modifiers::NONE),
        "shift-click" => click(Modifiers::SHIFT),
        "ctrl-click" => click(Modifiers::CTRL),
        "dblclick" => Ok(vec![Step::Nav(NavEvent::DoubleActivate(position(arg)?))]),
        "add-rows" => {
            let n = arg.trim().parse().map_err(|_| format!("invalid row count '{arg}'"))?;
            Ok(vec![Step::AddRows(n)])
        }
        "delete-rows" => {
            let ids: Vec<String> = arg.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
            if ids.is_empty() {
                return Err("delete-rows needs at least one row id".to_string());
            }
            Ok(vec![Step::DeleteRows(ids)])
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn position(arg: &str) -> Result<CellPosition, String> {
    parse_position(arg).map_err(|e| e.message)
}

/// Parse a key chord like `Shift+Tab` or `Ctrl+A`.
pub fn parse_chord(chord: &str) -> Result<(Key, Modifiers), String> {
    let mut mods = Modifiers::NONE;
    let parts: Vec<&str> = chord.split('+').map(str::trim).collect();
    let Some((name, prefixes)) = parts.split_last() else {
        return Err("empty key".to_string());
    };
    for prefix in prefixes {
        match prefix.to_ascii_lowercase().as_str() {
            "shift" => mods.shift = true,
            "ctrl" | "cmd" => mods.ctrl = true,
            other => return Err(format!("unknown modifier '{other}'")),
        }
    }

    let key = match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => Key::Enter,
        "f2" => Key::F2,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "delete" | "del" => Key::Delete,
        "backspace" => Key::Backspace,
        "space" => Key::Char(' '),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(if mods.ctrl { c.to_ascii_lowercase() } else { c }),
                _ => return Err(format!("unknown key '{name}'")),
            }
        }
    };
    Ok((key, mods))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_lines() {
        let steps = parse_script("# setup\nclick:1,0\n\ntype:ab\nShift+Tab\ncommit\nsave\n").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Nav(NavEvent::click(1, 0)),
                Step::Nav(NavEvent::key(Key::Char('a'))),
                Step::Nav(NavEvent::key(Key::Char('b'))),
                Step::Nav(NavEvent::key_with(Key::Tab, Modifiers::SHIFT)),
                Step::Nav(NavEvent::Save),
                Step::Save,
            ]
        );
    }

    #[test]
    fn test_chords() {
        assert_eq!(parse_chord("Ctrl+A").unwrap(), (Key::Char('a'), Modifiers::CTRL));
        assert_eq!(parse_chord("esc").unwrap(), (Key::Escape, Modifiers::NONE));
        assert_eq!(parse_chord("Shift+Down").unwrap(), (Key::Down, Modifiers::SHIFT));
        assert!(parse_chord("Hyper+X").is_err());
        assert!(parse_chord("Banana").is_err());
    }

    #[test]
    fn test_paste_escapes() {
        let steps = parse_script(r"paste:a\tb\nc\\d").unwrap();
        assert_eq!(steps, vec![Step::Paste("a\tb\nc\\d".to_string())]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_script("Enter\nwarp:1").unwrap_err();
        assert_eq!(err.message, "script line 2: unknown command 'warp'");
        let err = parse_script("char:xy").unwrap_err();
        assert!(err.message.contains("exactly one character"));
    }

    #[test]
    fn test_row_commands() {
        assert_eq!(parse_script("add-rows:3").unwrap(), vec![Step::AddRows(3)]);
        assert_eq!(
            parse_script("delete-rows: r1, r2").unwrap(),
            vec![Step::DeleteRows(vec!["r1".into(), "r2".into()])]
        );
    }
}
