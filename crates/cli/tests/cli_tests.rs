// End-to-end tests for the gridedit binary.
//
// Each test writes a dataset into a temp dir and points XDG_CONFIG_HOME
// there too, so the user's own settings file never leaks in.
//
// Run with: cargo test -p gridedit-cli --test cli_tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const DATASET: &str = r#"{
    "columns": [
        {"id": "name", "displayName": "Name"},
        {"id": "qty", "displayName": "Qty", "dataType": "numeric"}
    ],
    "rows": [
        {"id": "r0", "values": {"name": "a", "qty": 1}},
        {"id": "r1", "values": {"name": "b", "qty": 2}}
    ],
    "required": ["name"]
}"#;

struct Fixture {
    dir: TempDir,
    data: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data.json");
        std::fs::write(&data, DATASET).unwrap();
        Self { dir, data }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn gridedit(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridedit"));
        cmd.env("XDG_CONFIG_HOME", self.dir.path());
        cmd.env("HOME", self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.gridedit().args(args).output().unwrap()
    }

    fn data(&self) -> &str {
        path_str(&self.data)
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(stdout(output).trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{}", stdout(output)))
}

// ============================================================================
// copy
// ============================================================================

#[test]
fn copy_range_as_tsv() {
    let fx = Fixture::new();
    let out = fx.run(&["copy", fx.data(), "--range", "1,1:0,0"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "a\t1\nb\t2\n");
}

#[test]
fn copy_uses_configured_line_terminator() {
    let fx = Fixture::new();
    let config = fx.write("settings.json", r#"{"clipboard.lineTerminator": "\r\n"}"#);
    let out = fx.run(&["--config", path_str(&config), "copy", fx.data(), "--range", "0,0:1,0"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "a\r\nb\r\n");
}

#[test]
fn settings_warnings_reach_stderr() {
    let fx = Fixture::new();
    let config = fx.write("settings.json", r#"{"clipboard.lineTerminator": ";"}"#);
    let out = fx.run(&["--config", path_str(&config), "copy", fx.data(), "--range", "0,0:1,0"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "a\nb\n");
    assert!(stderr(&out).contains("unsupported clipboard.lineTerminator"), "stderr: {}", stderr(&out));
}

#[test]
fn copy_outside_grid_is_usage_error() {
    let fx = Fixture::new();
    let out = fx.run(&["copy", fx.data(), "--range", "0,0:5,0"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("outside the grid"));
    assert!(stderr(&out).contains("hint:"));
}

#[test]
fn missing_dataset_is_io_error() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("nope.json");
    let out = fx.run(&["copy", path_str(&missing), "--range", "0,0"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn malformed_dataset_is_parse_error() {
    let fx = Fixture::new();
    let bad = fx.write("bad.json", "{\"columns\": ");
    let out = fx.run(&["copy", path_str(&bad), "--range", "0,0"]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("invalid dataset"));
}

// ============================================================================
// paste
// ============================================================================

#[test]
fn paste_grows_rows_to_fit() {
    let fx = Fixture::new();
    let block = fx.write("block.tsv", "x\t5\ny\t6\nz\t7\n");
    let out = fx.run(&["paste", fx.data(), "--at", "1,0", "--input", path_str(&block), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["paste"]["cellsApplied"], 6);
    assert_eq!(v["paste"]["rowsCreated"], 2);
    assert_eq!(v["paste"]["cellsSkipped"], 0);
    assert_eq!(v["status"], "Pasted 6 cells, added 2 rows");

    let grid = v["grid"].as_array().unwrap();
    assert_eq!(grid.len(), 4);
    assert_eq!(grid[0], serde_json::json!(["a", "1"]));
    assert_eq!(grid[3], serde_json::json!(["z", "7"]));

    assert_eq!(v["dirty"]["r1|name"]["originalValue"], "b");
    assert_eq!(v["dirty"]["r1|name"]["currentValue"], "x");
    assert!(v["dirty"]["new-2|qty"].is_object());
    assert!(v["dirty"].get("r0|name").is_none());
}

#[test]
fn paste_no_grow_skips_overflow() {
    let fx = Fixture::new();
    let block = fx.write("block.tsv", "x\t5\ny\t6\nz\t7");
    let out = fx.run(&["paste", fx.data(), "--at", "1,0", "--input", path_str(&block), "--no-grow", "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["paste"]["cellsApplied"], 2);
    assert_eq!(v["paste"]["cellsSkipped"], 4);
    assert_eq!(v["paste"]["rowsCreated"], 0);
    assert_eq!(v["grid"].as_array().unwrap().len(), 2);
}

#[test]
fn paste_reads_stdin() {
    let fx = Fixture::new();
    let mut child = fx
        .gridedit()
        .args(["paste", fx.data(), "--at", "0,1", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"1,234\r\n9\r\n").unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["grid"][0][1], "1,234");
    assert_eq!(v["grid"][1][1], "9");
    assert_eq!(v["dirty"]["r0|qty"]["currentValue"].as_f64(), Some(1234.0));
}

#[test]
fn paste_text_output_lists_dirty_cells() {
    let fx = Fixture::new();
    let block = fx.write("one.tsv", "zed");
    let out = fx.run(&["paste", fx.data(), "--at", "0,0", "--input", path_str(&block)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "zed\t1\nb\t2\n");
    assert!(stderr(&out).contains("dirty:  r0|name a -> zed"));
}

// ============================================================================
// replay
// ============================================================================

#[test]
fn replay_type_commit_and_save() {
    let fx = Fixture::new();
    let script = fx.write("edit.script", "# overwrite qty\nclick:0,1\ntype:42\nEnter\nsave\n");
    let out = fx.run(&["replay", fx.data(), path_str(&script), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["saved"], 1);
    assert_eq!(v["mode"], "selection");
    assert_eq!(v["active"], serde_json::json!({"row": 1, "col": 1}));
    assert_eq!(v["grid"][0][1], "42");
    assert!(v["dirty"].as_object().unwrap().is_empty());
}

#[test]
fn replay_leaves_editor_open_without_commit() {
    let fx = Fixture::new();
    let script = fx.write("open.script", "click:1,0\nF2\ntype:ob\n");
    let out = fx.run(&["replay", fx.data(), path_str(&script), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["mode"], "edit");
    assert_eq!(v["grid"][1][0], "b");
    assert!(v["dirty"].as_object().unwrap().is_empty());
}

#[test]
fn replay_save_blocked_by_validation() {
    let fx = Fixture::new();
    let script = fx.write("clear.script", "click:0,0\nDelete\nsave\n");
    let out = fx.run(&["replay", fx.data(), path_str(&script)]);
    assert_eq!(out.status.code(), Some(10));
    let err = stderr(&out);
    assert!(err.contains("step 3"), "stderr: {err}");
    assert!(err.contains("hint:"));
}

#[test]
fn replay_reports_errors_and_copies() {
    let fx = Fixture::new();
    let script = fx.write("errors.script", "click:0,0\nDelete\nclick:0,0\nshift-click:1,1\ncopy\n");
    let out = fx.run(&["replay", fx.data(), path_str(&script), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["errors"]["r0|name"], "value is required");
    assert_eq!(v["copied"], serde_json::json!(["\t1\nb\t2"]));
}

#[test]
fn replay_bad_script_line_is_parse_error() {
    let fx = Fixture::new();
    let script = fx.write("bad.script", "Enter\nteleport:1,1\n");
    let out = fx.run(&["replay", fx.data(), path_str(&script)]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("script line 2"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_reads_toml_file() {
    let fx = Fixture::new();
    let config = fx.write("settings.toml", "\"navigation.pageRows\" = 5\n");
    let out = fx.run(&["--config", path_str(&config), "config"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["navigation.pageRows"], 5);
    assert_eq!(v["paste.createRows"], true);
}

#[test]
fn config_path_follows_flag() {
    let fx = Fixture::new();
    let out = fx.run(&["--config", "/tmp/elsewhere.json", "config", "--path"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "/tmp/elsewhere.json");
}

#[test]
fn config_defaults_without_file() {
    let fx = Fixture::new();
    let out = fx.run(&["config"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(json(&out)["clipboard.lineTerminator"], "\n");
}

#[test]
fn first_run_writes_commented_settings_file() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("gridedit").join("settings.json");
    assert!(!path.exists());

    let out = fx.run(&["copy", fx.data(), "--range", "0,0"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("// Clipboard"));

    // Later runs read the file back
    let out = fx.run(&["config"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(json(&out)["navigation.pageRows"], 20);
}

#[test]
fn broken_user_settings_file_is_reported() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.dir.path().join("gridedit")).unwrap();
    fx.write("gridedit/settings.json", "{ nope");
    let out = fx.run(&["config"]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("pass --config"), "stderr: {}", stderr(&out));
}
