//! End-to-end tests for the magik-typed-lint binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn lint_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_magik-typed-lint"))
}

const TYPES: &str = r#"{"instruction": "type", "type_name": "sw:rope", "type_format": "slotted", "parents": ["sw:object"]}
{"instruction": "method", "type_name": "sw:rope", "method_name": "size", "return_types": ["sw:integer"]}
"#;

const SOURCE: &str = "\
_method rope.twice()
    _return _self.size, _self.size.frobnicate()
_endmethod
_iter _method rope.items()
    _loopbody(:a)
_endmethod
";

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(lint_bin())
        .current_dir(dir)
        .args(args)
        .env_remove("MAGIK_LOG")
        .output()
        .expect("failed to run magik-typed-lint")
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("types.jsonl"), TYPES).unwrap();
    std::fs::write(dir.path().join("rope.magik"), SOURCE).unwrap();
    dir
}

// ── Human output ─────────────────────────────────────────────────────

#[test]
fn test_prints_definition_results() {
    let dir = project();
    let output = run_in(
        dir.path(),
        &["--types", "types.jsonl", "--no-color", "rope.magik"],
    );
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "rope.magik: rope.twice() -> sw:integer, _undefined",
            "rope.magik: rope.items() ->  (iter: sw:symbol)",
        ]
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[T0001]"), "{stderr}");
    assert!(stderr.contains("unknown method `frobnicate()` on `sw:integer`"), "{stderr}");
}

#[test]
fn test_syntax_errors_fail_the_run() {
    let dir = project();
    std::fs::write(dir.path().join("bad.magik"), "_method a.b _return 1").unwrap();
    let output = run_in(dir.path(), &["--no-color", "bad.magik"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[P0001]"), "{stderr}");
    assert!(stderr.contains("[T0003]"), "{stderr}");
}

#[test]
fn test_missing_type_database_is_reported() {
    let dir = project();
    let output = run_in(dir.path(), &["--types", "absent.jsonl", "rope.magik"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read type database"), "{stderr}");
}

// ── JSON output ──────────────────────────────────────────────────────

#[test]
fn test_json_output() {
    let dir = project();
    let output = run_in(dir.path(), &["--types", "types.jsonl", "--json", "rope.magik"]);
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let definitions: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("definition line is JSON"))
        .collect();
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0]["definition"], "rope.twice()");
    assert_eq!(definitions[0]["kind"], "method");
    assert_eq!(definitions[1]["loop_result"], "sw:symbol");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let note: serde_json::Value =
        serde_json::from_str(stderr.lines().next().expect("a note")).unwrap();
    assert_eq!(note["code"], "T0001");
    assert_eq!(note["severity"], "warning");
}

// ── Config file ──────────────────────────────────────────────────────

#[test]
fn test_config_file_supplies_types() {
    let dir = project();
    std::fs::write(
        dir.path().join("magik-lint.toml"),
        "types = [\"types.jsonl\"]\nno_color = true\n",
    )
    .unwrap();
    let output = run_in(dir.path(), &["rope.magik"]);
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rope.twice() -> sw:integer"), "{stdout}");
}
