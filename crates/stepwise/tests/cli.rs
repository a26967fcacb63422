//! Process exit contract of the `stepwise` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn script(source: &str) -> (TempDir, std::path::PathBuf)
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.py");
    std::fs::write(&path, source).unwrap();
    (dir, path)
}

fn stepwise() -> Command
{
    let mut cmd = Command::cargo_bin("stepwise").unwrap();
    cmd.env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_missing_argument_prints_usage()
{
    stepwise()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_nonexistent_script_exits_with_error()
{
    stepwise()
        .args(["--headless", "does/not/exist.py"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: does/not/exist.py not found"));
}

#[test]
fn test_headless_session_runs_to_completion()
{
    let (_dir, path) = script("def greet(name):\n    return f\"Hello, {name}!\"\n\nprint(greet(\"Alice\"))\n");

    stepwise()
        .arg("--headless")
        .arg(&path)
        .write_stdin("s\nc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("app.py:1 in <module>"))
        .stdout(predicate::str::contains("Hello, Alice!"));
}

#[test]
fn test_headless_quit_stops_before_output()
{
    let (_dir, path) = script("print(\"first\")\nprint(\"second\")\n");

    stepwise()
        .arg("--headless")
        .arg(&path)
        .write_stdin("s\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("second").not());
}

#[test]
fn test_target_failure_is_not_a_debugger_failure()
{
    let (_dir, path) = script("raise Exception(\"boom\")\n");

    stepwise()
        .args(["--headless", "--format", "json"])
        .arg(&path)
        .write_stdin("c\nc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exception\":\"boom\""));
}

#[test]
fn test_value_length_flag_truncates_previews()
{
    let (_dir, path) = script("text = \"abcdefghij\"\npass\n");

    stepwise()
        .args(["--headless", "--max-value-len", "4"])
        .arg(&path)
        .write_stdin("s\nc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("text = 'abc\n"));
}
