#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_cli(args: &[&str], script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.args(args).write_stdin(script.to_string()).assert()
}

#[test]
fn cli_adds_tasks_and_shows_table() {
    run_cli(&[], "add Design 2025-01-06 3\nadd Build 2025-01-06 2d\nshow\nquit\n")
        .success()
        .stdout(str_contains("Added task id=1"))
        .stdout(str_contains("| Build"))
        .stdout(str_contains("predecessors"));
}

#[test]
fn cli_link_pushes_dependant() {
    run_cli(
        &[],
        "add Design 2025-01-06 3\nadd Build 2025-01-06 2\nlink 0 1 FS\ncritical\nquit\n",
    )
    .success()
    .stdout(str_contains("Added dependency id=0"))
    .stdout(str_contains("1:2025-01-09"))
    .stdout(str_contains("critical=0->1 finish=2025-01-11"));
}

#[test]
fn cli_rejects_cycles() {
    run_cli(
        &[],
        "add A 2025-01-06 1\nadd B 2025-01-06 1\nlink 0 1\nlink 1 0\nquit\n",
    )
    .success()
    .stdout(str_contains("Error: dependency 1 -> 0 would create a cycle"));
}

#[test]
fn cli_holiday_moves_work() {
    run_cli(&[], "add A 2025-01-06 3\nholiday 2025-01-07 Offsite\nquit\n")
        .success()
        .stdout(str_contains("Holiday added (moved=1"));
}

#[test]
fn cli_reports_unknown_commands_and_bad_input() {
    run_cli(&[], "frobnicate\nadd A notadate 3\nshift 7 2\nquit\n")
        .success()
        .stdout(str_contains("Unknown command. Type 'help'."))
        .stdout(str_contains("Usage: add"))
        .stdout(str_contains("Error: task 7 does not exist"));
}

#[test]
fn cli_save_and_load_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("plan.json");
    let path = path.to_string_lossy().to_string();
    let script = format!(
        "add Persist 2025-01-06 4\nsave {path}\nadd Temp 2025-01-06 1\nload {path}\nshow\nquit\n"
    );
    let assert = run_cli(&[], &script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(output.contains("Saved to"));
    let after_reload = output.split("Loaded").last().unwrap_or_default();
    assert!(after_reload.contains("Persist"));
    assert!(!after_reload.contains("Temp"), "temporary task survived reload:\n{after_reload}");
}

#[test]
fn cli_snapshot_flag_loads_at_startup() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("plan.json");
    let path_arg = path.to_string_lossy().to_string();
    run_cli(&["--snapshot", &path_arg], "add Kept 2025-01-06 2\nsave\nquit\n").success();
    run_cli(&["--snapshot", &path_arg, "--log-level", "error"], "show\nquit\n")
        .success()
        .stdout(str_contains("| Kept"));
}
