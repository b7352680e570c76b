//! Integration tests for the `recur` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the expand,
//! schedule, duration and check subcommands through the actual binary,
//! including JSON output and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn recur() -> Command {
    let mut cmd = Command::cargo_bin("recur").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_prints_one_instant_per_line() {
    // 2026-01-01 is a Thursday, so the start itself is not a last Friday.
    let out = stdout_of(recur().args([
        "expand",
        "FREQ=MONTHLY;BYDAY=-1FR",
        "--start",
        "2026-01-01T09:00:00",
        "--to",
        "2026-06-30T23:59:59",
    ]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        [
            "2026-01-30T09:00:00",
            "2026-02-27T09:00:00",
            "2026-03-27T09:00:00",
            "2026-04-24T09:00:00",
            "2026-05-29T09:00:00",
            "2026-06-26T09:00:00",
        ]
    );
}

#[test]
fn expand_json_honors_from() {
    let out = stdout_of(recur().args([
        "expand",
        "FREQ=MONTHLY;BYDAY=-1FR",
        "--start",
        "2026-01-01T09:00:00",
        "--from",
        "2026-04-01T00:00:00",
        "--to",
        "2026-06-30T23:59:59",
        "--json",
    ]));
    let parsed: Vec<String> = serde_json::from_str(&out).expect("stdout should be a JSON array");
    assert_eq!(
        parsed,
        ["2026-04-24T09:00:00", "2026-05-29T09:00:00", "2026-06-26T09:00:00"]
    );
}

#[test]
fn expand_limit_truncates_output() {
    let out = stdout_of(recur().args([
        "expand",
        "FREQ=HOURLY;INTERVAL=6",
        "--start",
        "2026-01-01T00:00:00",
        "--to",
        "2026-12-31T23:59:59",
        "--limit",
        "3",
    ]));
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        ["2026-01-01T00:00:00", "2026-01-01T06:00:00", "2026-01-01T12:00:00"]
    );
}

#[test]
fn expand_with_empty_window_prints_nothing() {
    recur()
        .args([
            "expand",
            "FREQ=DAILY;COUNT=3",
            "--start",
            "2026-01-01T09:00:00",
            "--from",
            "2026-02-01T00:00:00",
            "--to",
            "2026-02-28T00:00:00",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn expand_rejects_invalid_rule() {
    recur()
        .args([
            "expand",
            "FREQ=DAILY;BYSETPOS=1",
            "--start",
            "2026-01-01T09:00:00",
            "--to",
            "2026-02-01T00:00:00",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid rule"))
        .stderr(predicate::str::contains("BYSETPOS"));
}

#[test]
fn expand_rejects_malformed_instant() {
    recur()
        .args([
            "expand",
            "FREQ=DAILY",
            "--start",
            "2026-13-01T09:00:00",
            "--to",
            "2026-02-01T00:00:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --start"));
}

#[test]
fn expand_rejects_inverted_window() {
    recur()
        .args([
            "expand",
            "FREQ=DAILY",
            "--start",
            "2026-03-01T09:00:00",
            "--to",
            "2026-02-01T00:00:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid window"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Schedule subcommand
// ─────────────────────────────────────────────────────────────────────────────

fn workweek_args() -> Vec<&'static str> {
    vec![
        "schedule",
        "--start",
        "2026-01-05T09:00:00",
        "--to",
        "2026-01-31T23:59:59",
        "--include",
        "FREQ=DAILY;COUNT=7",
        "--exclude",
        "FREQ=WEEKLY;BYDAY=SA,SU",
    ]
}

#[test]
fn schedule_subtracts_exclusions() {
    let out = stdout_of(recur().args(workweek_args()));
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        [
            "2026-01-05T09:00:00",
            "2026-01-06T09:00:00",
            "2026-01-07T09:00:00",
            "2026-01-08T09:00:00",
            "2026-01-09T09:00:00",
        ]
    );
}

#[test]
fn schedule_duration_adds_end_instants() {
    let mut args = workweek_args();
    args.extend(["--duration", "PT45M"]);
    let out = stdout_of(recur().args(args));
    assert_eq!(
        out.lines().next(),
        Some("2026-01-05T09:00:00 2026-01-05T09:45:00")
    );
    assert_eq!(out.lines().count(), 5);
}

#[test]
fn schedule_json_has_start_and_end() {
    let mut args = workweek_args();
    args.extend(["--duration", "PT1H", "--json"]);
    let out = stdout_of(recur().args(args));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let items = parsed.as_array().expect("array");
    assert_eq!(items.len(), 5);
    assert_eq!(items[4]["start"], "2026-01-09T09:00:00");
    assert_eq!(items[4]["end"], "2026-01-09T10:00:00");
}

#[test]
fn schedule_without_rules_yields_the_start() {
    recur()
        .args([
            "schedule",
            "--start",
            "2026-01-05T09:00:00",
            "--to",
            "2026-01-31T23:59:59",
        ])
        .assert()
        .success()
        .stdout("2026-01-05T09:00:00\n");
}

#[test]
fn schedule_rejects_negative_duration() {
    let mut args = workweek_args();
    args.extend(["--duration", "-PT1H"]);
    recur()
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --duration"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Duration subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn duration_defaults_to_seconds() {
    recur()
        .args(["duration", "P1DT2H"])
        .assert()
        .success()
        .stdout("93600\n");
}

#[test]
fn duration_converts_to_unit() {
    recur()
        .args(["duration", "P1W", "--unit", "day"])
        .assert()
        .success()
        .stdout("7\n");
    recur()
        .args(["duration", "PT90M", "--unit", "hour"])
        .assert()
        .success()
        .stdout("1.5\n");
    recur()
        .args(["duration", "-PT30M", "--unit", "hour"])
        .assert()
        .success()
        .stdout("-0.5\n");
}

#[test]
fn duration_canonical_form() {
    recur()
        .args(["duration", "PT1440M", "--canonical"])
        .assert()
        .success()
        .stdout("P1D\n");
}

#[test]
fn duration_rejects_unknown_unit() {
    recur()
        .args(["duration", "PT1H", "--unit", "fortnight"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("fortnight"));
}

#[test]
fn duration_rejects_malformed_text() {
    recur()
        .args(["duration", "P1H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed duration"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Check subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_prints_canonical_rule() {
    recur()
        .args(["check", "RRULE:BYDAY=MO;FREQ=WEEKLY;INTERVAL=1"])
        .assert()
        .success()
        .stdout("FREQ=WEEKLY;BYDAY=MO\n");
}

#[test]
fn check_rejects_byweekno_outside_yearly() {
    recur()
        .args(["check", "FREQ=MONTHLY;BYWEEKNO=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BYWEEKNO"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn debug_logs_go_to_stderr_only() {
    recur()
        .args(["--log-level", "debug", "check", "FREQ=DAILY"])
        .assert()
        .success()
        .stdout("FREQ=DAILY\n");
}

#[test]
fn info_log_reports_expansion() {
    recur()
        .args([
            "--log-level",
            "info",
            "expand",
            "FREQ=DAILY;COUNT=2",
            "--start",
            "2026-01-01T09:00:00",
            "--to",
            "2026-01-31T00:00:00",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("expanded rule"));
}

#[test]
fn invalid_log_level_is_an_error() {
    recur()
        .args(["--log-level", "recur=loud", "check", "FREQ=DAILY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --log-level"));
}
