use assert_cmd::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use serial_test::serial;
use std::process::Command;

/// Helper to create a Command for the `pulse` binary with a clean environment
fn pulse_cmd() -> Command {
  let mut cmd = Command::cargo_bin("pulse").expect("binary exists");
  cmd.env_remove("DYNAMODB_TABLE").env_remove("PULSE_LANGUAGE_CODE").env_remove("RUST_LOG");
  cmd
}

#[test]
#[serial]
fn test_help_lists_subcommands() {
  pulse_cmd().arg("--help").assert().success().stdout(contains("invoke").and(contains("process")));
}

#[test]
#[serial]
fn test_table_is_required() {
  pulse_cmd().args(["process", "s3://feedback-uploads/feedback.csv"]).assert().failure().stderr(contains("--table"));
}

#[test]
#[serial]
fn test_blank_table_is_rejected() {
  pulse_cmd()
    .args(["--table", "  ", "--dry-run", "process", "s3://feedback-uploads/feedback.csv"])
    .assert()
    .failure()
    .stderr(contains("DYNAMODB_TABLE"));
}
