//! Binary-level checks for argument parsing and error reporting.

use assert_cmd::Command;
use predicates::prelude::*;

fn devloop() -> Command {
    let mut cmd = Command::cargo_bin("devloop").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    devloop()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_version() {
    devloop()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_fails() {
    devloop().arg("serve").assert().failure();
}

#[test]
fn test_build_reports_invalid_config() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("devloop.config.json"),
        r#"{"build": {"entrypoints": []}}"#,
    )
    .unwrap();

    devloop()
        .arg("build")
        .arg("--cwd")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("build.entrypoints"));
}

#[test]
fn test_build_missing_config_file() {
    let temp = tempfile::TempDir::new().unwrap();

    devloop()
        .args(["build", "--config", "missing.json", "--cwd"])
        .arg(temp.path())
        .assert()
        .failure();
}
