use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

/// Writes a configuration whose data directory lives inside `dir`.
fn write_config(dir: &TempDir) -> PathBuf {
    let config_path = dir.path().join("crane.toml");
    let content = format!(
        "language = \"en\"\n\n[worker]\naddress = \"127.0.0.1:1\"\nack_timeout_secs = 1\n\n[storage]\ndata_dir = \"{}\"\n",
        dir.path().join("data").display()
    );
    fs::write(&config_path, content).unwrap();
    config_path
}

fn crane(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crane").unwrap();
    cmd.env("NO_COLOR", "1").arg("--lang").arg("en").arg("--config").arg(config);
    cmd
}

/// The help text lists every subcommand.
///
/// 帮助文本列出所有子命令。
#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("crane").unwrap();
    cmd.arg("--lang").arg("en").arg("--help");

    cmd.assert().success().stdout(
        predicate::str::contains("worker")
            .and(predicate::str::contains("enqueue"))
            .and(predicate::str::contains("rerun"))
            .and(predicate::str::contains("notifications")),
    );
}

/// `init` writes a configuration and refuses to overwrite it without `--force`.
///
/// `init` 写入配置，没有 `--force` 时拒绝覆盖。
#[test]
fn test_init_writes_config_once() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("nested").join("crane.toml");

    let mut cmd = Command::cargo_bin("crane").unwrap();
    cmd.env("NO_COLOR", "1")
        .args(["--lang", "en", "init", "--output"])
        .arg(&output);
    cmd.assert().success();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("language = \"en\""));

    fs::write(&output, "# edited\n").unwrap();
    let mut again = Command::cargo_bin("crane").unwrap();
    again
        .env("NO_COLOR", "1")
        .args(["--lang", "en", "init", "--output"])
        .arg(&output);
    again.assert().success().stdout(predicate::str::contains("--force"));
    assert_eq!(fs::read_to_string(&output).unwrap(), "# edited\n");
}

/// A project added without prompts shows up in the listing and its plan can be printed.
///
/// 不经提示添加的项目会出现在列表中，并且可以打印其测试计划。
#[test]
fn test_project_add_list_and_plan() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);
    let project_dir = dir.path().join("web");
    fs::create_dir_all(&project_dir).unwrap();
    fs::write(
        project_dir.join("buildout.cfg"),
        "[buildout]\nparts = tests\n\n[tests]\nrecipe = zc.recipe.testrunner\nscript = run-tests\n",
    )
    .unwrap();

    crane(&config)
        .args(["project", "add", "--non-interactive", "--name", "web", "--dir"])
        .arg(&project_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"));

    crane(&config)
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web").and(predicate::str::contains("buildout")));

    crane(&config)
        .args(["plan", "--project", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. bin/run-tests"));
}

/// Missing required values fail instead of prompting when `--non-interactive` is set.
#[test]
fn test_non_interactive_add_requires_directory() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    crane(&config)
        .args(["project", "add", "--non-interactive", "--name", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dir"));
}

/// Enqueueing fails with a readable error when no worker listens.
#[test]
fn test_enqueue_without_worker_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    crane(&config)
        .args(["enqueue", "TEST", "--project", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not queue TEST"));
}

/// Unknown commands are refused by the client.
#[test]
fn test_enqueue_unknown_command_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    crane(&config)
        .args(["enqueue", "DEPLOY", "--project", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("command not found: DEPLOY"));
}

#[test]
fn test_empty_notification_listing() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);
    let report = dir.path().join("report.html");

    crane(&config)
        .args(["notifications", "--html"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("No notifications."));
    assert!(fs::read_to_string(&report).unwrap().contains("<html"));
}
