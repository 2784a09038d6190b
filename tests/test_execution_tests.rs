//! # Built-in Command Integration Tests / 内置命令集成测试
//!
//! Runs the built-in commands through a worker against real project
//! directories and checks the notifications and project state they leave.
//!
//! 通过 worker 在真实项目目录上运行内置命令，并检查其留下的通知和项目状态。

mod common;

use common::{buildout_project, insert_project, pip_project, spawn_worker, wait_for_notifications, write_script};
use crane_jobs::core::commands::{BOOTSTRAP, GITCLONE, SYNCDB, TEST};
use crane_jobs::core::execution::TEST_NOTIFICATION_TYPE;
use crane_jobs::core::models::{JobDescriptor, NotificationStatus};
use crane_jobs::core::registry::CommandRegistry;
use crane_jobs::infra::store::{MemoryStore, ProjectStore};
use crane_jobs::queue::JobDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const TWO_SUITES: &str = "\
[buildout]
parts =
    first
    other
    second

[first]
recipe = zc.recipe.testrunner

[other]
recipe = collective.recipe.omelette

[second]
recipe = djangorecipe
test = app
testrunner = second
";

async fn run_command(store: &Arc<MemoryStore>, command: &str, project_id: u64, expected: usize) -> Vec<crane_jobs::core::models::Notification> {
    let registry = CommandRegistry::with_builtins();
    let names = registry.names();
    let worker = spawn_worker(registry, store.clone(), 2).await;
    let dispatcher = JobDispatcher::new(worker.address.to_string(), names, Duration::from_secs(5));

    dispatcher
        .send(&JobDescriptor::for_project(command, project_id))
        .await
        .unwrap();
    let notifications = wait_for_notifications(store, expected).await;
    worker.stop().await;
    notifications
}

#[tokio::test]
async fn test_failing_suite_reports_every_banner_in_order() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "first", "echo one");
    write_script(dir.path(), "second", "echo two; exit 1");
    let store = Arc::new(MemoryStore::new());
    let project = insert_project(&store, buildout_project(dir.path(), TWO_SUITES));

    let notifications = run_command(&store, TEST, project.id, 2).await;

    assert_eq!(notifications[0].status, NotificationStatus::General);
    assert!(notifications[0].rerun_job.is_none());

    let report = &notifications[1];
    assert_eq!(report.status, NotificationStatus::Error);
    assert_eq!(report.notification_type.as_deref(), Some(TEST_NOTIFICATION_TYPE));
    assert_eq!(report.project, Some(project.id));
    let first = report.message.find("bin/first:").expect("first banner");
    let second = report.message.find("bin/second:").expect("second banner");
    assert!(first < second);
    assert!(report.message.contains("one\n"));
    assert!(report.message.contains("two\n"));
    assert!(report.message.contains(&"*".repeat(50)));

    let rerun = report.rerun_descriptor().unwrap().unwrap();
    assert_eq!(rerun.command(), TEST);
    assert_eq!(rerun.project_id().unwrap(), project.id);
    assert!(!ProjectStore::get(&*store, project.id).unwrap().test_status);
}

#[tokio::test]
async fn test_passing_pip_suite_marks_project_passing() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut project = pip_project(dir.path(), "echo all good");
    project.test_status = false;
    let project = insert_project(&store, project);

    let notifications = run_command(&store, TEST, project.id, 2).await;

    let report = &notifications[1];
    assert_eq!(report.status, NotificationStatus::Success);
    assert!(report.message.contains("all good"));
    assert!(!report.message.contains(&"*".repeat(50)));
    assert!(ProjectStore::get(&*store, project.id).unwrap().test_status);
}

#[tokio::test]
async fn test_empty_plan_is_a_passing_run() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut project = buildout_project(
        dir.path(),
        "[buildout]\nparts = eggs\n\n[eggs]\nrecipe = zc.recipe.egg\n",
    );
    project.test_status = false;
    let project = insert_project(&store, project);

    let notifications = run_command(&store, TEST, project.id, 2).await;

    let report = &notifications[1];
    assert_eq!(report.status, NotificationStatus::Success);
    assert_eq!(report.notification_type.as_deref(), Some(TEST_NOTIFICATION_TYPE));
    assert!(report.message.is_empty());
    assert!(ProjectStore::get(&*store, project.id).unwrap().test_status);
}

#[tokio::test]
async fn test_missing_buildout_section_is_a_failed_run() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let project = insert_project(&store, buildout_project(dir.path(), "[first]\nrecipe = zc.recipe.testrunner\n"));

    let notifications = run_command(&store, TEST, project.id, 2).await;

    let report = &notifications[1];
    assert_eq!(report.status, NotificationStatus::Error);
    assert_eq!(report.notification_type.as_deref(), Some(TEST_NOTIFICATION_TYPE));
    assert!(report.message.contains("[buildout]"));
    assert!(!ProjectStore::get(&*store, project.id).unwrap().test_status);
}

#[tokio::test]
async fn test_missing_project_directory_fails_the_job() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut project = pip_project(dir.path(), "true");
    project.base_directory = dir.path().join("gone");
    let project = insert_project(&store, project);

    let notifications = run_command(&store, TEST, project.id, 2).await;

    let failure = &notifications[1];
    assert_eq!(failure.status, NotificationStatus::Error);
    assert!(failure.message.contains("gone"));
    assert!(failure.rerun_job.is_some());
    assert!(!ProjectStore::get(&*store, project.id).unwrap().test_status);
}

#[tokio::test]
async fn test_clone_of_existing_directory_is_skipped_then_bootstrapped() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let project = insert_project(&store, buildout_project(dir.path(), "[buildout]\nparts =\n"));

    let notifications = run_command(&store, GITCLONE, project.id, 2).await;

    assert_eq!(notifications[0].status, NotificationStatus::General);
    assert!(notifications[0].rerun_job.is_none());
    let follow_up = notifications[1].rerun_descriptor();
    // bootstrap.py is absent, so the follow-up fails and can be rerun.
    assert_eq!(notifications[1].status, NotificationStatus::Error);
    assert_eq!(follow_up.unwrap().unwrap().command(), BOOTSTRAP);
}

#[tokio::test]
async fn test_shell_command_failure_carries_rerun() {
    let dir = tempdir().unwrap();
    write_script(dir.path(), "django", "echo \"django $1\"; exit 2");
    let store = Arc::new(MemoryStore::new());
    let project = insert_project(&store, buildout_project(dir.path(), "[buildout]\nparts =\n"));

    let notifications = run_command(&store, SYNCDB, project.id, 1).await;

    assert_eq!(notifications[0].status, NotificationStatus::Error);
    assert_eq!(notifications[0].message, "django syncdb\n");
    assert_eq!(
        notifications[0].rerun_descriptor().unwrap().unwrap().command(),
        SYNCDB
    );
}
