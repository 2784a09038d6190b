// Shared test helpers for integration tests
#![allow(dead_code)]

use crane_jobs::core::models::{Notification, Project, ProjectStyle};
use crane_jobs::core::registry::{CommandRegistry, HandlerSettings};
use crane_jobs::infra::command::ProcessRunner;
use crane_jobs::infra::store::{MemoryStore, NotificationSink, ProjectStore};
use crane_jobs::queue::JobWorker;
use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A pip project whose virtualenv exists and whose test command is `test_command`.
pub fn pip_project(base_directory: &Path, test_command: &str) -> Project {
    let activate = base_directory.join("venv").join("bin");
    fs::create_dir_all(&activate).expect("Failed to create virtualenv directory");
    fs::write(activate.join("activate"), "").expect("Failed to write activate script");

    Project {
        id: 0,
        name: "pip-sample".to_string(),
        base_directory: base_directory.to_path_buf(),
        git_repo: String::new(),
        description: String::new(),
        test_status: true,
        style: ProjectStyle::Pip {
            virtualenv_path: "venv/".to_string(),
            test_command: test_command.to_string(),
        },
    }
}

/// A buildout project with `buildout_cfg` written to its directory.
pub fn buildout_project(base_directory: &Path, buildout_cfg: &str) -> Project {
    fs::write(base_directory.join("buildout.cfg"), buildout_cfg).expect("Failed to write buildout.cfg");
    Project {
        id: 0,
        name: "buildout-sample".to_string(),
        base_directory: base_directory.to_path_buf(),
        git_repo: String::new(),
        description: String::new(),
        test_status: true,
        style: ProjectStyle::Buildout,
    }
}

/// Writes an executable `bin/<name>` script into `base_directory`.
pub fn write_script(base_directory: &Path, name: &str, body: &str) -> PathBuf {
    let bin = base_directory.join("bin");
    fs::create_dir_all(&bin).expect("Failed to create bin directory");
    let path = bin.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// A worker serving on an ephemeral local port.
pub struct TestWorker {
    pub address: SocketAddr,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<anyhow::Result<()>>,
}

impl TestWorker {
    /// Cancels the worker and waits until its queue is drained.
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.expect("worker task panicked").expect("worker failed");
    }
}

pub async fn spawn_worker(registry: CommandRegistry, store: Arc<MemoryStore>, max_concurrent_jobs: usize) -> TestWorker {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener");
    let address = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let worker = JobWorker::new(
        Arc::new(registry),
        store.clone(),
        store,
        ProcessRunner::new("/bin/sh", Some(Duration::from_secs(30))),
        HandlerSettings::default(),
        max_concurrent_jobs,
    );
    let handle = tokio::spawn(worker.serve(listener, shutdown.clone()));
    TestWorker {
        address,
        shutdown,
        handle,
    }
}

/// Polls `store` until it holds at least `count` notifications.
pub async fn wait_for_notifications(store: &MemoryStore, count: usize) -> Vec<Notification> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let notifications = NotificationSink::list(store).unwrap();
        if notifications.len() >= count {
            return notifications;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {count} notifications, got {notifications:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Inserts `project` and returns it with its assigned id.
pub fn insert_project(store: &MemoryStore, project: Project) -> Project {
    ProjectStore::insert(store, project).expect("Failed to insert project")
}
