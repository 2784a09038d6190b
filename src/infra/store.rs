//! # Persistence Module / 持久化模块
//!
//! Projects and notifications are the only state that outlives a job. Both are
//! reached through small traits so handlers can be exercised against the
//! in-memory implementation.
//!
//! - [`FileStore`] keeps projects in `projects.json` and appends notifications
//!   to `notifications.jsonl`, one JSON object per line. Dismissals are appended
//!   to `dismissed.jsonl`; neither log is ever rewritten.
//! - [`MemoryStore`] keeps everything in memory.
//!
//! 项目和通知是作业结束后唯一保留的状态。两者都通过小型 trait 访问，
//! 以便处理器可以在内存实现上进行测试。

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::core::models::{NewNotification, Notification, Project, ProjectId};

/// File name of the project table inside the data directory.
pub const PROJECTS_FILE: &str = "projects.json";
/// File name of the notification log inside the data directory.
pub const NOTIFICATIONS_FILE: &str = "notifications.jsonl";
/// File name of the dismissal log inside the data directory.
pub const DISMISSED_FILE: &str = "dismissed.jsonl";

/// Access to the managed projects.
/// 访问受管理的项目。
pub trait ProjectStore: Send + Sync {
    fn get(&self, id: ProjectId) -> Result<Project>;

    /// All projects, ordered by id.
    fn list(&self) -> Result<Vec<Project>>;

    /// Stores a new project under the next free id and returns it.
    /// The `id` of the argument is ignored.
    ///
    /// 以下一个可用 id 存储新项目并返回。参数中的 `id` 会被忽略。
    fn insert(&self, project: Project) -> Result<Project>;

    fn set_test_status(&self, id: ProjectId, passed: bool) -> Result<()>;
}

/// Append-only destination of notifications.
/// 只追加的通知目标。
pub trait NotificationSink: Send + Sync {
    fn create(&self, notification: NewNotification) -> Result<Notification>;

    /// All notifications, oldest first.
    fn list(&self) -> Result<Vec<Notification>>;

    /// Hides a notification from the default listing. It is never deleted.
    fn dismiss(&self, id: u64) -> Result<()>;

    fn get(&self, id: u64) -> Result<Notification> {
        self.list()?
            .into_iter()
            .find(|n| n.id == id)
            .ok_or_else(|| anyhow!("notification {id} not found"))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("store lock poisoned"))
}

fn next_id<I: IntoIterator<Item = u64>>(ids: I) -> u64 {
    ids.into_iter().max().map_or(1, |max| max + 1)
}

/// In-memory store, used by tests and dry runs.
/// 内存存储，用于测试和试运行。
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: Mutex<Vec<Project>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn get(&self, id: ProjectId) -> Result<Project> {
        lock(&self.projects)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("project {id} not found"))
    }

    fn list(&self) -> Result<Vec<Project>> {
        Ok(lock(&self.projects)?.clone())
    }

    fn insert(&self, mut project: Project) -> Result<Project> {
        let mut projects = lock(&self.projects)?;
        project.id = next_id(projects.iter().map(|p| p.id));
        projects.push(project.clone());
        Ok(project)
    }

    fn set_test_status(&self, id: ProjectId, passed: bool) -> Result<()> {
        let mut projects = lock(&self.projects)?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("project {id} not found"))?;
        project.test_status = passed;
        Ok(())
    }
}

impl NotificationSink for MemoryStore {
    fn create(&self, notification: NewNotification) -> Result<Notification> {
        let mut notifications = lock(&self.notifications)?;
        let id = next_id(notifications.iter().map(|n| n.id));
        let stored = Notification::from_new(id, notification, Utc::now());
        notifications.push(stored.clone());
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<Notification>> {
        Ok(lock(&self.notifications)?.clone())
    }

    fn dismiss(&self, id: u64) -> Result<()> {
        let mut notifications = lock(&self.notifications)?;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| anyhow!("notification {id} not found"))?;
        notification.dismissed = true;
        Ok(())
    }
}

/// File-backed store rooted at a data directory.
///
/// Every write goes to disk before the call returns, so a store opened later
/// on the same directory (for example by the CLI while the worker runs) sees it.
///
/// 以数据目录为根的文件存储。每次写入都会在调用返回前落盘。
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    projects: Mutex<()>,
    notifications: Mutex<()>,
}

impl FileStore {
    /// Opens (and creates if needed) the data directory.
    /// 打开（必要时创建）数据目录。
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory: {}", root.display()))?;
        Ok(Self {
            root,
            projects: Mutex::new(()),
            notifications: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join(PROJECTS_FILE)
    }

    fn notifications_path(&self) -> PathBuf {
        self.root.join(NOTIFICATIONS_FILE)
    }

    fn read_projects(&self) -> Result<Vec<Project>> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write_projects(&self, projects: &[Project]) -> Result<()> {
        let content = serde_json::to_string_pretty(projects)?;
        replace_file(&self.projects_path(), content.as_bytes())
    }

    fn dismissed_path(&self) -> PathBuf {
        self.root.join(DISMISSED_FILE)
    }

    /// Every readable notification with its dismissal applied.
    fn read_notifications(&self) -> Result<Vec<Notification>> {
        let dismissed: HashSet<u64> = read_log::<Dismissal>(&self.dismissed_path())?
            .records
            .into_iter()
            .map(|d| d.id)
            .collect();
        let mut notifications = read_log::<Notification>(&self.notifications_path())?.records;
        for notification in &mut notifications {
            notification.dismissed |= dismissed.contains(&notification.id);
        }
        Ok(notifications)
    }
}

/// A line of `dismissed.jsonl`.
#[derive(Debug, Serialize, Deserialize)]
struct Dismissal {
    id: u64,
    dismissed_at: DateTime<Utc>,
}

/// Parsed content of a JSON-lines log.
struct LogContent<T> {
    records: Vec<T>,
    /// The file is empty or its last byte is a newline. False after a torn write.
    clean_tail: bool,
}

/// Reads a JSON-lines log. Lines that do not parse (a torn write after a crash,
/// for instance) are skipped with a warning so the log stays usable.
///
/// 读取 JSON 行日志。无法解析的行（例如崩溃后写了一半的行）会被跳过并记录警告，
/// 以保证日志仍然可用。
fn read_log<T: serde::de::DeserializeOwned>(path: &Path) -> Result<LogContent<T>> {
    if !path.exists() {
        return Ok(LogContent {
            records: Vec::new(),
            clean_tail: true,
        });
    }
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let clean_tail = bytes.last().is_none_or(|b| *b == b'\n');

    let mut records = Vec::new();
    for (index, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(
                path = %path.display(),
                line = index + 1,
                error = %err,
                "skipping unreadable log line"
            ),
        }
    }
    Ok(LogContent { records, clean_tail })
}

/// Appends one JSON line. A torn last line is terminated first so the new
/// record starts on a line of its own. The data is synced before returning.
fn append_line<T: Serialize>(path: &Path, record: &T, clean_tail: bool) -> Result<()> {
    let mut line = String::new();
    if !clean_tail {
        line.push('\n');
    }
    line.push_str(&serde_json::to_string(record)?);
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    // One write per record: appends from several processes never interleave within a line.
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    file.sync_data()?;
    Ok(())
}

/// Writes `content` to a sibling temp file and renames it over `path`.
fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

impl ProjectStore for FileStore {
    fn get(&self, id: ProjectId) -> Result<Project> {
        let _guard = lock(&self.projects)?;
        self.read_projects()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("project {id} not found"))
    }

    fn list(&self) -> Result<Vec<Project>> {
        let _guard = lock(&self.projects)?;
        let mut projects = self.read_projects()?;
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    fn insert(&self, mut project: Project) -> Result<Project> {
        let _guard = lock(&self.projects)?;
        let mut projects = self.read_projects()?;
        if projects.iter().any(|p| p.name == project.name) {
            bail!("a project named '{}' already exists", project.name);
        }
        project.id = next_id(projects.iter().map(|p| p.id));
        projects.push(project.clone());
        self.write_projects(&projects)?;
        Ok(project)
    }

    fn set_test_status(&self, id: ProjectId, passed: bool) -> Result<()> {
        let _guard = lock(&self.projects)?;
        let mut projects = self.read_projects()?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("project {id} not found"))?;
        project.test_status = passed;
        self.write_projects(&projects)
    }
}

impl NotificationSink for FileStore {
    fn create(&self, notification: NewNotification) -> Result<Notification> {
        let _guard = lock(&self.notifications)?;
        let path = self.notifications_path();
        let log = read_log::<Notification>(&path)?;
        let id = next_id(log.records.iter().map(|n| n.id));
        let stored = Notification::from_new(id, notification, Utc::now());
        append_line(&path, &stored, log.clean_tail)?;
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<Notification>> {
        let _guard = lock(&self.notifications)?;
        self.read_notifications()
    }

    fn dismiss(&self, id: u64) -> Result<()> {
        let _guard = lock(&self.notifications)?;
        let known = read_log::<Notification>(&self.notifications_path())?
            .records
            .iter()
            .any(|n| n.id == id);
        if !known {
            bail!("notification {id} not found");
        }
        let path = self.dismissed_path();
        let clean_tail = read_log::<Dismissal>(&path)?.clean_tail;
        append_line(
            &path,
            &Dismissal {
                id,
                dismissed_at: Utc::now(),
            },
            clean_tail,
        )
    }
}
