//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures shared by the dispatcher, the
//! worker and the command handlers: job descriptors, execution results,
//! notifications and projects.
//!
//! 此模块定义了调度器、worker 和命令处理器共享的核心数据结构：
//! 作业描述符、执行结果、通知和项目。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::JobError;

/// Identifier of a project in the project store.
/// 项目存储中项目的标识符。
pub type ProjectId = u64;

/// An ordered list of shell invocations that exercise a project's test suite.
/// 用于运行项目测试套件的有序 shell 调用列表。
pub type TestPlan = Vec<String>;

/// Key that carries the command name on the wire. Reserved in the arguments map.
const COMMAND_KEY: &str = "command";

/// A named command plus its keyword arguments, dispatched once.
///
/// On the wire it is a single flat JSON object: `{"command": "TEST", "project_id": 3}`.
/// Argument values are limited to JSON scalars and lists of scalars.
///
/// 一个命名命令及其关键字参数，仅调度一次。
/// 在线路上它是一个扁平的 JSON 对象。参数值仅限于 JSON 标量和标量列表。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    command: String,
    #[serde(flatten)]
    arguments: Map<String, Value>,
}

impl JobDescriptor {
    /// Builds a descriptor, rejecting reserved keys and nested objects.
    pub fn new(command: impl Into<String>, arguments: Map<String, Value>) -> Result<Self, JobError> {
        let job = Self {
            command: command.into(),
            arguments,
        };
        job.validate()?;
        Ok(job)
    }

    /// Shorthand for the common case of a command that only takes a project.
    /// 仅需要项目参数的命令的简写。
    pub fn for_project(command: impl Into<String>, project_id: ProjectId) -> Self {
        let mut arguments = Map::new();
        arguments.insert("project_id".to_string(), Value::from(project_id));
        Self {
            command: command.into(),
            arguments,
        }
    }

    /// Returns a copy with one more argument set.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self, JobError> {
        self.arguments.insert(key.into(), value.into());
        self.validate()?;
        Ok(self)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// The `project_id` argument every built-in handler requires.
    pub fn project_id(&self) -> Result<ProjectId, JobError> {
        self.arguments
            .get("project_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                JobError::InvalidJob(format!("{} requires an integer `project_id`", self.command))
            })
    }

    /// A required string argument, e.g. `app_name` for `STARTAPP`.
    pub fn require_str(&self, key: &str) -> Result<&str, JobError> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| JobError::InvalidJob(format!("{} requires a string `{key}`", self.command)))
    }

    /// Serializes the descriptor into its wire form.
    /// 将描述符序列化为线路格式。
    pub fn encode(&self) -> String {
        let mut object = self.arguments.clone();
        object.insert(COMMAND_KEY.to_string(), Value::String(self.command.clone()));
        Value::Object(object).to_string()
    }

    /// Parses and validates a wire message.
    /// 解析并校验线路消息。
    pub fn decode(raw: &str) -> Result<Self, JobError> {
        let job: JobDescriptor = serde_json::from_str(raw)?;
        job.validate()?;
        Ok(job)
    }

    fn validate(&self) -> Result<(), JobError> {
        if self.command.is_empty() {
            return Err(JobError::InvalidJob("command name is empty".to_string()));
        }
        if self.arguments.contains_key(COMMAND_KEY) {
            return Err(JobError::InvalidJob(format!("`{COMMAND_KEY}` is a reserved argument name")));
        }
        for (key, value) in &self.arguments {
            let allowed = match value {
                Value::Object(_) => false,
                Value::Array(items) => items
                    .iter()
                    .all(|item| !matches!(item, Value::Object(_) | Value::Array(_))),
                _ => true,
            };
            if !allowed {
                return Err(JobError::InvalidJob(format!(
                    "argument `{key}` must be a scalar or a list of scalars"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// The outcome of one shell invocation.
/// 一次 shell 调用的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The shell command line that was run / 执行的 shell 命令行
    pub command: String,
    /// Exit code, `None` when the process was killed by a signal or timed out.
    /// 退出码；进程被信号终止或超时时为 `None`。
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr / 合并的 stdout 和 stderr
    pub output: String,
    pub duration: Duration,
    /// `true` when the runner killed the process after its timeout.
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Status of a notification.
/// 通知的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Success,
    Error,
    General,
}

impl NotificationStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            NotificationStatus::Success
        } else {
            NotificationStatus::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Success => "success",
            NotificationStatus::Error => "error",
            NotificationStatus::General => "general",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification that has not been stored yet.
/// 尚未存储的通知。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub status: NotificationStatus,
    pub summary: String,
    pub message: String,
    pub project: Option<ProjectId>,
    pub notification_type: Option<String>,
    /// Wire form of the job that produced this notification.
    pub rerun_job: Option<String>,
}

impl NewNotification {
    pub fn new(status: NotificationStatus, summary: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            summary: summary.into(),
            message: message.into(),
            project: None,
            notification_type: None,
            rerun_job: None,
        }
    }

    pub fn for_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_type(mut self, notification_type: impl Into<String>) -> Self {
        self.notification_type = Some(notification_type.into());
        self
    }

    pub fn with_rerun(mut self, job: &JobDescriptor) -> Self {
        self.rerun_job = Some(job.encode());
        self
    }
}

/// A stored, immutable record of an execution outcome.
/// 已存储的、不可变的执行结果记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub status: NotificationStatus,
    pub summary: String,
    pub message: String,
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub rerun_job: Option<String>,
    pub notification_time: DateTime<Utc>,
    #[serde(default)]
    pub dismissed: bool,
}

impl Notification {
    pub fn from_new(id: u64, new: NewNotification, notification_time: DateTime<Utc>) -> Self {
        Self {
            id,
            status: new.status,
            summary: new.summary,
            message: new.message,
            project: new.project,
            notification_type: new.notification_type,
            rerun_job: new.rerun_job,
            notification_time,
            dismissed: false,
        }
    }

    /// Decodes the attached rerun descriptor, if any.
    pub fn rerun_descriptor(&self) -> Option<Result<JobDescriptor, JobError>> {
        self.rerun_job.as_deref().map(JobDescriptor::decode)
    }
}

fn default_virtualenv_path() -> String {
    "venv/".to_string()
}

/// How a project is built, and therefore how its tests are run.
/// 项目的构建方式，以及因此决定的测试运行方式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProjectStyle {
    /// Built from named sections in `buildout.cfg`.
    Buildout,
    /// A virtualenv plus a requirements file and a free-form test command.
    Pip {
        #[serde(default = "default_virtualenv_path")]
        virtualenv_path: String,
        #[serde(default)]
        test_command: String,
    },
}

impl ProjectStyle {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectStyle::Buildout => "buildout",
            ProjectStyle::Pip { .. } => "pip",
        }
    }
}

/// A managed project.
/// 受管理的项目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub base_directory: PathBuf,
    #[serde(default)]
    pub git_repo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_status: bool,
    pub style: ProjectStyle,
}

impl Project {
    /// The file that holds the buildout configuration.
    pub fn buildout_filename(&self) -> PathBuf {
        self.base_directory.join("buildout.cfg")
    }

    /// The file that holds the pip requirements.
    pub fn requirements_filename(&self) -> PathBuf {
        self.base_directory.join("requirements.txt")
    }

    pub fn is_buildout(&self) -> bool {
        matches!(self.style, ProjectStyle::Buildout)
    }

    /// The virtualenv directory of a pip project.
    pub fn virtualenv_path(&self) -> Option<&str> {
        match &self.style {
            ProjectStyle::Pip { virtualenv_path, .. } => Some(virtualenv_path),
            ProjectStyle::Buildout => None,
        }
    }
}
