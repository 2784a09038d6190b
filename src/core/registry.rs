//! # Command Registry Module / 命令注册表模块
//!
//! Maps command names to handlers. The registry is built once at start-up and
//! then shared read-only behind an `Arc` by the worker and the dispatchers.
//!
//! 将命令名映射到处理器。注册表在启动时构建一次，之后由 worker 和调度器
//! 通过 `Arc` 只读共享。

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::config::{CraneConfig, Preferences};
use crate::core::error::JobError;
use crate::core::models::JobDescriptor;
use crate::infra::command::ProcessRunner;
use crate::infra::store::{NotificationSink, ProjectStore};

/// Settings handlers read but never change.
/// 处理器只读的设置。
#[derive(Debug, Clone, Default)]
pub struct HandlerSettings {
    /// Source of `bootstrap.py` and `base_buildout.cfg` for new buildout projects.
    pub skeleton_dir: Option<PathBuf>,
    pub preferences: Preferences,
}

impl HandlerSettings {
    pub fn from_config(config: &CraneConfig) -> anyhow::Result<Self> {
        Ok(Self {
            skeleton_dir: config.storage.skeleton_dir()?,
            preferences: config.preferences.clone(),
        })
    }
}

/// Everything a handler may touch while it runs.
///
/// 处理器运行时可以访问的一切。
#[derive(Clone)]
pub struct HandlerContext {
    pub projects: Arc<dyn ProjectStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub runner: ProcessRunner,
    pub settings: Arc<HandlerSettings>,
    follow_ups: mpsc::WeakUnboundedSender<JobDescriptor>,
}

impl HandlerContext {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        runner: ProcessRunner,
        settings: HandlerSettings,
        follow_ups: &mpsc::UnboundedSender<JobDescriptor>,
    ) -> Self {
        Self {
            projects,
            notifications,
            runner,
            settings: Arc::new(settings),
            follow_ups: follow_ups.downgrade(),
        }
    }

    /// Queues another job on the worker that runs this handler.
    /// Follow-ups skip the network, so a handler never waits on its own worker.
    /// The context does not keep the queue open: once the worker shuts down,
    /// follow-ups are refused.
    ///
    /// 在运行此处理器的 worker 上排队另一个作业。后续作业不经过网络。
    pub fn enqueue(&self, job: JobDescriptor) -> anyhow::Result<()> {
        let Some(queue) = self.follow_ups.upgrade() else {
            anyhow::bail!("worker queue closed, dropped {job}");
        };
        queue
            .send(job)
            .map_err(|err| anyhow::anyhow!("worker queue closed, dropped {}", err.0))
    }
}

/// Future returned by a handler.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A unit of work runnable by name.
/// 可按名称运行的工作单元。
pub trait CommandHandler: Send + Sync {
    fn call(&self, ctx: HandlerContext, job: JobDescriptor) -> HandlerFuture;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(HandlerContext, JobDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, ctx: HandlerContext, job: JobDescriptor) -> HandlerFuture {
        (self)(ctx, job).boxed()
    }
}

/// Name to handler table.
/// 名称到处理器的映射表。
#[derive(Default, Clone)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    /// 包含所有内置命令的注册表。
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::core::commands::register_builtins(&mut registry);
        registry
    }

    /// Adds `handler` under `name`. A later registration of the same name wins.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        let name = name.into();
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::warn!(command = %name, "command registered twice, keeping the latest handler");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Like [`resolve`](Self::resolve), but unknown names are an error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn CommandHandler>, JobError> {
        self.resolve(name)
            .ok_or_else(|| JobError::CommandNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
