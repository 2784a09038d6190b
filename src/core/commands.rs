//! # Built-in Commands Module / 内置命令模块
//!
//! The commands every worker knows. Each one takes a `project_id` argument,
//! runs in the project's base directory and records its outcome as a
//! notification.
//!
//! 每个 worker 都认识的命令。每个命令都接受 `project_id` 参数，
//! 在项目的基础目录中运行，并将结果记录为通知。

use anyhow::{Context, Result, bail};

use crate::core::execution::{outcome_key, run_test_plan};
use crate::core::models::{
    ExecutionResult, JobDescriptor, NewNotification, NotificationStatus, Project, ProjectStyle,
};
use crate::core::planner::activate_command;
use crate::core::registry::{CommandHandler, CommandRegistry, HandlerContext};
use crate::infra::buildout::BuildoutFileReader;
use crate::infra::command::quote_arg;
use crate::infra::fs::prep_project;
use crate::infra::t;

pub const BOOTSTRAP: &str = "BOOTSTRAP";
pub const BUILDOUT: &str = "BUILDOUT";
pub const TEST: &str = "TEST";
pub const GITCLONE: &str = "GITCLONE";
pub const GITPULL: &str = "GITPULL";
pub const SYNCDB: &str = "SYNCDB";
pub const STARTAPP: &str = "STARTAPP";
pub const MIGRATE: &str = "MIGRATE";
pub const VIRTUALENV: &str = "VIRTUALENV";
pub const PIPINSTALL: &str = "PIPINSTALL";
pub const EDIT: &str = "EDIT";

/// Placeholder in `terminal_path` replaced by the editor invocation.
pub const TERMINAL_PLACEHOLDER: &str = "#s";

pub(crate) fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(BOOTSTRAP, bootstrap);
    registry.register(BUILDOUT, buildout);
    registry.register(TEST, test);
    registry.register(GITCLONE, git_clone);
    registry.register(GITPULL, shell_command("git pull", "notify.pull"));
    registry.register(SYNCDB, shell_command("bin/django syncdb --noinput", "notify.syncdb"));
    registry.register(STARTAPP, startapp);
    registry.register(MIGRATE, shell_command("bin/django migrate", "notify.migrate"));
    registry.register(VIRTUALENV, virtualenv);
    registry.register(PIPINSTALL, pip_install);
    registry.register(EDIT, edit);
}

fn load_project(ctx: &HandlerContext, job: &JobDescriptor) -> Result<Project> {
    let project_id = job.project_id()?;
    let project = ctx.projects.get(project_id)?;
    tracing::info!(command = job.command(), project_id, project = %project.name, "running command");
    Ok(project)
}

/// Runs `invocation` in the project directory and stores one notification
/// with the captured output. Failed runs carry the job for a rerun.
///
/// 在项目目录中运行 `invocation`，并以捕获的输出存储一条通知。失败的运行会附带作业以便重新运行。
async fn run_and_notify(
    ctx: &HandlerContext,
    project: &Project,
    job: &JobDescriptor,
    invocation: &str,
    summary: impl FnOnce(&str) -> String,
) -> Result<ExecutionResult> {
    let result = ctx.runner.run(invocation, &project.base_directory).await?;
    let status = NotificationStatus::from_success(result.success());

    let mut message = result.output.clone();
    if result.timed_out {
        let secs = ctx.runner.timeout().map(|d| d.as_secs()).unwrap_or_default();
        message.push_str(&t!("notify.timed_out", secs = secs));
    }

    let outcome = t!(outcome_key(status));
    let mut notification = NewNotification::new(status, summary(&*outcome), message)
        .for_project(project.id);
    if !result.success() {
        notification = notification.with_rerun(job);
    }
    ctx.notifications.create(notification)?;
    Ok(result)
}

/// A command that only runs a fixed shell line.
fn shell_command(invocation: &'static str, summary_key: &'static str) -> impl CommandHandler {
    move |ctx: HandlerContext, job: JobDescriptor| async move {
        let project = load_project(&ctx, &job)?;
        run_and_notify(&ctx, &project, &job, invocation, |outcome| {
            t!(summary_key, name = project.name, outcome = outcome).to_string()
        })
        .await
        .map(|_| ())
    }
}

async fn bootstrap(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let created = prep_project(&project, ctx.settings.skeleton_dir.as_deref())?;
    if !created.is_empty() {
        tracing::debug!(project_id = project.id, files = ?created, "project skeleton prepared");
    }
    run_and_notify(&ctx, &project, &job, "python bootstrap.py", |outcome| {
        t!("notify.bootstrap", name = project.name, outcome = outcome).to_string()
    })
    .await?;
    Ok(())
}

async fn buildout(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    ctx.notifications.create(
        NewNotification::new(
            NotificationStatus::General,
            t!("notify.buildout_started", name = project.name),
            t!("notify.buildout_started_message", name = project.name),
        )
        .for_project(project.id),
    )?;
    run_and_notify(&ctx, &project, &job, "bin/buildout", |outcome| {
        t!("notify.buildout", name = project.name, outcome = outcome).to_string()
    })
    .await?;
    Ok(())
}

async fn test(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    run_test_plan(&ctx, &project, &job, &BuildoutFileReader).await?;
    Ok(())
}

/// Clones the project repository unless the base directory already exists.
/// Buildout projects are bootstrapped afterwards either way.
///
/// 除非基础目录已存在，否则克隆项目仓库。无论如何，buildout 项目随后都会被引导。
async fn git_clone(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let base = &project.base_directory;

    if base.exists() {
        ctx.notifications.create(
            NewNotification::new(
                NotificationStatus::General,
                t!("notify.clone_skipped", name = project.name),
                t!("notify.clone_skipped_message"),
            )
            .for_project(project.id),
        )?;
    } else {
        if project.git_repo.trim().is_empty() {
            bail!("project '{}' has no git repository", project.name);
        }
        let parent = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let invocation = format!(
            "git clone {} {}",
            quote_arg(&project.git_repo),
            quote_arg(&base.to_string_lossy())
        );
        let result = ctx.runner.run(&invocation, &parent).await?;
        let success = result.success();
        let status = NotificationStatus::from_success(success);
        let outcome = t!(outcome_key(status));
        let mut notification = NewNotification::new(
            status,
            t!("notify.clone", name = project.name, outcome = outcome),
            result.output,
        )
        .for_project(project.id)
        .with_type(GITCLONE);
        if !success {
            notification = notification.with_rerun(&job);
        }
        ctx.notifications.create(notification)?;
    }

    if project.is_buildout() {
        ctx.enqueue(JobDescriptor::for_project(BOOTSTRAP, project.id))?;
    }
    Ok(())
}

async fn startapp(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let app_name = job.require_str("app_name")?.to_string();
    let invocation = format!("bin/django startapp {}", quote_arg(&app_name));
    run_and_notify(&ctx, &project, &job, &invocation, |outcome| {
        t!("notify.startapp", app = app_name, name = project.name, outcome = outcome).to_string()
    })
    .await?;
    Ok(())
}

fn require_virtualenv(project: &Project) -> Result<&str> {
    match &project.style {
        ProjectStyle::Pip { virtualenv_path, .. } => Ok(virtualenv_path),
        ProjectStyle::Buildout => bail!("project '{}' is not a pip project", project.name),
    }
}

async fn virtualenv(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let invocation = format!("virtualenv --no-site-packages {}", quote_arg(require_virtualenv(&project)?));
    run_and_notify(&ctx, &project, &job, &invocation, |outcome| {
        t!("notify.virtualenv", name = project.name, outcome = outcome).to_string()
    })
    .await?;
    Ok(())
}

async fn pip_install(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let invocation = format!(
        "{} && pip install -r requirements.txt",
        activate_command(require_virtualenv(&project)?)
    );
    run_and_notify(&ctx, &project, &job, &invocation, |outcome| {
        t!("notify.pipinstall", name = project.name, outcome = outcome).to_string()
    })
    .await?;
    Ok(())
}

/// The command line that opens `buildout.cfg`, wrapped in the terminal when
/// the terminal command has a `#s` placeholder.
///
/// 打开 `buildout.cfg` 的命令行；当终端命令包含 `#s` 占位符时，会包裹在终端中。
pub fn editor_command_line(editor_path: &str, terminal_path: Option<&str>) -> String {
    let editor = format!("{editor_path} buildout.cfg");
    match terminal_path {
        Some(terminal) if terminal.contains(TERMINAL_PLACEHOLDER) => {
            terminal.replace(TERMINAL_PLACEHOLDER, &editor)
        }
        _ => editor,
    }
}

async fn edit(ctx: HandlerContext, job: JobDescriptor) -> Result<()> {
    let project = load_project(&ctx, &job)?;
    let preferences = &ctx.settings.preferences;
    let editor = preferences
        .editor_path
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .context("no editor configured, set `preferences.editor_path`")?;
    let command_line = editor_command_line(editor, preferences.terminal_path.as_deref());
    ctx.runner
        .spawn_detached(&command_line, &project.base_directory)
        .await?;
    Ok(())
}
