//! # Project Command Module / 项目命令模块
//!
//! Registers projects, through flags or an interactive wizard, and lists them.
//!
//! 通过参数或交互式向导注册项目，并列出项目。

use anyhow::{Result, bail};
use colored::*;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::path::PathBuf;

use crate::cli::commands::AppContext;
use crate::core::models::{Project, ProjectStyle};
use crate::infra::store::ProjectStore;
use crate::infra::t;
use crate::reporting::print_projects;

/// Values given on the command line. Missing ones are asked for interactively.
/// 命令行上给出的值。缺失的值会以交互方式询问。
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub base_directory: Option<PathBuf>,
    /// `buildout` or `pip`.
    pub style: String,
    pub git_repo: Option<String>,
    pub description: Option<String>,
    pub virtualenv_path: Option<String>,
    pub test_command: Option<String>,
}

impl ProjectDraft {
    /// Builds a project from the draft alone. Name and base directory are required.
    /// 仅由草稿构建项目。名称和基础目录是必需的。
    pub fn into_project(self) -> Result<Project> {
        let Some(name) = self.name.filter(|n| !n.trim().is_empty()) else {
            bail!(t!("project.name_required").to_string());
        };
        let Some(base_directory) = self.base_directory else {
            bail!(t!("project.dir_required").to_string());
        };
        let style = match self.style.as_str() {
            "pip" => ProjectStyle::Pip {
                virtualenv_path: self.virtualenv_path.unwrap_or_else(|| "venv/".to_string()),
                test_command: self.test_command.unwrap_or_default(),
            },
            "buildout" => ProjectStyle::Buildout,
            other => bail!(t!("project.unknown_style", style = other).to_string()),
        };
        Ok(Project {
            id: 0,
            name: name.trim().to_string(),
            base_directory,
            git_repo: self.git_repo.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            test_status: false,
            style,
        })
    }
}

/// Asks for every field the draft does not have yet.
fn complete_interactively(mut draft: ProjectDraft) -> Result<ProjectDraft> {
    let theme = ColorfulTheme::default();
    println!("\n{}", t!("project.wizard_welcome").bold().cyan());

    if draft.name.is_none() {
        let name: String = Input::with_theme(&theme)
            .with_prompt(t!("project.prompt_name").to_string())
            .interact_text()?;
        draft.name = Some(name);
    }
    if draft.base_directory.is_none() {
        let dir: String = Input::with_theme(&theme)
            .with_prompt(t!("project.prompt_dir").to_string())
            .interact_text()?;
        let expanded = shellexpand::full(&dir)?.into_owned();
        draft.base_directory = Some(PathBuf::from(expanded));
    }
    if draft.git_repo.is_none() {
        let repo: String = Input::with_theme(&theme)
            .with_prompt(t!("project.prompt_git").to_string())
            .allow_empty(true)
            .interact_text()?;
        draft.git_repo = Some(repo);
    }

    let styles = ["buildout", "pip"];
    let default_style = styles.iter().position(|s| *s == draft.style).unwrap_or(0);
    let selected = Select::with_theme(&theme)
        .with_prompt(t!("project.prompt_style").to_string())
        .items(&styles)
        .default(default_style)
        .interact()?;
    draft.style = styles[selected].to_string();

    if draft.style == "pip" {
        if draft.virtualenv_path.is_none() {
            let venv: String = Input::with_theme(&theme)
                .with_prompt(t!("project.prompt_virtualenv").to_string())
                .default("venv/".to_string())
                .interact_text()?;
            draft.virtualenv_path = Some(venv);
        }
        if draft.test_command.is_none() {
            let command: String = Input::with_theme(&theme)
                .with_prompt(t!("project.prompt_test_command").to_string())
                .default("py.test".to_string())
                .interact_text()?;
            draft.test_command = Some(command);
        }
    }
    Ok(draft)
}

pub fn add(app: &AppContext, draft: ProjectDraft, non_interactive: bool) -> Result<()> {
    let draft = if non_interactive || (draft.name.is_some() && draft.base_directory.is_some()) {
        draft
    } else {
        complete_interactively(draft)?
    };

    let store = app.open_store()?;
    let project = store.insert(draft.into_project()?)?;
    println!(
        "{}",
        t!("project.added", locale = &app.locale, id = project.id, name = project.name).green()
    );
    Ok(())
}

pub fn list(app: &AppContext) -> Result<()> {
    let store = app.open_store()?;
    let projects = ProjectStore::list(&*store)?;
    print_projects(&projects, &app.locale);
    Ok(())
}
