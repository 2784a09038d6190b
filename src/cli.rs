//! # Command Line Interface Module / 命令行接口模块
//!
//! Builds the `crane` command line with localized help texts and routes each
//! subcommand to its implementation in `cli::commands`.
//!
//! 构建带本地化帮助文本的 `crane` 命令行，并将每个子命令路由到 `cli::commands` 中的实现。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::models::ProjectId;
use crate::infra::t;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|arg| arg == "--lang")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn project_arg(locale: &str) -> Arg {
    Arg::new("project")
        .short('p')
        .long("project")
        .help(t!("arg_project", locale = locale).to_string())
        .value_name("PROJECT_ID")
        .required(true)
        .value_parser(clap::value_parser!(ProjectId))
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("crane")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("arg_config", locale = locale).to_string())
                .value_name("CONFIG")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("worker")
                .about(t!("cmd_worker_about", locale = locale).to_string())
                .arg(
                    Arg::new("address")
                        .long("address")
                        .help(t!("arg_address", locale = locale).to_string())
                        .value_name("ADDRESS")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("enqueue")
                .about(t!("cmd_enqueue_about", locale = locale).to_string())
                .arg(
                    Arg::new("command")
                        .help(t!("arg_command", locale = locale).to_string())
                        .value_name("COMMAND")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(project_arg(locale))
                .arg(
                    Arg::new("arg")
                        .long("arg")
                        .help(t!("arg_extra", locale = locale).to_string())
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("rerun")
                .about(t!("cmd_rerun_about", locale = locale).to_string())
                .arg(
                    Arg::new("notification")
                        .help(t!("arg_notification", locale = locale).to_string())
                        .value_name("NOTIFICATION_ID")
                        .required(true)
                        .value_parser(clap::value_parser!(u64))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about(t!("cmd_plan_about", locale = locale).to_string())
                .arg(project_arg(locale)),
        )
        .subcommand(
            Command::new("project")
                .about(t!("cmd_project_about", locale = locale).to_string())
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about(t!("cmd_project_add_about", locale = locale).to_string())
                        .arg(
                            Arg::new("name")
                                .long("name")
                                .help(t!("arg_project_name", locale = locale).to_string())
                                .value_name("NAME")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("dir")
                                .long("dir")
                                .help(t!("arg_project_dir", locale = locale).to_string())
                                .value_name("BASE_DIRECTORY")
                                .value_parser(clap::value_parser!(PathBuf))
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("style")
                                .long("style")
                                .help(t!("arg_project_style", locale = locale).to_string())
                                .value_name("STYLE")
                                .value_parser(["buildout", "pip"])
                                .default_value("buildout")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("git")
                                .long("git")
                                .help(t!("arg_project_git", locale = locale).to_string())
                                .value_name("URL")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .help(t!("arg_project_description", locale = locale).to_string())
                                .value_name("TEXT")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("virtualenv")
                                .long("virtualenv")
                                .help(t!("arg_project_virtualenv", locale = locale).to_string())
                                .value_name("PATH")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("test-command")
                                .long("test-command")
                                .help(t!("arg_project_test_command", locale = locale).to_string())
                                .value_name("COMMAND")
                                .action(ArgAction::Set),
                        )
                        .arg(
                            Arg::new("non-interactive")
                                .long("non-interactive")
                                .help(t!("arg_non_interactive", locale = locale).to_string())
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("list").about(t!("cmd_project_list_about", locale = locale).to_string()),
                ),
        )
        .subcommand(
            Command::new("notifications")
                .about(t!("cmd_notifications_about", locale = locale).to_string())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .help(t!("arg_all", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .subcommand(
                    Command::new("show")
                        .about(t!("cmd_notifications_show_about", locale = locale).to_string())
                        .arg(notification_arg(locale)),
                )
                .subcommand(
                    Command::new("dismiss")
                        .about(t!("cmd_notifications_dismiss_about", locale = locale).to_string())
                        .arg(notification_arg(locale)),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("arg_output", locale = locale).to_string())
                        .value_name("PATH")
                        .default_value(crate::core::config::DEFAULT_CONFIG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn notification_arg(locale: &str) -> Arg {
    Arg::new("notification")
        .help(t!("arg_notification", locale = locale).to_string())
        .value_name("NOTIFICATION_ID")
        .required(true)
        .value_parser(clap::value_parser!(u64))
        .action(ArgAction::Set)
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let requested = pre_parse_language();
    let help_locale = crate::resolve_locale(
        requested
            .clone()
            .or_else(sys_locale::get_locale)
            .as_deref()
            .unwrap_or("en"),
    );
    rust_i18n::set_locale(&help_locale);

    let matches = build_cli(&help_locale).get_matches();
    dispatch(&matches, requested).await
}

async fn dispatch(matches: &ArgMatches, requested_locale: Option<String>) -> Result<()> {
    let config_path = matches.get_one::<PathBuf>("config").cloned();

    if let Some(("init", init_matches)) = matches.subcommand() {
        let output = init_matches
            .get_one::<PathBuf>("output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(crate::core::config::DEFAULT_CONFIG_FILE));
        let force = init_matches.get_flag("force");
        let language = requested_locale
            .or_else(sys_locale::get_locale)
            .map(|l| crate::resolve_locale(&l))
            .unwrap_or_else(|| "en".to_string());
        return commands::init::execute(output, force, language);
    }

    let app = commands::AppContext::load(config_path.as_deref(), requested_locale.as_deref())?;

    match matches.subcommand() {
        Some(("worker", sub)) => {
            let address = sub.get_one::<String>("address").cloned();
            let jobs = sub.get_one::<usize>("jobs").copied();
            commands::worker::execute(&app, address, jobs).await
        }
        Some(("enqueue", sub)) => {
            let command = sub
                .get_one::<String>("command")
                .cloned()
                .unwrap_or_default();
            let project = sub.get_one::<ProjectId>("project").copied().unwrap_or_default();
            let extra: Vec<String> = sub
                .get_many::<String>("arg")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            commands::enqueue::execute(&app, &command, project, &extra).await
        }
        Some(("rerun", sub)) => {
            let id = sub.get_one::<u64>("notification").copied().unwrap_or_default();
            commands::enqueue::rerun(&app, id).await
        }
        Some(("plan", sub)) => {
            let project = sub.get_one::<ProjectId>("project").copied().unwrap_or_default();
            commands::plan::execute(&app, project)
        }
        Some(("project", sub)) => match sub.subcommand() {
            Some(("add", add)) => {
                let draft = commands::project::ProjectDraft {
                    name: add.get_one::<String>("name").cloned(),
                    base_directory: add.get_one::<PathBuf>("dir").cloned(),
                    style: add
                        .get_one::<String>("style")
                        .cloned()
                        .unwrap_or_else(|| "buildout".to_string()),
                    git_repo: add.get_one::<String>("git").cloned(),
                    description: add.get_one::<String>("description").cloned(),
                    virtualenv_path: add.get_one::<String>("virtualenv").cloned(),
                    test_command: add.get_one::<String>("test-command").cloned(),
                };
                commands::project::add(&app, draft, add.get_flag("non-interactive"))
            }
            Some(("list", _)) => commands::project::list(&app),
            _ => Ok(()),
        },
        Some(("notifications", sub)) => match sub.subcommand() {
            Some(("show", show)) => {
                let id = show.get_one::<u64>("notification").copied().unwrap_or_default();
                commands::notifications::show(&app, id)
            }
            Some(("dismiss", dismiss)) => {
                let id = dismiss.get_one::<u64>("notification").copied().unwrap_or_default();
                commands::notifications::dismiss(&app, id)
            }
            _ => {
                let all = sub.get_flag("all");
                let html = sub.get_one::<PathBuf>("html").cloned();
                commands::notifications::list(&app, all, html)
            }
        },
        _ => {
            // Clap has already printed the help text.
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli("en").debug_assert();
    }

    #[test]
    fn test_enqueue_collects_repeated_args() {
        let matches = build_cli("en")
            .try_get_matches_from([
                "crane", "enqueue", "STARTAPP", "--project", "3", "--arg", "app_name=blog", "--arg", "x=1",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let args: Vec<&String> = sub.get_many::<String>("arg").unwrap().collect();
        assert_eq!(args, ["app_name=blog", "x=1"]);
        assert_eq!(sub.get_one::<ProjectId>("project"), Some(&3));
    }

    #[test]
    fn test_every_argument_has_help() {
        fn check(command: &Command) {
            for arg in command.get_arguments() {
                if matches!(arg.get_id().as_str(), "help" | "version") {
                    continue;
                }
                assert!(
                    arg.get_help().is_some(),
                    "`{}` of `{}` has no help text",
                    arg.get_id(),
                    command.get_name()
                );
            }
            for sub in command.get_subcommands() {
                check(sub);
            }
        }
        check(&build_cli("en"));
    }
}
