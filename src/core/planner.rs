//! # Test Plan Resolver Module / 测试计划解析模块
//!
//! Decides how a project's tests are invoked. Buildout projects are inspected
//! section by section for known test recipes; pip projects run their
//! configured test command inside the virtualenv.
//!
//! 决定如何调用项目的测试。Buildout 项目逐个检查配置段中已知的测试 recipe；
//! pip 项目在 virtualenv 中运行其配置的测试命令。

use std::path::Path;

use crate::core::error::ConfigError;
use crate::core::models::{Project, ProjectStyle, TestPlan};
use crate::infra::command::quote_arg;

/// Recipe of Django buildout parts.
pub const DJANGO_RECIPE: &str = "djangorecipe";
/// Recipe of generic zope test runner parts.
pub const TESTRUNNER_RECIPE: &str = "zc.recipe.testrunner";

/// A configuration value: one line, or several continuation lines.
/// 配置值：单行，或多个续行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Single(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// The value as one string. For lists this is the first entry.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Single(value) => Some(value),
            ConfigValue::List(values) => values.first().map(String::as_str),
        }
    }

    /// The value as a list; a single value becomes a one-element list.
    /// 以列表形式返回值；单个值变为单元素列表。
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ConfigValue::Single(value) => vec![value.clone()],
            ConfigValue::List(values) => values.clone(),
        }
    }
}

/// Read-only view of a sectioned build configuration.
/// 分段构建配置的只读视图。
pub trait BuildConfiguration {
    /// Section names in declaration order.
    fn section_names(&self) -> Vec<&str>;

    fn value(&self, section: &str, key: &str) -> Option<&ConfigValue>;

    fn has_section(&self, section: &str) -> bool {
        self.section_names().contains(&section)
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.value(section, key).and_then(ConfigValue::as_str)
    }

    fn recipe_of(&self, section: &str) -> Option<&str> {
        self.get(section, "recipe")
    }

    /// The `parts` of the `[buildout]` section.
    fn active_sections(&self) -> Result<Vec<String>, ConfigError> {
        if !self.has_section("buildout") {
            return Err(ConfigError::MissingSection("buildout".to_string()));
        }
        self.value("buildout", "parts")
            .map(ConfigValue::to_list)
            .ok_or_else(|| ConfigError::MissingKey {
                section: "buildout".to_string(),
                key: "parts".to_string(),
            })
    }
}

/// Reads a configuration file into a [`BuildConfiguration`].
/// 将配置文件读取为 [`BuildConfiguration`]。
pub trait SectionReader {
    type Config: BuildConfiguration;

    fn read_sections(&self, path: &Path) -> Result<Self::Config, ConfigError>;
}

/// Derives the test invocations of a buildout configuration.
///
/// Sections are visited in declaration order and kept if they are listed in
/// `parts`. Sections with other recipes contribute nothing, so the plan may be empty.
///
/// 从 buildout 配置推导测试调用。按声明顺序访问各段，仅保留 `parts` 中列出的段。
/// 其他 recipe 的段不产生调用，因此计划可能为空。
pub fn plan_from_sections(config: &impl BuildConfiguration) -> Result<TestPlan, ConfigError> {
    let parts = config.active_sections()?;
    let mut plan = TestPlan::new();

    for section in config.section_names() {
        if !parts.iter().any(|part| part == section) {
            continue;
        }
        match config.recipe_of(section) {
            Some(DJANGO_RECIPE) => {
                if config.value(section, "test").is_some() {
                    let script = config.get(section, "testrunner").unwrap_or("test");
                    plan.push(bin_invocation(script));
                } else {
                    let script = config.get(section, "control-script").unwrap_or(section);
                    plan.push(format!("{} test", bin_invocation(script)));
                }
            }
            Some(TESTRUNNER_RECIPE) => {
                let script = config.get(section, "script").unwrap_or(section);
                plan.push(bin_invocation(script));
            }
            _ => {}
        }
    }

    Ok(plan)
}

/// Produces the ordered test invocations for `project`. Nothing is cached:
/// the configuration is read again on every call.
///
/// 为 `project` 生成有序的测试调用。不做缓存：每次调用都会重新读取配置。
pub fn resolve_test_plan(project: &Project, reader: &impl SectionReader) -> Result<TestPlan, ConfigError> {
    match &project.style {
        ProjectStyle::Buildout => {
            let config = reader.read_sections(&project.buildout_filename())?;
            plan_from_sections(&config)
        }
        ProjectStyle::Pip {
            virtualenv_path,
            test_command,
        } => {
            if test_command.trim().is_empty() {
                return Err(ConfigError::MissingKey {
                    section: "pip".to_string(),
                    key: "test_command".to_string(),
                });
            }
            Ok(vec![format!("{} && {}", activate_command(virtualenv_path), test_command.trim())])
        }
    }
}

/// `. <virtualenv>/bin/activate`, the POSIX spelling of `source`.
pub fn activate_command(virtualenv_path: &str) -> String {
    let activate = Path::new(virtualenv_path).join("bin").join("activate");
    format!(". {}", quote_arg(&activate.to_string_lossy()))
}

fn bin_invocation(script: &str) -> String {
    quote_arg(&format!("bin/{script}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory configuration for exercising the resolver without files.
    #[derive(Clone)]
    struct Sections(Vec<(&'static str, Vec<(&'static str, ConfigValue)>)>);

    impl BuildConfiguration for Sections {
        fn section_names(&self) -> Vec<&str> {
            self.0.iter().map(|(name, _)| *name).collect()
        }

        fn value(&self, section: &str, key: &str) -> Option<&ConfigValue> {
            self.0
                .iter()
                .find(|(name, _)| *name == section)
                .and_then(|(_, values)| values.iter().find(|(k, _)| *k == key))
                .map(|(_, v)| v)
        }
    }

    /// Hands out the same sections on every read and counts the reads.
    struct FixedReader {
        sections: Sections,
        reads: std::cell::Cell<usize>,
    }

    impl SectionReader for FixedReader {
        type Config = Sections;

        fn read_sections(&self, _path: &Path) -> Result<Sections, ConfigError> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.sections.clone())
        }
    }

    fn project(style: ProjectStyle) -> Project {
        Project {
            id: 1,
            name: "web".to_string(),
            base_directory: "/srv/web".into(),
            git_repo: String::new(),
            description: String::new(),
            test_status: false,
            style,
        }
    }

    fn single(value: &str) -> ConfigValue {
        ConfigValue::Single(value.to_string())
    }

    #[test]
    fn test_django_with_test_key_uses_testrunner() {
        let config = Sections(vec![
            ("buildout", vec![("parts", single("web"))]),
            ("web", vec![("recipe", single("djangorecipe")), ("test", single("x"))]),
        ]);
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/test"]);

        let config = Sections(vec![
            ("buildout", vec![("parts", single("web"))]),
            (
                "web",
                vec![
                    ("recipe", single("djangorecipe")),
                    ("test", single("x")),
                    ("testrunner", single("x")),
                ],
            ),
        ]);
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/x"]);
    }

    #[test]
    fn test_django_without_test_key_uses_control_script() {
        let config = Sections(vec![
            ("buildout", vec![("parts", single("web"))]),
            ("web", vec![("recipe", single("djangorecipe"))]),
        ]);
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/web test"]);

        let config = Sections(vec![
            ("buildout", vec![("parts", single("web"))]),
            (
                "web",
                vec![("recipe", single("djangorecipe")), ("control-script", single("manage"))],
            ),
        ]);
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/manage test"]);
    }

    #[test]
    fn test_testrunner_recipe_prefers_script_key() {
        let config = Sections(vec![
            ("buildout", vec![("parts", ConfigValue::List(vec!["unit".into(), "other".into()]))]),
            ("unit", vec![("recipe", single("zc.recipe.testrunner"))]),
            ("other", vec![("recipe", single("zc.recipe.testrunner")), ("script", single("run-other"))]),
        ]);
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/unit", "bin/run-other"]);
    }

    #[test]
    fn test_inactive_and_unknown_sections_are_skipped() {
        let config = Sections(vec![
            ("buildout", vec![("parts", single("eggs"))]),
            ("eggs", vec![("recipe", single("zc.recipe.egg"))]),
            ("web", vec![("recipe", single("djangorecipe"))]),
        ]);
        assert!(plan_from_sections(&config).unwrap().is_empty());
    }

    #[test]
    fn test_missing_buildout_section_is_config_error() {
        let config = Sections(vec![("web", vec![("recipe", single("djangorecipe"))])]);
        assert!(matches!(plan_from_sections(&config), Err(ConfigError::MissingSection(_))));

        let config = Sections(vec![("buildout", vec![])]);
        assert!(matches!(plan_from_sections(&config), Err(ConfigError::MissingKey { .. })));
    }

    #[test]
    fn test_script_names_are_shell_quoted() {
        let config = Sections(vec![
            ("buildout", vec![("parts", single("t"))]),
            ("t", vec![("recipe", single("zc.recipe.testrunner")), ("script", single("x; rm -rf /"))]),
        ]);
        let plan = plan_from_sections(&config).unwrap();
        assert_eq!(plan, vec!["'bin/x; rm -rf /'"]);
    }

    #[test]
    fn test_activate_command_joins_bin_activate() {
        assert_eq!(activate_command("venv/"), ". venv/bin/activate");
        assert_eq!(activate_command("env"), ". env/bin/activate");
    }

    #[test]
    fn test_pip_plan_is_single_activated_invocation() {
        let reader = FixedReader {
            sections: Sections(vec![]),
            reads: Default::default(),
        };
        let pip = project(ProjectStyle::Pip {
            virtualenv_path: "venv/".to_string(),
            test_command: "pytest".to_string(),
        });

        let plan = resolve_test_plan(&pip, &reader).unwrap();

        assert_eq!(plan, vec![". venv/bin/activate && pytest"]);
        assert_eq!(reader.reads.get(), 0);
    }

    #[test]
    fn test_resolving_twice_rereads_and_yields_same_plan() {
        let reader = FixedReader {
            sections: Sections(vec![
                ("buildout", vec![("parts", ConfigValue::List(vec!["web".into(), "unit".into()]))]),
                ("web", vec![("recipe", single("djangorecipe"))]),
                ("unit", vec![("recipe", single("zc.recipe.testrunner"))]),
            ]),
            reads: Default::default(),
        };
        let buildout = project(ProjectStyle::Buildout);

        let first = resolve_test_plan(&buildout, &reader).unwrap();
        let second = resolve_test_plan(&buildout, &reader).unwrap();

        assert_eq!(first, vec!["bin/web test", "bin/unit"]);
        assert_eq!(first, second);
        assert_eq!(reader.reads.get(), 2);
    }
}
