//! # Buildout Configuration Reader / Buildout 配置读取模块
//!
//! A small reader for the INI dialect used by `buildout.cfg`:
//!
//! ```text
//! [buildout]
//! parts =
//!     web
//!     tests
//!
//! [web]
//! recipe = djangorecipe
//! ```
//!
//! Values spread over indented continuation lines become lists. Lines starting
//! with `#` or `;` are comments.
//!
//! 用于 `buildout.cfg` 所用 INI 方言的小型读取器。跨越缩进续行的值会变为列表。

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::ConfigError;
use crate::core::planner::{BuildConfiguration, ConfigValue, SectionReader};

/// One `[name]` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub values: Vec<(String, ConfigValue)>,
}

impl Section {
    fn set(&mut self, key: String, value: ConfigValue) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.values.push((key, value)),
        }
    }
}

/// A parsed buildout file, sections kept in declaration order.
/// 解析后的 buildout 文件，按声明顺序保存各段。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildoutConfig {
    sections: Vec<Section>,
}

/// A key whose value is still being collected.
struct PendingValue {
    key: String,
    first: String,
    continuation: Vec<String>,
}

impl PendingValue {
    fn finish(self) -> (String, ConfigValue) {
        if self.continuation.is_empty() {
            return (self.key, ConfigValue::Single(self.first));
        }
        let mut lines = Vec::with_capacity(self.continuation.len() + 1);
        if !self.first.is_empty() {
            lines.push(self.first);
        }
        lines.extend(self.continuation);
        (self.key, ConfigValue::List(lines))
    }
}

impl BuildoutConfig {
    /// Parses `content`; `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let malformed = |line: usize, reason: &str| ConfigError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: reason.to_string(),
        };

        let mut config = BuildoutConfig::default();
        let mut current: Option<usize> = None;
        let mut pending: Option<PendingValue> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = line.len() != trimmed.len();
            if indented {
                match pending.as_mut() {
                    Some(value) => value.continuation.push(trimmed.to_string()),
                    None => return Err(malformed(line_no, "continuation line without a key")),
                }
                continue;
            }

            if let (Some(value), Some(section)) = (pending.take(), current) {
                let (key, value) = value.finish();
                config.sections[section].set(key, value);
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| malformed(line_no, "invalid section header"))?;
                current = Some(config.section_index(name));
                continue;
            }

            if current.is_none() {
                return Err(malformed(line_no, "option outside of a section"));
            }
            let (key, value) = trimmed
                .split_once('=')
                .ok_or_else(|| malformed(line_no, "expected `key = value`"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed(line_no, "empty option name"));
            }
            pending = Some(PendingValue {
                key: key.to_string(),
                first: value.trim().to_string(),
                continuation: Vec::new(),
            });
        }

        if let (Some(value), Some(section)) = (pending, current) {
            let (key, value) = value.finish();
            config.sections[section].set(key, value);
        }

        Ok(config)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn section_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.sections.iter().position(|s| s.name == name) {
            return index;
        }
        self.sections.push(Section {
            name: name.to_string(),
            values: Vec::new(),
        });
        self.sections.len() - 1
    }
}

impl BuildConfiguration for BuildoutConfig {
    fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    fn value(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.sections
            .iter()
            .find(|s| s.name == section)
            .and_then(|s| s.values.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v)
    }
}

/// Reads `buildout.cfg` files from disk.
/// 从磁盘读取 `buildout.cfg` 文件。
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildoutFileReader;

impl SectionReader for BuildoutFileReader {
    type Config = BuildoutConfig;

    fn read_sections(&self, path: &Path) -> Result<BuildoutConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: PathBuf::from(path),
            source,
        })?;
        BuildoutConfig::parse(&content, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::plan_from_sections;

    fn parse(content: &str) -> Result<BuildoutConfig, ConfigError> {
        BuildoutConfig::parse(content, Path::new("buildout.cfg"))
    }

    #[test]
    fn test_continuation_lines_become_lists() {
        let config = parse(
            "[buildout]\n\
             parts =\n    web\n    tests\n\
             eggs = django\n",
        )
        .unwrap();
        assert_eq!(
            config.value("buildout", "parts"),
            Some(&ConfigValue::List(vec!["web".into(), "tests".into()]))
        );
        assert_eq!(config.get("buildout", "eggs"), Some("django"));
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let config = parse(
            "# leading comment\n\
             [buildout]\n\
             ; another\n\
             parts = web\n\
             \n\
             [web]\n\
             recipe = djangorecipe\n",
        )
        .unwrap();
        assert_eq!(config.section_names(), vec!["buildout", "web"]);
        assert_eq!(config.recipe_of("web"), Some("djangorecipe"));
    }

    #[test]
    fn test_declaration_order_drives_the_plan() {
        let config = parse(
            "[buildout]\nparts =\n    web\n    unit\n\
             [unit]\nrecipe = zc.recipe.testrunner\n\
             [web]\nrecipe = djangorecipe\n",
        )
        .unwrap();
        assert_eq!(plan_from_sections(&config).unwrap(), vec!["bin/unit", "bin/web test"]);
    }

    #[test]
    fn test_malformed_lines_report_line_numbers() {
        match parse("[buildout]\nparts web\n") {
            Err(ConfigError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {other:?}"),
        }
        assert!(matches!(parse("key = value\n"), Err(ConfigError::Malformed { line: 1, .. })));
        assert!(matches!(parse("[buildout\n"), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let result = BuildoutFileReader.read_sections(&dir.path().join("buildout.cfg"));
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }
}
