//! # Configuration Module / 配置模块
//!
//! The worker and the CLI share one TOML configuration file (`crane.toml`).
//! Every section is optional and falls back to defaults.
//!
//! worker 和 CLI 共享一个 TOML 配置文件（`crane.toml`）。
//! 每个部分都是可选的，并会回退到默认值。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file name looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "crane.toml";

/// Settings of the worker process and of the channel clients use to reach it.
/// worker 进程及客户端连接通道的设置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Address the worker listens on and dispatchers connect to.
    /// worker 监听、调度器连接的地址。
    #[serde(default = "default_address")]
    pub address: String,
    /// How many handlers may run at once. `1` executes jobs strictly one after another.
    /// Defaults to the number of CPUs.
    /// 同时运行的处理器数量。`1` 表示严格依次执行。默认为 CPU 数量。
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
    /// Seconds a dispatcher waits for the acknowledgement.
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,
    /// Kill a child process after this many seconds. No limit when unset.
    /// 子进程运行超过此秒数后将被终止。未设置时不限制。
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,
    /// Shell used to interpret command strings.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl WorkerConfig {
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_concurrent_jobs: None,
            ack_timeout_secs: default_ack_timeout(),
            process_timeout_secs: None,
            shell: default_shell(),
        }
    }
}

/// Where projects and notifications are persisted.
/// 项目和通知的持久化位置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `projects.json`, `notifications.jsonl` and `dismissed.jsonl`. `~` and `$VARS` are expanded.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Directory with the `bootstrap.py` and `base_buildout.cfg` copied into new buildout projects.
    #[serde(default)]
    pub skeleton_dir: Option<String>,
}

impl StorageConfig {
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_path(&self.data_dir)
    }

    pub fn skeleton_dir(&self) -> Result<Option<PathBuf>> {
        self.skeleton_dir.as_deref().map(expand_path).transpose()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            skeleton_dir: None,
        }
    }
}

/// User preferences consulted by the `EDIT` command.
/// `EDIT` 命令使用的用户偏好设置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Preferences {
    #[serde(default)]
    pub editor_path: Option<String>,
    /// Terminal command line; `#s` is replaced by the editor invocation.
    #[serde(default)]
    pub terminal_path: Option<String>,
}

/// The whole configuration file.
/// 完整的配置文件。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CraneConfig {
    /// The language for console output and notification summaries (e.g., "en", "zh-CN").
    /// 控制台输出和通知摘要使用的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub preferences: Preferences,
}

impl Default for CraneConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            worker: WorkerConfig::default(),
            storage: StorageConfig::default(),
            preferences: Preferences::default(),
        }
    }
}

impl CraneConfig {
    /// Reads the configuration file. A missing default file yields the defaults;
    /// a missing file that was asked for explicitly is an error.
    ///
    /// 读取配置文件。缺少默认文件时使用默认值；显式指定的文件缺失则报错。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn default_language() -> String {
    "en".to_string()
}

fn default_address() -> String {
    "127.0.0.1:5555".to_string()
}

fn default_ack_timeout() -> u64 {
    10
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_data_dir() -> String {
    "~/.crane-jobs".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CraneConfig::parse("").unwrap();
        assert_eq!(config, CraneConfig::default());
        assert_eq!(config.worker.address, "127.0.0.1:5555");
        assert_eq!(config.worker.process_timeout(), None);
        assert!(config.worker.concurrency() >= 1);
    }

    #[test]
    fn test_partial_sections() {
        let config = CraneConfig::parse(
            r#"
            language = "zh-CN"
            [worker]
            max_concurrent_jobs = 1
            process_timeout_secs = 30
            [preferences]
            editor_path = "vim"
            "#,
        )
        .unwrap();
        assert_eq!(config.language, "zh-CN");
        assert_eq!(config.worker.concurrency(), 1);
        assert_eq!(config.worker.process_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.worker.shell, "/bin/sh");
        assert_eq!(config.preferences.editor_path.as_deref(), Some("vim"));
        assert!(config.preferences.terminal_path.is_none());
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let worker = WorkerConfig {
            max_concurrent_jobs: Some(0),
            ..WorkerConfig::default()
        };
        assert_eq!(worker.concurrency(), 1);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CraneConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_data_dir_expands_env() {
        let storage = StorageConfig {
            data_dir: "$HOME/crane".to_string(),
            skeleton_dir: None,
        };
        let expanded = storage.data_dir().unwrap();
        assert!(!expanded.to_string_lossy().contains('$'));
    }
}
