//! # Init Command Module / 初始化命令模块
//!
//! This module implements the `init` command, which writes a commented
//! default `crane.toml`.
//!
//! 此模块实现 `init` 命令，用于写入带注释的默认 `crane.toml`。

use anyhow::{Context, Result};
use colored::*;
use std::{fs, path::PathBuf};

use crate::infra::t;

const DEFAULT_CONFIG: &str = r#"# Crane configuration / Crane 配置

# Language for console output and notifications / 控制台输出和通知的语言
language = "{language}"

[worker]
# Address the worker listens on / worker 监听的地址
address = "127.0.0.1:5555"
# Jobs running at the same time, defaults to the number of CPUs / 同时运行的作业数，默认为 CPU 数量
# max_concurrent_jobs = 4
# Seconds a client waits for the acknowledgement / 客户端等待确认的秒数
ack_timeout_secs = 10
# Kill commands running longer than this / 终止运行时间超过此值的命令
# process_timeout_secs = 1800
shell = "/bin/sh"

[storage]
# Projects and notifications are stored here / 项目和通知存储于此
data_dir = "~/.crane-jobs"
# Directory with bootstrap.py and base_buildout.cfg / 包含 bootstrap.py 和 base_buildout.cfg 的目录
# skeleton_dir = "~/.crane-jobs/skeleton"

[preferences]
# editor_path = "vim"
# `#s` is replaced by the editor command / `#s` 会被替换为编辑器命令
# terminal_path = "xterm -e #s"
"#;

/// Renders the default configuration for `language`.
pub fn default_config(language: &str) -> String {
    DEFAULT_CONFIG.replace("{language}", language)
}

/// Executes the init command with the provided arguments.
///
/// # Arguments
/// * `output` - Path for the new configuration file
/// * `force` - Whether to overwrite an existing file
/// * `language` - Language written into the file
pub fn execute(output: PathBuf, force: bool, language: String) -> Result<()> {
    rust_i18n::set_locale(&language);

    // Check if file already exists
    if output.exists() && !force {
        println!("{}", t!("init.file_exists", path = output.display()).red());
        println!("{}", t!("init.use_force").yellow());
        return Ok(());
    }

    // Create parent directories if needed
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                t!("init.create_parent_dir_failed", path = parent.display()).to_string()
            })?;
        }
    }

    fs::write(&output, default_config(&language))
        .with_context(|| t!("init.write_failed", path = output.display()).to_string())?;

    println!("{}", t!("init.success", path = output.display()).green());
    println!("{}", t!("init.next_steps"));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CraneConfig;

    #[test]
    fn test_default_config_parses() {
        let config = CraneConfig::parse(&default_config("zh-CN")).unwrap();
        assert_eq!(config.language, "zh-CN");
        assert_eq!(config.worker.address, "127.0.0.1:5555");
        assert_eq!(config.storage.data_dir, "~/.crane-jobs");
    }
}
