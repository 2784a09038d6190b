//! # Crane Jobs Library / Crane Jobs 库
//!
//! A small job queue for project automation. A long-running worker receives
//! named jobs (`BOOTSTRAP`, `BUILDOUT`, `TEST`, ...) over TCP, acknowledges
//! them at once and runs them in the background. Every outcome is stored as a
//! notification.
//!
//! 一个用于项目自动化的小型作业队列。长期运行的 worker 通过 TCP 接收命名作业，
//! 立即确认并在后台运行。每个结果都会存储为一条通知。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, configuration, command registry, test plans
//! - `infra` - Process execution, buildout parsing, persistence
//! - `queue` - Dispatcher, worker and wire format
//! - `reporting` - Console and HTML output
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、配置、命令注册表、测试计划
//! - `infra` - 进程执行、buildout 解析、持久化
//! - `queue` - 调度器、worker 和线路格式
//! - `reporting` - 控制台和 HTML 输出
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod queue;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::registry::CommandRegistry;
pub use queue::{JobDispatcher, JobWorker};

/// Maps a requested locale onto one the application ships.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en" from "en-US"), and finally falls back to "en".
///
/// 将请求的语言映射为应用提供的语言。先匹配完整语言（如 "zh-CN"），
/// 再匹配语言代码，最后回退到 "en"。
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();
    if available_locales.iter().any(|locale| *locale == requested) {
        return requested.to_string();
    }
    let language = requested.split(['-', '_']).next().unwrap_or_default();
    available_locales
        .iter()
        .find(|locale| locale.eq_ignore_ascii_case(language) || locale.split('-').next() == Some(language))
        .map(|locale| locale.to_string())
        .unwrap_or_else(|| "en".to_string())
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
