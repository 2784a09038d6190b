//! # Infrastructure Module / 基础设施模块
//!
//! Process execution, buildout file parsing, project directories and
//! persistence.
//!
//! 进程执行、buildout 文件解析、项目目录和持久化。

pub mod buildout;
pub mod command;
pub mod fs;
pub mod store;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
