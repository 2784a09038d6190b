//! # Core Module / 核心模块
//!
//! Data models, configuration, the command registry with its built-in
//! commands, and the test plan resolution and execution logic.
//!
//! 数据模型、配置、命令注册表及其内置命令，以及测试计划的解析与执行逻辑。

pub mod commands;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod planner;
pub mod registry;

// Re-exports
pub use error::JobError;
pub use models::JobDescriptor;
pub use registry::CommandRegistry;
