//! # Error Taxonomy Module / 错误分类模块
//!
//! Typed errors for the dispatch protocol and the execution engine. Handler
//! bodies and the CLI use `anyhow`; these types mark the boundaries where a
//! caller has to tell failures apart.
//!
//! 调度协议和执行引擎的类型化错误。处理器内部和 CLI 使用 `anyhow`；
//! 这些类型用于调用方必须区分失败类型的边界。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A process could not be started at all (as opposed to exiting non-zero).
/// 进程根本无法启动（区别于以非零状态退出）。
#[derive(Debug, Error)]
#[error("failed to launch `{command}` in {}: {source}", working_directory.display())]
pub struct LaunchError {
    pub command: String,
    pub working_directory: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Declarative build configuration could not be read or is missing required data.
/// 无法读取声明式构建配置，或缺少必需的数据。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("section [{0}] is missing")]
    MissingSection(String),
    #[error("key `{key}` is missing from section [{section}]")]
    MissingKey { section: String, key: String },
}

/// Errors of the job dispatch protocol and the worker loop.
/// 作业调度协议和 worker 循环的错误。
#[derive(Debug, Error)]
pub enum JobError {
    /// The acknowledgement was missing or not the expected token. The job may or may not have been received.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("command not found: {0}")]
    CommandNotFound(String),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("handler for {command} failed: {message}")]
    Handler { command: String, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid job: {0}")]
    InvalidJob(String),
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("malformed job message: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<tokio_util::codec::LinesCodecError> for JobError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::Io(e) => JobError::Transport(e),
            other => JobError::Protocol(other.to_string()),
        }
    }
}
