//! # Process Runner Module / 进程运行模块
//!
//! Runs shell command lines inside a project directory and captures their
//! combined output. Shell interpretation is deliberate: plans contain `&&`,
//! `.` (source) and redirections.
//!
//! 在项目目录中运行 shell 命令行并捕获合并后的输出。

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::core::error::LaunchError;
use crate::core::models::ExecutionResult;

/// Launches shell commands with an optional kill timeout.
/// 启动 shell 命令，可选超时终止。
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new("/bin/sh", None)
    }
}

impl ProcessRunner {
    pub fn new(shell: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn shell_command(&self, shell_command: &str, working_directory: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(shell_command)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Runs `shell_command` in `working_directory`, blocking until it exits.
    ///
    /// A non-zero exit is a normal result; only a failure to start the process
    /// is an error.
    ///
    /// 在 `working_directory` 中运行 `shell_command`，直到其退出。
    /// 非零退出是正常结果；只有进程无法启动才是错误。
    pub async fn run(
        &self,
        shell_command: &str,
        working_directory: &Path,
    ) -> Result<ExecutionResult, LaunchError> {
        let launch_error = |source| LaunchError {
            command: shell_command.to_string(),
            working_directory: working_directory.to_path_buf(),
            source,
        };
        // Command::spawn reports a missing cwd as a generic NotFound; name the directory instead.
        if !working_directory.is_dir() {
            return Err(launch_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("working directory {} does not exist", working_directory.display()),
            )));
        }

        let start = Instant::now();
        let cmd = self.shell_command(shell_command, working_directory);
        let (status, output, timed_out) = spawn_and_capture(cmd, self.timeout)
            .await
            .map_err(launch_error)?;
        let duration = start.elapsed();

        let exit_code = status.and_then(|s| s.code());
        tracing::debug!(
            command = shell_command,
            cwd = %working_directory.display(),
            exit_code,
            timed_out,
            elapsed_ms = duration.as_millis() as u64,
            "process finished"
        );

        Ok(ExecutionResult {
            command: shell_command.to_string(),
            exit_code,
            output,
            duration,
            timed_out,
        })
    }

    /// Starts `shell_command` in the background without waiting for it or
    /// capturing its output. Used for interactive programs such as editors.
    ///
    /// 在后台启动 `shell_command`，不等待也不捕获输出。用于编辑器等交互式程序。
    pub async fn spawn_detached(&self, shell_command: &str, working_directory: &Path) -> Result<(), LaunchError> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(format!("( {shell_command} ) &"))
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // The shell backgrounds the program and exits at once.
        let status = cmd.status().await.map_err(|source| LaunchError {
            command: shell_command.to_string(),
            working_directory: working_directory.to_path_buf(),
            source,
        })?;
        tracing::debug!(command = shell_command, ?status, "detached process launched");
        Ok(())
    }
}

/// Quotes a value for interpolation into a shell command line.
/// NUL bytes cannot be passed to a shell at all and are dropped.
///
/// 为插入 shell 命令行而对值进行转义。NUL 字节无法传递给 shell，会被丢弃。
pub fn quote_arg(value: &str) -> String {
    let cleaned = value.replace('\0', "");
    shlex::try_quote(&cleaned)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_default()
}

/// Spawns a command and captures its stdout and stderr into one string.
/// The streams are read concurrently as raw bytes until EOF; invalid UTF-8 is
/// replaced once the process has finished.
///
/// Returns the exit status (`None` if the process was killed after `timeout`),
/// the combined output and whether the timeout fired.
///
/// 派生一个命令，将其 stdout 和 stderr 捕获到一个字符串中。
/// 两个流以原始字节并发读取直至 EOF，进程结束后再替换无效的 UTF-8。
pub async fn spawn_and_capture(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> std::io::Result<(Option<ExitStatus>, String, bool)> {
    let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    // Both reader tasks append raw bytes to the same buffer, in arrival order.
    // 两个读取任务按到达顺序将原始字节写入同一个缓冲区。
    let output = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let stdout_handle = tokio::spawn(drain_into(stdout, Arc::clone(&output)));
    let stderr_handle = tokio::spawn(drain_into(stderr, Arc::clone(&output)));

    let (status, timed_out) = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => (Some(status?), false),
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs(), "process timed out, killing it");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed out process");
                }
                (None, true)
            }
        },
        None => (Some(child.wait().await?), false),
    };

    // Wait for the readers so no trailing output is lost. After a kill, orphaned
    // grandchildren may still hold the pipes open, so only wait briefly.
    // 等待读取任务结束，确保不丢失尾部输出。
    let grace = timed_out.then_some(READER_GRACE);
    join_reader(stdout_handle, grace).await;
    join_reader(stderr_handle, grace).await;

    let output = String::from_utf8_lossy(&output.lock().await).into_owned();
    Ok((status, output, timed_out))
}

const READ_CHUNK: usize = 8 * 1024;

/// Copies `stream` into `output` until EOF. Read errors end the copy but are
/// logged; the bytes read so far are kept.
async fn drain_into<R>(mut stream: R, output: Arc<tokio::sync::Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => output.lock().await.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process output");
                break;
            }
        }
    }
}

const READER_GRACE: Duration = Duration::from_millis(500);

async fn join_reader(mut handle: JoinHandle<()>, grace: Option<Duration>) {
    let joined = match grace {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return;
            }
        },
        None => handle.await,
    };
    if let Err(e) = joined {
        tracing::warn!(error = %e, "failed to join output reader");
    }
}
