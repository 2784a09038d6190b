//! # Job Dispatcher Module / 作业调度模块
//!
//! Sends jobs to a worker and waits for the acknowledgement. An
//! acknowledgement means the worker received the job, not that it ran.
//!
//! 将作业发送给 worker 并等待确认。确认仅表示 worker 已收到作业，而不是已运行。

use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::core::config::WorkerConfig;
use crate::core::error::JobError;
use crate::core::models::JobDescriptor;
use crate::core::registry::CommandRegistry;
use crate::queue::wire::{self, JobFramed};

/// Client side of the job channel. Owns one connection; concurrent calls are
/// serialized so request and reply never interleave.
///
/// 作业通道的客户端。拥有一个连接；并发调用会被串行化，请求和回复不会交错。
#[derive(Debug)]
pub struct JobDispatcher {
    address: String,
    known_commands: HashSet<String>,
    ack_timeout: Duration,
    connection: Mutex<Option<JobFramed>>,
}

impl JobDispatcher {
    pub fn new(
        address: impl Into<String>,
        known_commands: impl IntoIterator<Item = String>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            known_commands: known_commands.into_iter().collect(),
            ack_timeout,
            connection: Mutex::new(None),
        }
    }

    /// A dispatcher that accepts the commands of `registry`.
    pub fn from_registry(registry: &CommandRegistry, config: &WorkerConfig) -> Self {
        Self::new(config.address.clone(), registry.names(), config.ack_timeout())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Builds a job from `command` and `arguments` and sends it.
    /// 由 `command` 和 `arguments` 构建作业并发送。
    pub async fn dispatch(&self, command: &str, arguments: Map<String, Value>) -> Result<(), JobError> {
        let job = JobDescriptor::new(command, arguments)?;
        self.send(&job).await
    }

    /// Sends an already built job. Unknown commands are rejected before any
    /// network traffic happens.
    pub async fn send(&self, job: &JobDescriptor) -> Result<(), JobError> {
        if !self.known_commands.contains(job.command()) {
            return Err(JobError::CommandNotFound(job.command().to_string()));
        }
        self.exchange(job.encode()).await?;
        tracing::info!(command = job.command(), address = %self.address, "job acknowledged");
        Ok(())
    }

    /// Sends a stored rerun descriptor again, unchanged.
    /// 原样重新发送已存储的重新运行描述符。
    pub async fn resubmit(&self, rerun_job: &str) -> Result<(), JobError> {
        let job = JobDescriptor::decode(rerun_job)?;
        if !self.known_commands.contains(job.command()) {
            return Err(JobError::CommandNotFound(job.command().to_string()));
        }
        self.exchange(rerun_job.trim().to_string()).await?;
        tracing::info!(command = job.command(), address = %self.address, "job resubmitted");
        Ok(())
    }

    async fn exchange(&self, frame: String) -> Result<(), JobError> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            let stream = TcpStream::connect(&self.address).await?;
            tracing::debug!(address = %self.address, "connected to worker");
            *guard = Some(wire::framed(stream));
        }
        let Some(framed) = guard.as_mut() else {
            return Err(JobError::Protocol("connection unavailable".to_string()));
        };

        let result = Self::round_trip(framed, frame, self.ack_timeout).await;
        if result.is_err() {
            // The peer's state is unknown after a failed exchange; reconnect next time.
            *guard = None;
        }
        result
    }

    async fn round_trip(framed: &mut JobFramed, frame: String, ack_timeout: Duration) -> Result<(), JobError> {
        framed.send(frame).await?;
        match tokio::time::timeout(ack_timeout, framed.next()).await {
            Ok(Some(Ok(reply))) => wire::check_reply(&reply),
            Ok(Some(Err(err))) => Err(err.into()),
            Ok(None) => Err(JobError::Protocol(
                "connection closed before acknowledgement".to_string(),
            )),
            Err(_) => Err(JobError::Protocol(format!(
                "no acknowledgement within {} ms",
                ack_timeout.as_millis()
            ))),
        }
    }
}
