//! # Job Worker Module / 作业 Worker 模块
//!
//! Accepts jobs over TCP, acknowledges them immediately and runs them on an
//! executor that keeps at most `max_concurrent_jobs` handlers in flight.
//!
//! A failing or panicking handler is turned into an error notification and
//! never stops the worker.
//!
//! 通过 TCP 接收作业，立即确认，并在执行器上运行，同时最多保留
//! `max_concurrent_jobs` 个处理器。失败或 panic 的处理器会变成错误通知，不会停止 worker。

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::core::error::JobError;
use crate::core::models::{JobDescriptor, NewNotification, NotificationStatus};
use crate::core::registry::{CommandRegistry, HandlerContext, HandlerSettings};
use crate::infra::command::ProcessRunner;
use crate::infra::store::{NotificationSink, ProjectStore};
use crate::infra::t;
use crate::queue::wire;

/// Receiving side of the job channel.
/// 作业通道的接收端。
pub struct JobWorker {
    registry: Arc<CommandRegistry>,
    projects: Arc<dyn ProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    runner: ProcessRunner,
    settings: HandlerSettings,
    max_concurrent_jobs: usize,
}

impl JobWorker {
    pub fn new(
        registry: Arc<CommandRegistry>,
        projects: Arc<dyn ProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        runner: ProcessRunner,
        settings: HandlerSettings,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            projects,
            notifications,
            runner,
            settings,
            max_concurrent_jobs: max_concurrent_jobs.max(1),
        }
    }

    /// Serves `listener` until `shutdown` is cancelled, then waits for queued
    /// jobs to finish.
    ///
    /// 在 `shutdown` 被取消前持续服务 `listener`，之后等待已排队的作业完成。
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<JobDescriptor>();
        let ctx = HandlerContext::new(
            Arc::clone(&self.projects),
            Arc::clone(&self.notifications),
            self.runner.clone(),
            self.settings.clone(),
            &queue_tx,
        );

        let executor = tokio::spawn(run_executor(
            queue_rx,
            Arc::clone(&self.registry),
            ctx,
            self.max_concurrent_jobs,
        ));

        tracing::info!(
            address = %listener.local_addr()?,
            max_concurrent_jobs = self.max_concurrent_jobs,
            commands = ?self.registry.names(),
            "worker listening"
        );

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, queue_tx.clone(), shutdown.clone()));
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept connection"),
            }
        }

        tracing::info!("worker stopped accepting jobs, draining queue");
        drop(queue_tx);
        if let Err(err) = executor.await {
            tracing::error!(error = %err, "executor task failed");
        }
        Ok(())
    }
}

/// Reads requests from one connection in strict request/reply lock-step.
/// A frame that is not a valid job gets an `ERR` reply and closes the connection.
///
/// 以严格的请求/回复步调读取一个连接上的请求。无效作业帧会收到 `ERR` 回复并关闭连接。
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    queue: mpsc::UnboundedSender<JobDescriptor>,
    shutdown: CancellationToken,
) {
    tracing::debug!(%peer, "connection accepted");
    let mut framed = wire::framed(stream);

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = framed.next() => frame,
        };
        let line = match frame {
            None => break,
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                let err = JobError::from(err);
                tracing::warn!(%peer, error = %err, "unreadable frame, closing connection");
                let _ = framed.send(wire::error_reply(&err.to_string())).await;
                break;
            }
        };

        let job = match JobDescriptor::decode(&line) {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(%peer, error = %err, "malformed job, closing connection");
                let _ = framed.send(wire::error_reply(&err.to_string())).await;
                break;
            }
        };

        if let Err(err) = framed.send(wire::ACK.to_string()).await {
            tracing::warn!(%peer, error = %err, "failed to acknowledge job");
            break;
        }
        tracing::info!(%peer, command = job.command(), "job received");
        if queue.send(job).is_err() {
            break;
        }
    }
    tracing::debug!(%peer, "connection closed");
}

/// Consumes the queue, running up to `concurrency` jobs at once. Ends when
/// every sender is gone and the queue is empty.
async fn run_executor(
    queue: mpsc::UnboundedReceiver<JobDescriptor>,
    registry: Arc<CommandRegistry>,
    ctx: HandlerContext,
    concurrency: usize,
) {
    UnboundedReceiverStream::new(queue)
        .map(|job| execute_job(Arc::clone(&registry), ctx.clone(), job))
        .buffer_unordered(concurrency)
        .for_each(|_| async {})
        .await;
    tracing::info!("executor drained");
}

/// Runs one job to completion and reports failures as notifications.
/// 运行一个作业直至完成，并将失败报告为通知。
pub async fn execute_job(registry: Arc<CommandRegistry>, ctx: HandlerContext, job: JobDescriptor) {
    let Some(handler) = registry.resolve(job.command()) else {
        let err = JobError::CommandNotFound(job.command().to_string());
        tracing::error!(command = job.command(), "{err}");
        report_failure(&ctx, &job, &err, false);
        return;
    };

    // Each handler runs on its own task so a panic is caught as a JoinError.
    let handle = tokio::spawn(handler.call(ctx.clone(), job.clone()));
    let message = match handle.await {
        Ok(Ok(())) => {
            tracing::debug!(command = job.command(), "job finished");
            return;
        }
        Ok(Err(err)) => format!("{err:#}"),
        Err(join_err) if join_err.is_panic() => panic_message(join_err.into_panic()),
        Err(join_err) => join_err.to_string(),
    };

    let err = JobError::Handler {
        command: job.command().to_string(),
        message,
    };
    tracing::error!(command = job.command(), error = %err, "job failed");
    report_failure(&ctx, &job, &err, true);
}

fn report_failure(ctx: &HandlerContext, job: &JobDescriptor, err: &JobError, rerunnable: bool) {
    let summary = match err {
        JobError::CommandNotFound(_) => t!("notify.unknown_command", command = job.command()),
        _ => t!("notify.handler_failed", command = job.command()),
    };
    let mut notification = NewNotification::new(NotificationStatus::Error, summary, err.to_string());
    if let Ok(project_id) = job.project_id() {
        notification = notification.for_project(project_id);
    }
    if rerunnable {
        notification = notification.with_rerun(job);
    }
    if let Err(store_err) = ctx.notifications.create(notification) {
        tracing::error!(command = job.command(), error = %store_err, "failed to store failure notification");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
