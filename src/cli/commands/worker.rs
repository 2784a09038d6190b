//! # Worker Command Module / Worker 命令模块
//!
//! Runs the job worker in the foreground until Ctrl-C.
//!
//! 在前台运行作业 worker，直到按下 Ctrl-C。

use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::cli::commands::AppContext;
use crate::core::registry::{CommandRegistry, HandlerSettings};
use crate::infra::command::ProcessRunner;
use crate::infra::t;
use crate::queue::JobWorker;

pub async fn execute(app: &AppContext, address: Option<String>, jobs: Option<usize>) -> Result<()> {
    let locale = &app.locale;
    let worker_config = &app.config.worker;
    let address = address.unwrap_or_else(|| worker_config.address.clone());
    let concurrency = jobs.unwrap_or_else(|| worker_config.concurrency()).max(1);

    let store = app.open_store()?;
    let registry = Arc::new(CommandRegistry::with_builtins());
    let runner = ProcessRunner::new(worker_config.shell.clone(), worker_config.process_timeout());
    let settings = HandlerSettings::from_config(&app.config)?;

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| t!("worker.bind_failed", locale = locale, address = address).to_string())?;

    println!(
        "{}",
        t!("worker.listening", locale = locale, address = address, jobs = concurrency).green()
    );
    println!(
        "{}",
        t!("worker.data_dir", locale = locale, path = store.root().display()).cyan()
    );

    let shutdown = setup_signal_handler(locale);
    let worker = JobWorker::new(registry, store.clone(), store, runner, settings, concurrency);
    worker.serve(listener, shutdown).await?;

    println!("{}", t!("worker.stopped", locale = locale).yellow());
    Ok(())
}

fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
        token_clone.cancel();
    });

    token
}
