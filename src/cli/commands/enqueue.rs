//! # Enqueue Command Module / 入队命令模块
//!
//! Sends jobs to a running worker: new ones with `enqueue`, stored ones with
//! `rerun`.
//!
//! 向运行中的 worker 发送作业：新作业使用 `enqueue`，已存储的作业使用 `rerun`。

use anyhow::{Context, Result, anyhow};
use colored::*;
use serde_json::{Map, Value};

use crate::cli::commands::AppContext;
use crate::core::models::ProjectId;
use crate::core::registry::CommandRegistry;
use crate::infra::store::NotificationSink;
use crate::infra::t;
use crate::queue::JobDispatcher;

/// Splits `key=value`. Values that parse as JSON scalars (`3`, `true`, `null`)
/// keep their type; everything else is a string.
///
/// 拆分 `key=value`。可解析为 JSON 标量的值保留其类型；其余均为字符串。
pub fn parse_arg(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty argument name in `{raw}`"));
    }
    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn dispatcher(app: &AppContext) -> JobDispatcher {
    JobDispatcher::from_registry(&CommandRegistry::with_builtins(), &app.config.worker)
}

pub async fn execute(app: &AppContext, command: &str, project: ProjectId, extra: &[String]) -> Result<()> {
    let mut arguments = Map::new();
    arguments.insert("project_id".to_string(), Value::from(project));
    for raw in extra {
        let (key, value) = parse_arg(raw)?;
        arguments.insert(key, value);
    }

    let dispatcher = dispatcher(app);
    dispatcher
        .dispatch(command, arguments)
        .await
        .with_context(|| t!("enqueue.failed", command = command, address = dispatcher.address()).to_string())?;

    println!(
        "{}",
        t!("enqueue.acknowledged", locale = &app.locale, command = command, project = project).green()
    );
    Ok(())
}

/// Resubmits the `rerun_job` stored with a notification.
/// 重新提交通知中存储的 `rerun_job`。
pub async fn rerun(app: &AppContext, notification_id: u64) -> Result<()> {
    let store = app.open_store()?;
    let notification = NotificationSink::get(&*store, notification_id)?;
    let rerun_job = notification
        .rerun_job
        .ok_or_else(|| anyhow!(t!("rerun.not_rerunnable", id = notification_id).to_string()))?;

    let dispatcher = dispatcher(app);
    dispatcher
        .resubmit(&rerun_job)
        .await
        .with_context(|| t!("enqueue.failed", command = rerun_job, address = dispatcher.address()).to_string())?;

    println!(
        "{}",
        t!("rerun.acknowledged", locale = &app.locale, id = notification_id).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_keeps_scalar_types() {
        assert_eq!(parse_arg("count=3").unwrap(), ("count".to_string(), Value::from(3)));
        assert_eq!(parse_arg("flag=true").unwrap().1, Value::Bool(true));
        assert_eq!(parse_arg("app_name=blog").unwrap().1, Value::from("blog"));
        assert_eq!(parse_arg("list=[1,2]").unwrap().1, Value::from("[1,2]"));
        assert_eq!(parse_arg("eq=a=b").unwrap().1, Value::from("a=b"));
    }

    #[test]
    fn test_parse_arg_rejects_missing_separator() {
        assert!(parse_arg("novalue").is_err());
        assert!(parse_arg("=x").is_err());
    }
}
