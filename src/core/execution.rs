//! # Test Execution Module / 测试执行模块
//!
//! Runs a project's test plan and reports the outcome:
//!
//! ```text
//! STARTED -> RUNNING 1..N -> SUCCESS | FAILURE
//! ```
//!
//! Every invocation is run, even after one fails, so the final report always
//! holds the output of the whole plan.
//!
//! 运行项目的测试计划并报告结果。即使某个调用失败，也会运行所有调用，
//! 因此最终报告始终包含整个计划的输出。

use anyhow::Result;

use crate::core::error::JobError;
use crate::core::models::{
    ExecutionResult, JobDescriptor, NewNotification, Notification, NotificationStatus, Project,
};
use crate::core::planner::{SectionReader, resolve_test_plan};
use crate::core::registry::HandlerContext;
use crate::infra::t;

/// `notification_type` of test reports.
pub const TEST_NOTIFICATION_TYPE: &str = "TEST";

/// Placed between the banners of consecutive invocations.
pub fn report_separator() -> String {
    format!("\n\n{}\n\n", "*".repeat(50))
}

/// Prefixes `output` with a banner naming the invocation:
///
/// ```text
/// ===========
/// bin/test:
/// ===========
/// <output>
/// ```
///
/// The rule is one character longer than the invocation.
///
/// 在 `output` 前加上标明调用的横幅。横线比调用字符串长一个字符。
pub fn banner(invocation: &str, output: &str) -> String {
    let rule = "=".repeat(invocation.chars().count() + 1);
    format!("{rule}\n{invocation}:\n{rule}\n{output}")
}

/// Joins the banners of every result, in plan order.
pub fn format_report(results: &[ExecutionResult]) -> String {
    results
        .iter()
        .map(|result| banner(&result.command, &result.output))
        .collect::<Vec<_>>()
        .join(&report_separator())
}

/// Runs the test plan of `project` and stores the final report.
///
/// - A configuration problem is reported as a failed run.
/// - A process that cannot be started marks the project as failing and the
///   error is returned.
///
/// Returns the final notification.
///
/// 运行 `project` 的测试计划并存储最终报告。配置问题会作为失败的运行报告；
/// 无法启动进程时会将项目标记为失败并返回错误。
pub async fn run_test_plan<R>(
    ctx: &HandlerContext,
    project: &Project,
    job: &JobDescriptor,
    reader: &R,
) -> Result<Notification>
where
    R: SectionReader + Sync,
{
    ctx.notifications.create(
        NewNotification::new(
            NotificationStatus::General,
            t!("notify.test_started", name = project.name),
            t!("notify.test_started_message", name = project.name),
        )
        .for_project(project.id),
    )?;

    let plan = match resolve_test_plan(project, reader) {
        Ok(plan) => plan,
        Err(err) => {
            tracing::warn!(project_id = project.id, error = %err, "test plan could not be resolved");
            ctx.projects.set_test_status(project.id, false)?;
            return ctx.notifications.create(
                final_notification(project, job, false, JobError::from(err).to_string()),
            );
        }
    };

    let total = plan.len();
    let mut results = Vec::with_capacity(total);
    for (index, invocation) in plan.iter().enumerate() {
        tracing::info!(
            project_id = project.id,
            step = index + 1,
            total,
            command = %invocation,
            "running test invocation"
        );
        match ctx.runner.run(invocation, &project.base_directory).await {
            Ok(result) => results.push(result),
            Err(err) => {
                ctx.projects.set_test_status(project.id, false)?;
                return Err(JobError::from(err).into());
            }
        }
    }

    let passed = results.iter().all(ExecutionResult::success);
    tracing::info!(project_id = project.id, passed, invocations = total, "test plan finished");

    let notification = ctx
        .notifications
        .create(final_notification(project, job, passed, format_report(&results)))?;
    ctx.projects.set_test_status(project.id, passed)?;
    Ok(notification)
}

fn final_notification(project: &Project, job: &JobDescriptor, passed: bool, message: String) -> NewNotification {
    let status = NotificationStatus::from_success(passed);
    let outcome = t!(outcome_key(status));
    NewNotification::new(
        status,
        t!("notify.test_finished", name = project.name, outcome = outcome),
        message,
    )
    .for_project(project.id)
    .with_type(TEST_NOTIFICATION_TYPE)
    .with_rerun(job)
}

/// Locale key of the word describing an outcome.
pub fn outcome_key(status: NotificationStatus) -> &'static str {
    match status {
        NotificationStatus::Success => "outcome.success",
        NotificationStatus::Error => "outcome.error",
        NotificationStatus::General => "outcome.general",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(command: &str, output: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            command: command.to_string(),
            exit_code: Some(exit_code),
            output: output.to_string(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }

    #[test]
    fn test_banner_layout() {
        assert_eq!(banner("bin/test", "ok\n"), "=========\nbin/test:\n=========\nok\n");
    }

    #[test]
    fn test_report_joins_in_plan_order() {
        let report = format_report(&[result("a", "one", 0), result("bb", "two", 1)]);
        let separator = format!("\n\n{}\n\n", "*".repeat(50));
        assert_eq!(report, format!("==\na:\n==\none{separator}===\nbb:\n===\ntwo"));
    }

    #[test]
    fn test_single_result_has_no_separator() {
        let report = format_report(&[result("a", "x", 0)]);
        assert!(!report.contains('*'));
    }
}
