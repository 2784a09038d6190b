//! # Console Reporting Module / 控制台报告模块
//!
//! Colored console listings of notifications, projects and test plans.
//!
//! 以彩色方式在控制台列出通知、项目和测试计划。

use colored::*;

use crate::core::models::{Notification, NotificationStatus, Project, TestPlan};
use crate::infra::t;

/// Width of the first line of a message shown in the listing.
const PREVIEW_WIDTH: usize = 72;

fn colored_status(status: NotificationStatus, locale: &str) -> ColoredString {
    let label = t!(format!("status.{}", status.as_str()), locale = locale).to_string();
    match status {
        NotificationStatus::Success => label.green(),
        NotificationStatus::Error => label.red(),
        NotificationStatus::General => label.cyan(),
    }
}

/// First non-empty line of `message`, shortened to `PREVIEW_WIDTH` characters.
pub fn preview(message: &str) -> String {
    let line = message.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();
    if line.chars().count() > PREVIEW_WIDTH {
        let short: String = line.chars().take(PREVIEW_WIDTH - 3).collect();
        format!("{short}...")
    } else {
        line.to_string()
    }
}

/// Prints one row per notification, newest first. Dismissed notifications are
/// skipped unless `include_dismissed` is set.
///
/// 每条通知打印一行，最新的在前。除非设置 `include_dismissed`，否则跳过已忽略的通知。
///
/// # Output Format / 输出格式
/// ```text
/// --- Notifications ---
///   #12  error    2026-10-17 09:30  Testing 'web' error      [TEST] (rerun)
///        bin/test: 3 failures
/// ```
pub fn print_notifications(notifications: &[Notification], include_dismissed: bool, locale: &str) {
    println!("\n{}", t!("notifications_banner", locale = locale).bold());

    let mut shown = 0;
    for notification in notifications.iter().rev() {
        if notification.dismissed && !include_dismissed {
            continue;
        }
        shown += 1;

        let mut tags = String::new();
        if let Some(kind) = &notification.notification_type {
            tags.push_str(&format!(" [{kind}]"));
        }
        if notification.rerun_job.is_some() {
            tags.push_str(&format!(" ({})", t!("rerunnable", locale = locale)));
        }

        let summary = if notification.dismissed {
            notification.summary.dimmed()
        } else {
            notification.summary.normal()
        };
        println!(
            "  #{:<4} {:<10} {}  {}{}",
            notification.id,
            colored_status(notification.status, locale),
            notification.notification_time.format("%Y-%m-%d %H:%M"),
            summary,
            tags.yellow()
        );

        let first_line = preview(&notification.message);
        if !first_line.is_empty() {
            println!("        {}", first_line.dimmed());
        }
    }

    if shown == 0 {
        println!("  {}", t!("no_notifications", locale = locale).dimmed());
    }
}

/// Prints a notification with its complete message.
/// 打印一条通知及其完整消息。
pub fn print_notification(notification: &Notification, locale: &str) {
    println!(
        "\n#{} {} {}",
        notification.id,
        colored_status(notification.status, locale),
        notification.summary.bold()
    );
    println!("{}", "-".repeat(80));
    println!("{}", notification.message);
    println!("{}", "-".repeat(80));
    if let Some(rerun) = &notification.rerun_job {
        println!("{} {}", t!("rerun_job_label", locale = locale).yellow(), rerun);
    }
}

pub fn print_projects(projects: &[Project], locale: &str) {
    println!("\n{}", t!("projects_banner", locale = locale).bold());
    if projects.is_empty() {
        println!("  {}", t!("no_projects", locale = locale).dimmed());
        return;
    }
    for project in projects {
        let status = if project.test_status {
            t!("tests_passing", locale = locale).green()
        } else {
            t!("tests_failing", locale = locale).red()
        };
        println!(
            "  #{:<4} {:<24} {:<9} {:<10} {}",
            project.id,
            project.name.cyan(),
            project.style.name(),
            status,
            project.base_directory.display()
        );
    }
}

/// Prints the invocations of a test plan in order.
pub fn print_plan(project: &Project, plan: &TestPlan, locale: &str) {
    println!(
        "\n{}",
        t!("plan_banner", locale = locale, name = project.name, count = plan.len()).bold()
    );
    if plan.is_empty() {
        println!("  {}", t!("plan_empty", locale = locale).yellow());
    }
    for (index, invocation) in plan.iter().enumerate() {
        println!("  {}. {}", index + 1, invocation.cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_takes_first_non_empty_line() {
        assert_eq!(preview("\n\n  first line  \nsecond"), "first line");
        assert_eq!(preview(""), "");
    }

    #[test]
    fn test_preview_shortens_long_lines() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_WIDTH);
        assert!(shown.ends_with("..."));
    }
}
