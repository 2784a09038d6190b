//! # HTML Reporting Module / HTML 报告模块
//!
//! Exports notifications as a single self-contained HTML page. Outputs are
//! folded into `<details>` blocks so long test logs stay readable.
//!
//! 将通知导出为单个自包含的 HTML 页面。输出被折叠到 `<details>` 块中，
//! 使较长的测试日志保持可读。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::{Notification, NotificationStatus};
use crate::infra::t;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/notifications.css");

/// Renders the report page for `notifications`, newest first.
/// 为 `notifications` 渲染报告页面，最新的在前。
pub fn render_report(notifications: &[Notification], locale: &str) -> Markup {
    let count = |status: NotificationStatus| notifications.iter().filter(|n| n.status == status).count();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div class="summary-container" {
                    div class="summary-item" {
                        span class="count" { (notifications.len()) }
                        span class="label" { (t!("html_report.summary.total", locale = locale)) }
                    }
                    div class="summary-item" {
                        span class="count success-text" { (count(NotificationStatus::Success)) }
                        span class="label" { (t!("html_report.summary.success", locale = locale)) }
                    }
                    div class="summary-item" {
                        span class="count error-text" { (count(NotificationStatus::Error)) }
                        span class="label" { (t!("html_report.summary.error", locale = locale)) }
                    }
                }
                table {
                    thead {
                        tr {
                            th { "#" }
                            th { (t!("html_report.table.header.time", locale = locale)) }
                            th { (t!("html_report.table.header.status", locale = locale)) }
                            th { (t!("html_report.table.header.summary", locale = locale)) }
                        }
                    }
                    tbody {
                        @for notification in notifications.iter().rev() {
                            (render_row(notification, locale))
                        }
                    }
                }
            }
        }
    }
}

fn render_row(notification: &Notification, locale: &str) -> Markup {
    let status = notification.status.as_str();
    html! {
        tr class=[notification.dismissed.then_some("dismissed")] {
            td { (notification.id) }
            td { (notification.notification_time.format("%Y-%m-%d %H:%M:%S").to_string()) }
            td {
                div class={ "status-cell status-" (status) } {
                    (t!(format!("status.{status}"), locale = locale))
                }
            }
            td {
                (notification.summary)
                @if let Some(kind) = &notification.notification_type {
                    " [" (kind) "]"
                }
                @if !notification.message.is_empty() {
                    details {
                        summary { (t!("html_report.toggle_output", locale = locale)) }
                        pre class="output-content" { (notification.message) }
                    }
                }
                @if let Some(rerun) = &notification.rerun_job {
                    div { code class="rerun" { (rerun) } }
                }
            }
        }
    }
}

/// Writes the report to `output_path`.
///
/// # Errors / 错误
/// Fails if the file cannot be written.
/// 无法写入文件时失败。
pub fn generate_html_report(notifications: &[Notification], output_path: &Path, locale: &str) -> Result<()> {
    let page = render_report(notifications, locale);
    fs::write(output_path, page.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))?;
    Ok(())
}
