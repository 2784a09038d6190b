//! # Notifications Command Module / 通知命令模块
//!
//! Lists, shows, dismisses and exports stored notifications.
//!
//! 列出、显示、忽略和导出已存储的通知。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::cli::commands::AppContext;
use crate::infra::store::NotificationSink;
use crate::infra::t;
use crate::reporting::{generate_html_report, print_notification, print_notifications};

pub fn list(app: &AppContext, include_dismissed: bool, html: Option<PathBuf>) -> Result<()> {
    let store = app.open_store()?;
    let notifications = NotificationSink::list(&*store)?;
    print_notifications(&notifications, include_dismissed, &app.locale);

    if let Some(report_path) = &html {
        let exported: Vec<_> = notifications
            .into_iter()
            .filter(|n| include_dismissed || !n.dismissed)
            .collect();
        println!(
            "\n{}",
            t!("html_report.generating", locale = &app.locale, path = report_path.display())
        );
        generate_html_report(&exported, report_path, &app.locale)?;
    }
    Ok(())
}

pub fn show(app: &AppContext, id: u64) -> Result<()> {
    let store = app.open_store()?;
    let notification = NotificationSink::get(&*store, id)?;
    print_notification(&notification, &app.locale);
    Ok(())
}

pub fn dismiss(app: &AppContext, id: u64) -> Result<()> {
    let store = app.open_store()?;
    store.dismiss(id)?;
    println!("{}", t!("notification_dismissed", locale = &app.locale, id = id).green());
    Ok(())
}
