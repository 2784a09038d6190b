//! # Reporting Module / 报告模块
//!
//! Displays stored notifications on the console and exports them as a
//! standalone HTML page.
//!
//! 在控制台显示已存储的通知，并将其导出为独立的 HTML 页面。

pub mod console;
pub mod html;

// Re-export common reporting functions
pub use console::{print_notification, print_notifications, print_plan, print_projects};
pub use html::generate_html_report;
