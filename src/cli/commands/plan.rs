//! # Plan Command Module / 计划命令模块
//!
//! Prints the test invocations `TEST` would run for a project, without
//! running them.
//!
//! 打印 `TEST` 将为项目运行的测试调用，但不实际运行。

use anyhow::Result;

use crate::cli::commands::AppContext;
use crate::core::models::ProjectId;
use crate::core::planner::resolve_test_plan;
use crate::infra::buildout::BuildoutFileReader;
use crate::infra::store::ProjectStore;
use crate::reporting::print_plan;

pub fn execute(app: &AppContext, project_id: ProjectId) -> Result<()> {
    let store = app.open_store()?;
    let project = ProjectStore::get(&*store, project_id)?;
    let plan = resolve_test_plan(&project, &BuildoutFileReader)?;
    print_plan(&project, &plan, &app.locale);
    Ok(())
}
