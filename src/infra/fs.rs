//! # File System Operations Module / 文件系统操作模块
//!
//! Prepares a project's base directory before it is bootstrapped.
//!
//! 在引导项目之前准备其基础目录。

use anyhow::{Context, Result};
use fs_extra::file::{CopyOptions, copy};
use std::fs;
use std::path::Path;

use crate::core::models::{Project, ProjectStyle};

/// Skeleton file copied to `bootstrap.py`.
pub const SKELETON_BOOTSTRAP: &str = "bootstrap.py";
/// Skeleton file copied to `buildout.cfg`.
pub const SKELETON_BUILDOUT: &str = "base_buildout.cfg";

/// Written as `buildout.cfg` when no skeleton directory is configured.
const MINIMAL_BUILDOUT: &str = "[buildout]\nparts =\n";

/// Creates the base directory and, for buildout projects, seeds the files
/// that `BOOTSTRAP` needs. Existing files are never overwritten.
///
/// Returns the names of the files that were created.
///
/// 创建基础目录，并为 buildout 项目放入 `BOOTSTRAP` 所需的文件。已存在的文件不会被覆盖。
pub fn prep_project(project: &Project, skeleton_dir: Option<&Path>) -> Result<Vec<String>> {
    let base = &project.base_directory;
    fs::create_dir_all(base)
        .with_context(|| format!("Failed to create project directory: {}", base.display()))?;

    let mut created = Vec::new();
    if let ProjectStyle::Pip { .. } = project.style {
        return Ok(created);
    }

    let targets = [(SKELETON_BOOTSTRAP, "bootstrap.py"), (SKELETON_BUILDOUT, "buildout.cfg")];
    for (source_name, target_name) in targets {
        let target = base.join(target_name);
        if target.is_file() {
            continue;
        }
        match skeleton_dir.map(|dir| dir.join(source_name)) {
            Some(source) if source.is_file() => {
                copy_file(&source, &target)?;
            }
            _ if target_name == "buildout.cfg" => {
                fs::write(&target, MINIMAL_BUILDOUT)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
            }
            _ => {
                tracing::warn!(file = source_name, "no skeleton file available, skipping");
                continue;
            }
        }
        created.push(target_name.to_string());
    }

    Ok(created)
}

/// Copies a single file, refusing to overwrite the destination.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let options = CopyOptions::new();
    copy(from, to, &options)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}
