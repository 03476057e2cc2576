//! Project lifecycle command handlers.
//!
//! # Error contract
//! Every fallible path returns `Result<_, AppError>`. No `unwrap()` or
//! `expect()` calls are present outside of `#[cfg(test)]`.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::AppError;
use crate::models::Project;

use super::project::ProjectSnapshot;
use super::{read_project, write_project};

// ── new_project ───────────────────────────────────────────────────────────────

/// Replace the active project with an empty one named `mod_name`.
pub fn new_project_inner(
    mod_name: &str,
    author: &str,
    project_lock: &RwLock<Project>,
) -> Result<ProjectSnapshot, AppError> {
    let new_project = Project::new(mod_name.trim(), author.trim());
    let snapshot = ProjectSnapshot::from(&new_project);
    let mut project = write_project(project_lock)?;
    *project = new_project;
    tracing::info!(mod_name, "new project");
    Ok(snapshot)
}

// ── save_project ──────────────────────────────────────────────────────────────

/// Updates `modified_at` (and `created_at` on first save) to the current UTC
/// time, then serialises the project to `path`.
pub fn save_project_inner(
    path: &Path,
    project_lock: &RwLock<Project>,
) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    {
        let mut project = write_project(project_lock)?;
        if project.created_at.is_none() {
            project.created_at = Some(now.clone());
        }
        project.modified_at = Some(now);
    }

    let project = read_project(project_lock)?;
    crate::project::serialization::save(&project, path)
}

// ── load_project ──────────────────────────────────────────────────────────────

/// Loads the `.bsproject` file and replaces the active project.
pub fn load_project_inner(
    path: &Path,
    project_lock: &RwLock<Project>,
) -> Result<ProjectSnapshot, AppError> {
    let new_project = crate::project::serialization::load(path)?;
    let snapshot = ProjectSnapshot::from(&new_project);
    let mut project = write_project(project_lock)?;
    *project = new_project;
    Ok(snapshot)
}

/// `path` with the project extension added when it has none.
pub fn project_file_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(crate::project::PROJECT_EXTENSION)
    }
}
