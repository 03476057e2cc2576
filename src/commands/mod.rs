//! Command handlers.
//!
//! Sub-modules are grouped by concern:
//! - [`file`]: new / save / load project
//! - [`project`]: car and skin editing, project snapshots
//! - [`generate`]: mod archive generation
//! - [`vehicles`]: template discovery and checks
//!
//! Every handler is an `_inner` function over explicit state so it can be
//! tested without the CLI.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AppError;
use crate::models::Project;

pub mod file;
pub mod generate;
pub mod project;
pub mod vehicles;

pub(crate) fn read_project(
    project_lock: &RwLock<Project>,
) -> Result<RwLockReadGuard<'_, Project>, AppError> {
    project_lock
        .read()
        .map_err(|e| AppError::Io(format!("project lock poisoned: {e}")))
}

pub(crate) fn write_project(
    project_lock: &RwLock<Project>,
) -> Result<RwLockWriteGuard<'_, Project>, AppError> {
    project_lock
        .write()
        .map_err(|e| AppError::Io(format!("project lock poisoned: {e}")))
}
