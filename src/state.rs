//! Application state shared by the command handlers.

use std::sync::RwLock;

use crate::config::Config;
use crate::models::Project;

/// Root application state.
///
/// The project sits behind a [`RwLock`] so read-only commands (snapshots,
/// generation) do not block each other.
pub struct AppState {
    pub project: RwLock<Project>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            project: RwLock::new(Project::default()),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
