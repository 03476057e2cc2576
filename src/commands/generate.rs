//! Mod generation command.
//!
//! The pipeline is CPU- and disk-bound, so it runs on tokio's blocking pool.
//! Progress updates travel back over an unbounded channel; the caller drains
//! the receiver however it likes (a progress bar, a log line, nothing).

use std::path::PathBuf;
use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::AppError;
use crate::models::Project;
use crate::packaging::{self, GenerateOptions, GenerateReport, Progress, SkippedSkin};

use super::read_project;

/// Where the finished archive goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The game's mods folder from [`Config::default_mods_dir`].
    ModsFolder,
    Custom(PathBuf),
}

impl OutputTarget {
    pub fn resolve(&self, config: &Config) -> PathBuf {
        match self {
            Self::ModsFolder => config.default_mods_dir(),
            Self::Custom(dir) => dir.clone(),
        }
    }
}

/// Serializable result of a generation run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    pub archive_path: String,
    pub archive_sha256: String,
    pub entries: usize,
    pub cars: usize,
    pub skins_packaged: usize,
    pub skipped: Vec<SkippedSkin>,
    pub textures_renamed: usize,
    pub material_properties_changed: usize,
    /// Non-fatal problems from texture normalization and material patching.
    pub warnings: Vec<String>,
}

impl From<GenerateReport> for GenerateSummary {
    fn from(r: GenerateReport) -> Self {
        let mut warnings = r.normalize.errors;
        warnings.extend(r.materials.warnings);
        Self {
            archive_path: r.archive_path.to_string_lossy().into_owned(),
            archive_sha256: r.archive_sha256,
            entries: r.entries,
            cars: r.cars,
            skins_packaged: r.skins_packaged,
            skipped: r.skipped,
            textures_renamed: r.normalize.renamed.len(),
            material_properties_changed: r.materials.properties_changed,
            warnings,
        }
    }
}

/// Generate the mod archive for the active project.
///
/// The project is cloned under a read lock, so edits made while generation
/// runs do not affect the archive being written.
pub async fn generate_mod_inner(
    target: OutputTarget,
    project_lock: &RwLock<Project>,
    config: &Config,
    progress: mpsc::UnboundedSender<Progress>,
) -> Result<GenerateSummary, AppError> {
    let project = read_project(project_lock)?.clone();
    let options = GenerateOptions {
        vehicles_root: config.vehicles_dir.clone(),
        output_dir: target.resolve(config),
        scratch_parent: None,
    };
    tracing::info!(
        output = %options.output_dir.display(),
        vehicles = %options.vehicles_root.display(),
        "generate requested"
    );

    let report = tokio::task::spawn_blocking(move || {
        packaging::generate(&project, &options, &mut |update| {
            // A dropped receiver only means nobody is watching.
            let _ = progress.send(update);
        })
    })
    .await
    .map_err(|e| AppError::Packaging(format!("generation task panicked: {e}")))??;

    Ok(GenerateSummary::from(report))
}
