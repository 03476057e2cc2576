//! The `generate` entry point: project in, mod archive out.
//!
//! # Phases
//! 1. Validate the project and check the archive path is free.
//! 2. Resolve every car template (and descriptor template where a skin ships
//!    a configuration). Any failure here aborts before a scratch file exists.
//! 3. Per skin: check its source files, stage the template, rewrite text,
//!    write the configuration, patch material properties. A skin whose
//!    source files are missing is skipped; other failures abort the run.
//! 4. Normalize texture names over the whole scratch tree.
//! 5. Zip the scratch tree.
//!
//! The scratch directory is a [`tempfile::TempDir`]; it is removed when it
//! goes out of scope, whichever phase returned.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::descriptor;
use super::materials::{self, MaterialPatchReport};
use super::normalize::{self, NormalizeReport};
use super::rewrite::{self, RewriteContext, RewriteSummary};
use super::template::{Template, TemplateStore};
use super::{archive, PackagingError};
use crate::models::{sanitize_mod_name, sanitize_skin_name, skin_identifier, CarEntry, Project, SkinEntry};

/// Where generation reads templates from and writes the archive to.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root of the `vehicles/<carid>/SKINNAME` template tree.
    pub vehicles_root: PathBuf,
    /// Directory receiving `<mod_name>.zip`; created if missing.
    pub output_dir: PathBuf,
    /// Parent for the scratch directory; the system temp dir when `None`.
    pub scratch_parent: Option<PathBuf>,
}

/// A progress update: `fraction` in `[0, 1]` plus a status line.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub fraction: f32,
    pub status: String,
}

/// A skin left out of the archive, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSkin {
    pub car: String,
    pub skin: String,
    pub reason: String,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub archive_path: PathBuf,
    pub archive_sha256: String,
    /// Number of archive entries.
    pub entries: usize,
    pub cars: usize,
    pub skins_packaged: usize,
    pub skipped: Vec<SkippedSkin>,
    pub rewrite: RewriteSummary,
    pub materials: MaterialPatchReport,
    pub normalize: NormalizeReport,
}

struct CarPlan<'a> {
    instance_id: &'a str,
    car: &'a CarEntry,
    template: Template,
    descriptor: Option<PathBuf>,
}

fn emit(progress: &mut dyn FnMut(Progress), fraction: f32, status: impl Into<String>) {
    progress(Progress {
        fraction: fraction.clamp(0.0, 1.0),
        status: status.into(),
    });
}

/// Build the mod archive for `project`.
pub fn generate(
    project: &Project,
    options: &GenerateOptions,
    progress: &mut dyn FnMut(Progress),
) -> Result<GenerateReport, PackagingError> {
    project.validate()?;
    let mod_name = sanitize_mod_name(&project.mod_name);
    let author = project.effective_author();
    let total_skins = project.total_skins();
    tracing::info!(
        mod_name = %mod_name,
        author,
        cars = project.cars.len(),
        skins = total_skins,
        "generating mod"
    );

    let archive_path = options.output_dir.join(format!("{mod_name}.zip"));
    archive::ensure_absent(&archive_path)?;

    let store = TemplateStore::new(&options.vehicles_root);
    let plans = plan_cars(project, &store)?;

    emit(progress, 0.05, "Copying template files...");
    let scratch = create_scratch(options.scratch_parent.as_deref())?;
    tracing::debug!(scratch = %scratch.path().display(), "scratch directory created");

    let mut rewrite_total = RewriteSummary::default();
    let mut material_total = MaterialPatchReport::default();
    let mut skipped = Vec::new();
    let mut used_folders = BTreeSet::new();
    let mut packaged = 0;
    let mut done = 0;

    for plan in &plans {
        for skin in &plan.car.skins {
            let folder = skin_folder_name(skin);
            let outcome = if !used_folders.insert((plan.template.carid.clone(), folder.clone())) {
                Err(format!(
                    "skin folder '{folder}' is already used by another skin of {}",
                    plan.template.carid
                ))
            } else {
                check_sources(skin).map_err(|e| e.to_string())
            };

            match outcome {
                Err(reason) => {
                    tracing::warn!(car = plan.instance_id, skin = %skin.name, %reason, "skipping skin");
                    skipped.push(SkippedSkin {
                        car: plan.instance_id.to_string(),
                        skin: skin.name.clone(),
                        reason,
                    });
                }
                Ok(()) => {
                    let (summary, mat) =
                        package_skin(plan, skin, &folder, author, scratch.path())?;
                    rewrite_total.jbeam_files += summary.jbeam_files;
                    rewrite_total.json_files += summary.json_files;
                    rewrite_total.structured_json += summary.structured_json;
                    material_total.merge(mat);
                    packaged += 1;
                }
            }

            done += 1;
            let fraction = 0.1 + 0.75 * done as f32 / total_skins as f32;
            emit(progress, fraction, format!("Processing {total_skins} skins..."));
        }
    }

    if packaged == 0 {
        return Err(PackagingError::NothingToPackage);
    }

    let normalize = normalize::normalize_tree(scratch.path())?;
    for error in &normalize.errors {
        tracing::warn!(%error, "texture normalization");
    }

    emit(progress, 0.9, "Creating ZIP archive...");
    fs::create_dir_all(&options.output_dir)
        .map_err(|e| PackagingError::io(&options.output_dir, e))?;
    let entries = archive::zip_dir(scratch.path(), &archive_path)?;
    let archive_sha256 = archive::sha256_file(&archive_path)?;

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::warn!(scratch = %scratch_path.display(), error = %e, "cannot remove scratch directory");
    }

    emit(progress, 1.0, "Export completed successfully!");
    tracing::info!(
        archive = %archive_path.display(),
        entries,
        packaged,
        skipped = skipped.len(),
        "mod created"
    );

    Ok(GenerateReport {
        archive_path,
        archive_sha256,
        entries,
        cars: plans.len(),
        skins_packaged: packaged,
        skipped,
        rewrite: rewrite_total,
        materials: material_total,
        normalize,
    })
}

fn plan_cars<'a>(
    project: &'a Project,
    store: &TemplateStore,
) -> Result<Vec<CarPlan<'a>>, PackagingError> {
    project
        .cars
        .iter()
        .map(|(instance_id, car)| -> Result<CarPlan<'a>, PackagingError> {
            let template = store.resolve(&car.base_carid)?;
            let descriptor = if car.skins.iter().any(|s| s.config_data.is_some()) {
                let found = template.find_descriptor().ok_or_else(|| {
                    PackagingError::MissingDescriptor {
                        carid: car.base_carid.clone(),
                        dir: template.car_dir.clone(),
                    }
                })?;
                Some(found)
            } else {
                None
            };
            Ok(CarPlan {
                instance_id,
                car,
                template,
                descriptor,
            })
        })
        .collect()
}

fn create_scratch(parent: Option<&Path>) -> Result<tempfile::TempDir, PackagingError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("beamskin-");
    match parent {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| PackagingError::io(parent, e))?;
            builder
                .tempdir_in(parent)
                .map_err(|e| PackagingError::io(parent, e))
        }
        None => builder
            .tempdir()
            .map_err(|e| PackagingError::io(std::env::temp_dir(), e)),
    }
}

/// Folder name for a skin; falls back to the texture identifier when the
/// display name has no usable characters.
fn skin_folder_name(skin: &SkinEntry) -> String {
    let folder = sanitize_skin_name(&skin.name);
    if !folder.is_empty() {
        return folder;
    }
    let texture = skin
        .texture_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_skin_name(&skin_identifier(&texture))
}

/// Every user-supplied file a skin needs, checked before anything is copied.
fn check_sources(skin: &SkinEntry) -> Result<(), PackagingError> {
    if !skin.texture_path.is_file() {
        return Err(PackagingError::SourceMissing(skin.texture_path.clone()));
    }
    if let Some(config) = &skin.config_data {
        descriptor::validate_sources(config)?;
    }
    Ok(())
}

fn package_skin(
    plan: &CarPlan<'_>,
    skin: &SkinEntry,
    folder: &str,
    author: &str,
    scratch: &Path,
) -> Result<(RewriteSummary, MaterialPatchReport), PackagingError> {
    let carid = &plan.template.carid;
    let car_root = scratch.join("vehicles").join(carid);
    let dest = car_root.join(folder);
    tracing::info!(car = plan.instance_id, skin = %skin.name, folder, "processing skin");

    let texture = plan.template.stage_skin(&dest, &skin.texture_path)?;
    let texture_filename = texture
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ctx = RewriteContext {
        carid: carid.clone(),
        skin_folder: folder.to_string(),
        identifier: skin_identifier(&texture_filename),
        texture_filename,
        display_name: skin.name.clone(),
        author: author.to_string(),
    };
    let summary = rewrite::rewrite_skin_folder(&dest, &ctx)?;

    if let (Some(config), Some(template)) = (&skin.config_data, &plan.descriptor) {
        descriptor::write_config(config, folder, &car_root, template)?;
    }

    let materials = match &skin.material_properties {
        Some(overrides) => materials::patch_skin_folder(&dest, overrides)?,
        None => MaterialPatchReport::default(),
    };
    for warning in &materials.warnings {
        tracing::warn!(skin = %skin.name, %warning, "material override skipped");
    }

    Ok((summary, materials))
}
