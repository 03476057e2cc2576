//! Vehicle template resolution and per-skin staging.
//!
//! A template lives at `<vehicles_root>/<carid>/SKINNAME/` and holds the
//! placeholder JBEAM/material files the rewriter retargets. The car folder
//! above it may also hold `info*.json` descriptor templates used for
//! per-skin vehicle configurations.
//!
//! [`TemplateStore::register`] creates a template from a user's materials and
//! JBEAM files; [`TemplateStore::remove`] deletes one again.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::materials::parse_materials;
use super::{is_texture, PackagingError, TEMPLATE_SKIN_DIR};

/// Descriptor template names tried before falling back to any `info*.json`.
const DESCRIPTOR_NAMES: [&str; 2] = ["info.json", "info_template.json"];

/// File every complete template must contain.
const REQUIRED_MATERIALS: &str = "skin.materials.json";

/// Preview image name inside a registered car folder.
const PREVIEW_NAME: &str = "preview.jpg";

/// A resolved on-disk vehicle template.
#[derive(Debug, Clone)]
pub struct Template {
    pub carid: String,
    /// `<vehicles_root>/<carid>`
    pub car_dir: PathBuf,
    /// `<vehicles_root>/<carid>/SKINNAME`
    pub skin_dir: PathBuf,
}

/// Result of checking a registered vehicle for completeness.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCheck {
    pub carid: String,
    pub problems: Vec<String>,
}

impl VehicleCheck {
    pub fn is_complete(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Files for a new vehicle template.
#[derive(Debug, Clone)]
pub struct VehicleRegistration {
    pub carid: String,
    /// Skin materials file; stored as `SKINNAME/skin.materials.json`.
    pub materials: PathBuf,
    /// Skin slot definitions; stored under its own file name.
    pub jbeam: PathBuf,
    /// Optional JPEG shown next to the vehicle.
    pub preview: Option<PathBuf>,
}

/// Outcome of [`TemplateStore::register`].
#[derive(Debug, Clone)]
pub struct Registered {
    pub template: Template,
    /// Where the preview image landed, if one was copied.
    pub preview: Option<PathBuf>,
    /// Non-fatal preview problems.
    pub warnings: Vec<String>,
}

fn validate_carid(carid: &str) -> Result<(), PackagingError> {
    if carid.is_empty() || carid.contains(['/', '\\']) || carid == "." || carid == ".." {
        return Err(PackagingError::InvalidVehicle(format!(
            "'{carid}' is not a valid car id"
        )));
    }
    Ok(())
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| wanted.contains(&e.as_str()))
}

/// Check the user's materials file parses and defines a `.skin.` material.
fn check_materials_source(path: &Path) -> Result<(), PackagingError> {
    let text = fs::read_to_string(path).map_err(|e| PackagingError::io(path, e))?;
    let root = parse_materials(&text).map_err(|e| {
        PackagingError::InvalidVehicle(format!("{} is not valid JSON: {e}", path.display()))
    })?;
    let has_skin = root
        .as_object()
        .is_some_and(|m| m.keys().any(|k| k.contains(".skin.")));
    if !has_skin {
        return Err(PackagingError::InvalidVehicle(format!(
            "{} defines no <name>.skin.<id> material",
            path.display()
        )));
    }
    Ok(())
}

/// Read access to the `vehicles/` template tree.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate the template for `carid`.
    ///
    /// Returns [`PackagingError::MissingTemplate`] carrying the expected path
    /// when `SKINNAME` is absent.
    pub fn resolve(&self, carid: &str) -> Result<Template, PackagingError> {
        let car_dir = self.root.join(carid);
        let skin_dir = car_dir.join(TEMPLATE_SKIN_DIR);
        if !skin_dir.is_dir() {
            return Err(PackagingError::MissingTemplate {
                carid: carid.to_string(),
                expected: skin_dir,
            });
        }
        Ok(Template {
            carid: carid.to_string(),
            car_dir,
            skin_dir,
        })
    }

    /// Car ids that have a `SKINNAME` folder, sorted.
    pub fn list_vehicles(&self) -> Result<Vec<String>, PackagingError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|e| PackagingError::io(&self.root, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PackagingError::io(&self.root, e))?;
            if entry.path().join(TEMPLATE_SKIN_DIR).is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Create `<root>/<carid>/SKINNAME/` from the user's files.
    ///
    /// Inputs are validated before anything is written. If copying the
    /// materials or JBEAM file fails, the folders created here are removed
    /// again. The preview image is copied last and only ever warns.
    pub fn register(&self, request: &VehicleRegistration) -> Result<Registered, PackagingError> {
        let carid = request.carid.trim();
        validate_carid(carid)?;
        for source in [&request.materials, &request.jbeam] {
            if !source.is_file() {
                return Err(PackagingError::SourceMissing(source.clone()));
            }
        }
        if !has_extension(&request.jbeam, &["jbeam"]) {
            return Err(PackagingError::InvalidVehicle(format!(
                "{} is not a .jbeam file",
                request.jbeam.display()
            )));
        }
        check_materials_source(&request.materials)?;

        let car_dir = self.root.join(carid);
        let skin_dir = car_dir.join(TEMPLATE_SKIN_DIR);
        if skin_dir.exists() {
            return Err(PackagingError::VehicleExists {
                carid: carid.to_string(),
                dir: skin_dir,
            });
        }

        let created_car_dir = !car_dir.exists();
        if let Err(e) = copy_template_files(request, &skin_dir) {
            let created = if created_car_dir { &car_dir } else { &skin_dir };
            if let Err(cleanup) = fs::remove_dir_all(created) {
                tracing::warn!(
                    dir = %created.display(),
                    error = %cleanup,
                    "failed to remove partial vehicle template"
                );
            }
            return Err(e);
        }
        tracing::info!(carid, dir = %skin_dir.display(), "vehicle registered");

        let mut warnings = Vec::new();
        let preview = request
            .preview
            .as_deref()
            .and_then(|image| copy_preview(image, &car_dir, &mut warnings));

        Ok(Registered {
            template: Template {
                carid: carid.to_string(),
                car_dir,
                skin_dir,
            },
            preview,
            warnings,
        })
    }

    /// Delete a registered vehicle's whole car folder.
    pub fn remove(&self, carid: &str) -> Result<(), PackagingError> {
        let carid = carid.trim();
        validate_carid(carid)?;
        let template = self.resolve(carid)?;
        fs::remove_dir_all(&template.car_dir)
            .map_err(|e| PackagingError::io(&template.car_dir, e))?;
        tracing::info!(carid, "vehicle removed");
        Ok(())
    }

    /// Check that a vehicle template has everything generation needs.
    pub fn check_vehicle(&self, carid: &str) -> Result<VehicleCheck, PackagingError> {
        let mut problems = Vec::new();
        match self.resolve(carid) {
            Err(PackagingError::MissingTemplate { expected, .. }) => {
                problems.push(format!("missing template folder {}", expected.display()));
            }
            Err(e) => return Err(e),
            Ok(template) => {
                if !template.skin_dir.join(REQUIRED_MATERIALS).is_file() {
                    problems.push(format!("missing {REQUIRED_MATERIALS}"));
                }
                let has_jbeam = fs::read_dir(&template.skin_dir)
                    .map_err(|e| PackagingError::io(&template.skin_dir, e))?
                    .filter_map(Result::ok)
                    .any(|e| e.path().extension().is_some_and(|x| x == "jbeam"));
                if !has_jbeam {
                    problems.push("no .jbeam file".to_string());
                }
            }
        }
        Ok(VehicleCheck {
            carid: carid.to_string(),
            problems,
        })
    }
}

impl Template {
    /// Find the configuration descriptor template in the car folder:
    /// `info.json`, `info_template.json`, then the first `info*.json` by name.
    pub fn find_descriptor(&self) -> Option<PathBuf> {
        for name in DESCRIPTOR_NAMES {
            let candidate = self.car_dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.car_dir)
            .ok()?
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with("info") && name.ends_with(".json")
            })
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    /// Copy the template into `dest`, leaving out the template's example
    /// textures, then copy the user's `texture` into `dest` under its own name.
    ///
    /// Returns the path of the copied texture.
    pub fn stage_skin(&self, dest: &Path, texture: &Path) -> Result<PathBuf, PackagingError> {
        copy_tree_without_textures(&self.skin_dir, dest)?;

        let file_name = texture
            .file_name()
            .ok_or_else(|| PackagingError::SourceMissing(texture.to_path_buf()))?;
        let texture_dest = dest.join(file_name);
        fs::copy(texture, &texture_dest).map_err(|e| PackagingError::io(texture, e))?;
        tracing::debug!(
            carid = %self.carid,
            texture = %texture_dest.display(),
            "staged skin"
        );
        Ok(texture_dest)
    }
}

fn copy_template_files(request: &VehicleRegistration, skin_dir: &Path) -> Result<(), PackagingError> {
    fs::create_dir_all(skin_dir).map_err(|e| PackagingError::io(skin_dir, e))?;
    fs::copy(&request.materials, skin_dir.join(REQUIRED_MATERIALS))
        .map_err(|e| PackagingError::io(&request.materials, e))?;
    let jbeam_name = request
        .jbeam
        .file_name()
        .ok_or_else(|| PackagingError::SourceMissing(request.jbeam.clone()))?;
    fs::copy(&request.jbeam, skin_dir.join(jbeam_name))
        .map_err(|e| PackagingError::io(&request.jbeam, e))?;
    Ok(())
}

fn copy_preview(image: &Path, car_dir: &Path, warnings: &mut Vec<String>) -> Option<PathBuf> {
    if !image.is_file() {
        warnings.push(format!("preview image not found: {}", image.display()));
        return None;
    }
    if !has_extension(image, &["jpg", "jpeg"]) {
        warnings.push(format!("preview image is not a JPEG, skipped: {}", image.display()));
        return None;
    }
    let dest = car_dir.join(PREVIEW_NAME);
    match fs::copy(image, &dest) {
        Ok(_) => Some(dest),
        Err(e) => {
            tracing::warn!(image = %image.display(), error = %e, "preview image not copied");
            warnings.push(format!("cannot copy preview image {}: {e}", image.display()));
            None
        }
    }
}

fn copy_tree_without_textures(source: &Path, dest: &Path) -> Result<(), PackagingError> {
    fs::create_dir_all(dest).map_err(|e| PackagingError::io(dest, e))?;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| PackagingError::walk(source, e))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| PackagingError::SourceMissing(entry.path().to_path_buf()))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PackagingError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            if is_texture(entry.path()) {
                continue;
            }
            fs::copy(entry.path(), &target).map_err(|e| PackagingError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
