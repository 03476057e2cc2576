//! Project editing commands: cars, skins and material overrides.
//!
//! [`get_project_snapshot_inner`] returns a lightweight view of the current
//! project for display. It acquires only a read lock.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;

use crate::error::AppError;
use crate::models::{sanitize_skin_name, ConfigData, Project, ShaderProperty, SkinEntry};
use crate::packaging::is_texture;

use super::{read_project, write_project};

/// One car in a [`ProjectSnapshot`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSnapshot {
    pub instance_id: String,
    pub base_carid: String,
    /// Skin display names, in project order.
    pub skins: Vec<String>,
}

/// Serializable snapshot of the current project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub mod_name: String,
    /// Author as it will be written into skin metadata.
    pub author: String,
    pub cars: Vec<CarSnapshot>,
    pub total_skins: usize,
    /// RFC 3339 last-modified timestamp; `None` until first saved.
    pub modified_at: Option<String>,
}

impl From<&Project> for ProjectSnapshot {
    fn from(p: &Project) -> Self {
        Self {
            mod_name: p.mod_name.clone(),
            author: p.effective_author().to_string(),
            cars: p
                .cars
                .iter()
                .map(|(id, car)| CarSnapshot {
                    instance_id: id.clone(),
                    base_carid: car.base_carid.clone(),
                    skins: car.skins.iter().map(|s| s.name.clone()).collect(),
                })
                .collect(),
            total_skins: p.total_skins(),
            modified_at: p.modified_at.clone(),
        }
    }
}

/// Acquires a READ lock on `project_lock` and returns a [`ProjectSnapshot`].
pub fn get_project_snapshot_inner(
    project_lock: &RwLock<Project>,
) -> Result<ProjectSnapshot, AppError> {
    let project = read_project(project_lock)?;
    Ok(ProjectSnapshot::from(&*project))
}

// ── cars ──────────────────────────────────────────────────────────────────────

/// Add a car and return its instance id.
pub fn add_car_inner(
    base_carid: &str,
    project_lock: &RwLock<Project>,
) -> Result<String, AppError> {
    let carid = base_carid.trim();
    if carid.is_empty() || carid.contains(['/', '\\']) || carid == "." || carid == ".." {
        return Err(AppError::InvalidInput(format!(
            "'{base_carid}' is not a valid car id"
        )));
    }
    let mut project = write_project(project_lock)?;
    let instance_id = project.add_car(carid);
    tracing::info!(carid, instance_id = %instance_id, "car added");
    Ok(instance_id)
}

pub fn remove_car_inner(
    instance_id: &str,
    project_lock: &RwLock<Project>,
) -> Result<(), AppError> {
    let mut project = write_project(project_lock)?;
    project
        .cars
        .remove(instance_id)
        .ok_or_else(|| AppError::NotFound(format!("car {instance_id} not found")))?;
    tracing::info!(instance_id, "car removed");
    Ok(())
}

// ── skins ─────────────────────────────────────────────────────────────────────

/// Arguments for [`add_skin_inner`].
#[derive(Debug, Clone)]
pub struct AddSkinRequest {
    pub car: String,
    pub name: String,
    pub texture_path: PathBuf,
    pub config: Option<ConfigData>,
}

fn require_file(path: &Path) -> Result<(), AppError> {
    if !path.is_file() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

/// Add a skin to a car after checking its files exist.
///
/// Rejects a skin whose folder name would clash with one already on the car.
pub fn add_skin_inner(
    request: AddSkinRequest,
    project_lock: &RwLock<Project>,
) -> Result<(), AppError> {
    let name = request.name.trim();
    let folder = sanitize_skin_name(name);
    if folder.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a usable skin name",
            request.name
        )));
    }

    require_file(&request.texture_path)?;
    if !is_texture(&request.texture_path) {
        return Err(AppError::InvalidInput(format!(
            "{} is not a .dds texture",
            request.texture_path.display()
        )));
    }
    if let Some(config) = &request.config {
        require_file(&config.vehicle_config_path)?;
        require_file(&config.config_icon_path)?;
        if config.config_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "configuration name must not be empty".to_string(),
            ));
        }
    }

    let mut project = write_project(project_lock)?;
    let car = project
        .cars
        .get_mut(&request.car)
        .ok_or_else(|| AppError::NotFound(format!("car {} not found", request.car)))?;
    if car.skins.iter().any(|s| sanitize_skin_name(&s.name) == folder) {
        return Err(AppError::InvalidInput(format!(
            "car {} already has a skin named '{name}'",
            request.car
        )));
    }

    let mut skin = SkinEntry::new(name, request.texture_path);
    skin.config_data = request.config;
    car.skins.push(skin);
    tracing::info!(car = %request.car, skin = name, "skin added");
    Ok(())
}

fn find_skin<'a>(
    project: &'a mut Project,
    car: &str,
    skin_name: &str,
) -> Result<&'a mut SkinEntry, AppError> {
    project
        .cars
        .get_mut(car)
        .ok_or_else(|| AppError::NotFound(format!("car {car} not found")))?
        .skins
        .iter_mut()
        .find(|s| s.name == skin_name)
        .ok_or_else(|| AppError::NotFound(format!("skin '{skin_name}' not found on car {car}")))
}

pub fn remove_skin_inner(
    car: &str,
    skin_name: &str,
    project_lock: &RwLock<Project>,
) -> Result<(), AppError> {
    let mut project = write_project(project_lock)?;
    let entry = project
        .cars
        .get_mut(car)
        .ok_or_else(|| AppError::NotFound(format!("car {car} not found")))?;
    let before = entry.skins.len();
    entry.skins.retain(|s| s.name != skin_name);
    if entry.skins.len() == before {
        return Err(AppError::NotFound(format!(
            "skin '{skin_name}' not found on car {car}"
        )));
    }
    tracing::info!(car, skin = skin_name, "skin removed");
    Ok(())
}

/// Set (or with `None`, clear) one shader property override on a skin.
pub fn set_material_property_inner(
    car: &str,
    skin_name: &str,
    material: &str,
    stage: usize,
    property: ShaderProperty,
    value: Option<f64>,
    project_lock: &RwLock<Project>,
) -> Result<(), AppError> {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            return Err(AppError::InvalidInput(format!(
                "{property} must be between 0 and 1, got {v}"
            )));
        }
    }
    if material.trim().is_empty() {
        return Err(AppError::InvalidInput("material name must not be empty".to_string()));
    }

    let mut project = write_project(project_lock)?;
    let skin = find_skin(&mut project, car, skin_name)?;
    let overrides = skin.material_properties.get_or_insert_with(Default::default);
    let stage_props = overrides
        .entry(material.to_string())
        .or_default()
        .entry(stage)
        .or_default();
    match value {
        Some(v) => {
            stage_props.insert(property, Some(v));
        }
        None => {
            stage_props.remove(&property);
        }
    }
    tracing::debug!(car, skin = skin_name, material, stage, %property, ?value, "material override set");
    Ok(())
}
