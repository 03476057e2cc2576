//! Atomic save and load for the `.bsproject` file format.
//!
//! # Save
//! 1. Serialize the [`Project`] to pretty JSON.
//! 2. Write it to `<target>.tmp` (same directory, same filesystem).
//! 3. Rename the temp file over the target.
//! On any failure the temp file is deleted and the original is left intact.
//!
//! # Load
//! Read and parse. Legacy key names are handled by the model's serde aliases.

use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::models::Project;

/// Save `project` to `path` using an atomic write.
pub fn save(project: &Project, path: &Path) -> Result<(), AppError> {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    if let Err(e) = write_json(project, &tmp_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        AppError::ProjectSave(format!("rename to final path failed: {e}"))
    })?;
    tracing::info!(path = %path.display(), cars = project.cars.len(), "project saved");
    Ok(())
}

/// Load a `.bsproject` file from `path`.
///
/// Returns [`AppError::ProjectLoad`] if the file cannot be read or is not a
/// valid project document.
pub fn load(path: &Path) -> Result<Project, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::ProjectLoad(format!("cannot open {}: {e}", path.display())))?;
    let project: Project = serde_json::from_str(&text)
        .map_err(|e| AppError::ProjectLoad(format!("cannot parse {}: {e}", path.display())))?;
    tracing::info!(
        path = %path.display(),
        mod_name = %project.mod_name,
        cars = project.cars.len(),
        skins = project.total_skins(),
        "project loaded"
    );
    Ok(project)
}

fn write_json(project: &Project, path: &Path) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(project)
        .map_err(|e| AppError::ProjectSave(format!("cannot serialize project: {e}")))?;
    let mut file = std::fs::File::create(path)
        .map_err(|e| AppError::ProjectSave(format!("cannot create temp file: {e}")))?;
    file.write_all(json.as_bytes())
        .map_err(|e| AppError::ProjectSave(format!("cannot write project: {e}")))?;
    file.sync_all()
        .map_err(|e| AppError::ProjectSave(format!("cannot flush project: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigData, ShaderProperty, SkinEntry, StageOverrides};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn make_project() -> Project {
        let mut p = Project::new("Police Pack", "Jo");
        p.created_at = Some("2026-01-01T00:00:00Z".to_string());
        let id = p.add_car("etk800");
        let mut skin = SkinEntry::new("Highway Patrol", "/skins/etk800_skin_hp.dds");
        skin.config_data = Some(ConfigData {
            config_type: "Police".to_string(),
            config_name: "HP".to_string(),
            vehicle_config_path: PathBuf::from("/skins/hp.pc"),
            config_icon_path: PathBuf::from("/skins/hp.jpg"),
        });
        let mut props = StageOverrides::new();
        props.insert(ShaderProperty::MetallicFactor, Some(0.9));
        props.insert(ShaderProperty::RoughnessFactor, None);
        let mut stages = BTreeMap::new();
        stages.insert(1, props);
        let mut overrides = BTreeMap::new();
        overrides.insert("etk800.skin.SKINNAME".to_string(), stages);
        skin.material_properties = Some(overrides);
        p.cars.get_mut(&id).unwrap().skins.push(skin);
        p
    }

    #[test]
    fn round_trip_keeps_everything() {
        let project = make_project();
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pack.bsproject");

        save(&project, &path).expect("save should succeed");
        let loaded = load(&path).expect("load should succeed");
        assert_eq!(loaded, project);
        assert!(!tmp.path().join("pack.bsproject.tmp").exists());
    }

    #[test]
    fn saved_file_uses_wire_property_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pack.bsproject");
        save(&make_project(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"metallicFactor\": 0.9"));
        assert!(text.contains("\"roughnessFactor\": null"));
    }

    #[test]
    fn load_accepts_legacy_key_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("old.bsproject");
        std::fs::write(
            &path,
            r#"{
                "mod_name": "Old",
                "author": "",
                "cars": {
                    "pickup": {
                        "base_carid": "pickup",
                        "skins": [{
                            "name": "Rust",
                            "dds_path": "/old/pickup_skin_rust.dds",
                            "config_data": {
                                "config_name": "Farm",
                                "pc_path": "/old/farm.pc",
                                "jpg_path": "/old/farm.jpg"
                            }
                        }]
                    }
                }
            }"#,
        )
        .unwrap();

        let project = load(&path).expect("legacy project should load");
        let skin = &project.cars["pickup"].skins[0];
        assert_eq!(skin.texture_path, PathBuf::from("/old/pickup_skin_rust.dds"));
        let config = skin.config_data.as_ref().unwrap();
        assert_eq!(config.config_type, "Factory");
        assert_eq!(config.vehicle_config_path, PathBuf::from("/old/farm.pc"));
    }

    #[test]
    fn save_replaces_existing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pack.bsproject");
        std::fs::write(&path, "old contents").unwrap();
        save(&make_project(), &path).unwrap();
        assert!(load(&path).is_ok());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.bsproject");
        std::fs::write(&path, "{ \"cars\": [").unwrap();
        match load(&path).expect_err("should fail for malformed JSON") {
            AppError::ProjectLoad(msg) => assert!(msg.contains("cannot parse")),
            other => panic!("expected AppError::ProjectLoad, got {other:?}"),
        }
    }

    #[test]
    fn load_fails_gracefully_on_missing_file() {
        let result = load(Path::new("/nonexistent/path/project.bsproject"));
        assert!(matches!(result, Err(AppError::ProjectLoad(_))));
    }

    #[test]
    fn save_to_missing_directory_is_project_save_error() {
        let result = save(&make_project(), Path::new("/nonexistent_dir_beamskin/p.bsproject"));
        assert!(matches!(result, Err(AppError::ProjectSave(_))));
    }
}
