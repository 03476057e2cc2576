//! Vehicle template queries and registration.

use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;
use crate::packaging::template::{TemplateStore, VehicleCheck, VehicleRegistration};

/// Serializable result of registering a vehicle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredVehicle {
    pub carid: String,
    pub template_dir: String,
    pub preview: Option<String>,
    pub warnings: Vec<String>,
}

/// Create a vehicle template from user-supplied files.
pub fn register_vehicle_inner(
    request: &VehicleRegistration,
    config: &Config,
) -> Result<RegisteredVehicle, AppError> {
    let store = TemplateStore::new(&config.vehicles_dir);
    let registered = store.register(request)?;
    for warning in &registered.warnings {
        tracing::warn!(carid = %registered.template.carid, "{warning}");
    }
    Ok(RegisteredVehicle {
        carid: registered.template.carid,
        template_dir: registered.template.skin_dir.to_string_lossy().into_owned(),
        preview: registered
            .preview
            .map(|p| p.to_string_lossy().into_owned()),
        warnings: registered.warnings,
    })
}

pub fn remove_vehicle_inner(carid: &str, config: &Config) -> Result<(), AppError> {
    TemplateStore::new(&config.vehicles_dir).remove(carid)?;
    Ok(())
}

pub fn list_vehicles_inner(config: &Config) -> Result<Vec<String>, AppError> {
    let store = TemplateStore::new(&config.vehicles_dir);
    Ok(store.list_vehicles()?)
}

/// Check one vehicle, or every vehicle when `carid` is `None`.
pub fn check_vehicles_inner(
    carid: Option<&str>,
    config: &Config,
) -> Result<Vec<VehicleCheck>, AppError> {
    let store = TemplateStore::new(&config.vehicles_dir);
    let ids = match carid {
        Some(id) => vec![id.to_string()],
        None => store.list_vehicles()?,
    };
    let checks = ids
        .iter()
        .map(|id| store.check_vehicle(id))
        .collect::<Result<Vec<_>, _>>()?;
    for check in checks.iter().filter(|c| !c.is_complete()) {
        tracing::warn!(carid = %check.carid, problems = ?check.problems, "incomplete vehicle template");
    }
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        Config {
            vehicles_dir: root.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn lists_only_folders_with_a_template() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pickup").join("SKINNAME")).unwrap();
        fs::create_dir_all(tmp.path().join("etk800").join("SKINNAME")).unwrap();
        fs::create_dir_all(tmp.path().join("notacar")).unwrap();

        let ids = list_vehicles_inner(&config(tmp.path())).unwrap();
        assert_eq!(ids, vec!["etk800".to_string(), "pickup".to_string()]);
    }

    #[test]
    fn missing_vehicles_dir_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let ids = list_vehicles_inner(&config(&tmp.path().join("absent"))).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn registered_vehicle_is_listed_then_removed() {
        let tmp = TempDir::new().unwrap();
        let vehicles = tmp.path().join("vehicles");
        let materials = tmp.path().join("skin.materials.json");
        let jbeam = tmp.path().join("bus_skins.jbeam");
        fs::write(&materials, r#"{"bus.skin.SKINNAME": {"Stages": [{}, {}]}}"#).unwrap();
        fs::write(&jbeam, "{}").unwrap();
        let request = VehicleRegistration {
            carid: "bus".to_string(),
            materials,
            jbeam,
            preview: Some(tmp.path().join("missing.jpg")),
        };

        let registered = register_vehicle_inner(&request, &config(&vehicles)).unwrap();
        assert_eq!(registered.carid, "bus");
        assert_eq!(registered.preview, None);
        assert_eq!(registered.warnings.len(), 1);
        assert_eq!(list_vehicles_inner(&config(&vehicles)).unwrap(), vec!["bus".to_string()]);

        let again = register_vehicle_inner(&request, &config(&vehicles));
        assert!(matches!(again, Err(AppError::Packaging(msg)) if msg.contains("already registered")));

        remove_vehicle_inner("bus", &config(&vehicles)).unwrap();
        assert!(list_vehicles_inner(&config(&vehicles)).unwrap().is_empty());
        assert!(matches!(
            remove_vehicle_inner("bus", &config(&vehicles)),
            Err(AppError::Packaging(_))
        ));
    }

    #[test]
    fn check_reports_missing_files() {
        let tmp = TempDir::new().unwrap();
        let skin = tmp.path().join("pickup").join("SKINNAME");
        fs::create_dir_all(&skin).unwrap();
        fs::write(skin.join("skin.jbeam"), "{}").unwrap();

        let checks = check_vehicles_inner(None, &config(tmp.path())).unwrap();
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].is_complete());
        assert!(checks[0].problems[0].contains("skin.materials.json"));

        let ghost = check_vehicles_inner(Some("ghost"), &config(tmp.path())).unwrap();
        assert!(ghost[0].problems[0].contains("missing template folder"));
    }
}
