//! Per-skin vehicle configuration files.
//!
//! A skin with [`ConfigData`] ships a `.pc` configuration, its thumbnail and an
//! `info_<skin>.json` descriptor in the car folder (`vehicles/<carid>/`), next
//! to the skin folders rather than inside one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{json_escape, PackagingError};
use crate::models::ConfigData;

/// Files written for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOutput {
    pub vehicle_config: PathBuf,
    pub icon: PathBuf,
    pub descriptor: PathBuf,
    /// Descriptor keys that were expected but not found.
    pub missing_keys: Vec<&'static str>,
}

fn config_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"("Config Type"\s*:\s*")[^"]*(")"#).expect("static pattern"))
}

fn configuration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"("Configuration"\s*:\s*")[^"]*(")"#).expect("static pattern"))
}

/// Check both source files exist before anything is copied.
pub fn validate_sources(config: &ConfigData) -> Result<(), PackagingError> {
    for path in [&config.vehicle_config_path, &config.config_icon_path] {
        if !path.is_file() {
            return Err(PackagingError::SourceMissing(path.clone()));
        }
    }
    Ok(())
}

/// Replace the values of the `"Config Type"` and `"Configuration"` fields,
/// leaving the rest of the text (comments included) untouched.
///
/// Returns the new text and the keys that were not present.
pub fn patch_descriptor(text: &str, config_type: &str, config_name: &str) -> (String, Vec<&'static str>) {
    let mut missing = Vec::new();
    let mut out = text.to_string();
    for (key, pattern, value) in [
        ("Config Type", config_type_pattern(), config_type),
        ("Configuration", configuration_pattern(), config_name),
    ] {
        if !pattern.is_match(&out) {
            missing.push(key);
            continue;
        }
        let escaped = json_escape(value);
        out = pattern
            .replace_all(&out, |caps: &Captures<'_>| {
                format!("{}{}{}", &caps[1], escaped, &caps[2])
            })
            .into_owned();
    }
    (out, missing)
}

/// Copy the configuration files for `skin_stem` into `car_root` and write
/// its descriptor from `descriptor_template`.
///
/// Sources are validated first, so a missing file leaves nothing behind.
pub fn write_config(
    config: &ConfigData,
    skin_stem: &str,
    car_root: &Path,
    descriptor_template: &Path,
) -> Result<ConfigOutput, PackagingError> {
    validate_sources(config)?;
    fs::create_dir_all(car_root).map_err(|e| PackagingError::io(car_root, e))?;

    let vehicle_config = car_root.join(format!("{skin_stem}.pc"));
    fs::copy(&config.vehicle_config_path, &vehicle_config)
        .map_err(|e| PackagingError::io(&config.vehicle_config_path, e))?;

    let icon_ext = config
        .config_icon_path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string());
    let icon = car_root.join(format!("{skin_stem}.{icon_ext}"));
    fs::copy(&config.config_icon_path, &icon)
        .map_err(|e| PackagingError::io(&config.config_icon_path, e))?;

    let template_text = fs::read_to_string(descriptor_template)
        .map_err(|e| PackagingError::io(descriptor_template, e))?;
    let (text, missing_keys) =
        patch_descriptor(&template_text, &config.config_type, &config.config_name);
    for key in &missing_keys {
        tracing::warn!(key, template = %descriptor_template.display(), "descriptor key not found");
    }
    let descriptor = car_root.join(format!("info_{skin_stem}.json"));
    fs::write(&descriptor, text).map_err(|e| PackagingError::io(&descriptor, e))?;

    tracing::debug!(
        skin = skin_stem,
        config_type = %config.config_type,
        config_name = %config.config_name,
        "wrote vehicle configuration"
    );
    Ok(ConfigOutput {
        vehicle_config,
        icon,
        descriptor,
        missing_keys,
    })
}
