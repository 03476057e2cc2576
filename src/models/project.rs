//! Project data model: the mod being built, its cars and their skins.
//!
//! [`Project`] is both the in-memory and the on-disk representation. A
//! `.bsproject` file is a direct `serde_json` serialization of this struct;
//! there is no schema version and no migration step. Legacy key names written
//! by older builds (`dds_path`, `pc_path`, `jpg_path`) are accepted on load.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::naming::sanitize_mod_name;

/// Author written into skin metadata when the project leaves it blank.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Validation failures for a [`Project`] that is about to be packaged.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("mod name is empty")]
    EmptyModName,
    #[error("project has no cars")]
    NoCars,
    #[error("car '{0}' has no skins")]
    CarWithoutSkins(String),
    #[error("skin #{index} of car '{car}' has no name")]
    UnnamedSkin { car: String, index: usize },
    #[error("skin '{skin}' of car '{car}' has no texture file")]
    MissingTexturePath { car: String, skin: String },
    #[error("skin '{skin}': {property} of material '{material}' stage {stage} is {value}, expected 0..=1")]
    PropertyOutOfRange {
        skin: String,
        material: String,
        stage: usize,
        property: ShaderProperty,
        value: f64,
    },
}

/// Shader-stage properties a skin may override in its material file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShaderProperty {
    #[serde(rename = "clearCoatFactor")]
    ClearCoatFactor,
    #[serde(rename = "clearCoatRoughnessFactor")]
    ClearCoatRoughnessFactor,
    #[serde(rename = "metallicFactor")]
    MetallicFactor,
    #[serde(rename = "roughnessFactor")]
    RoughnessFactor,
}

impl ShaderProperty {
    pub const ALL: [ShaderProperty; 4] = [
        Self::ClearCoatFactor,
        Self::ClearCoatRoughnessFactor,
        Self::MetallicFactor,
        Self::RoughnessFactor,
    ];

    /// Key used for this property inside a material stage object.
    pub fn key(self) -> &'static str {
        match self {
            Self::ClearCoatFactor => "clearCoatFactor",
            Self::ClearCoatRoughnessFactor => "clearCoatRoughnessFactor",
            Self::MetallicFactor => "metallicFactor",
            Self::RoughnessFactor => "roughnessFactor",
        }
    }
}

impl std::str::FromStr for ShaderProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|p| p.key()).collect();
                format!("unknown shader property '{s}', expected one of {}", known.join(", "))
            })
    }
}

impl std::fmt::Display for ShaderProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Property values for one stage. `None` leaves the stage's current value alone.
pub type StageOverrides = BTreeMap<ShaderProperty, Option<f64>>;

/// Material name → stage index → property overrides.
pub type MaterialOverrides = BTreeMap<String, BTreeMap<usize, StageOverrides>>;

/// Optional vehicle configuration shipped alongside a skin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Category shown in the in-game vehicle selector (e.g. `"Police"`).
    #[serde(default = "default_config_type")]
    pub config_type: String,
    /// Display name of the configuration in game.
    pub config_name: String,
    /// Source `.pc` vehicle configuration file.
    #[serde(alias = "pc_path")]
    pub vehicle_config_path: PathBuf,
    /// Source thumbnail shown next to the configuration.
    #[serde(alias = "jpg_path")]
    pub config_icon_path: PathBuf,
}

fn default_config_type() -> String {
    "Factory".to_string()
}

/// One skin to generate for a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinEntry {
    /// Human-readable display name (also the source of the folder name).
    pub name: String,
    /// Absolute path to the user's `.dds` texture.
    #[serde(alias = "dds_path")]
    pub texture_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<ConfigData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_properties: Option<MaterialOverrides>,
}

impl SkinEntry {
    pub fn new(name: impl Into<String>, texture_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            texture_path: texture_path.into(),
            config_data: None,
            material_properties: None,
        }
    }
}

/// A car added to the project. The same `base_carid` may back several entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarEntry {
    /// Template identifier (`vehicles/<base_carid>/SKINNAME`).
    pub base_carid: String,
    #[serde(default)]
    pub skins: Vec<SkinEntry>,
}

/// The top-level unit of work: one mod archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub mod_name: String,
    #[serde(default)]
    pub author: String,
    /// Car instance id → car. Instance ids are unique; base car ids need not be.
    #[serde(default)]
    pub cars: BTreeMap<String, CarEntry>,
    /// RFC 3339 timestamp of the first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// RFC 3339 timestamp of the latest save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl Project {
    pub fn new(mod_name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            mod_name: mod_name.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Author with blanks replaced by [`DEFAULT_AUTHOR`].
    pub fn effective_author(&self) -> &str {
        let author = self.author.trim();
        if author.is_empty() {
            DEFAULT_AUTHOR
        } else {
            author
        }
    }

    pub fn total_skins(&self) -> usize {
        self.cars.values().map(|c| c.skins.len()).sum()
    }

    /// Add a car and return its instance id.
    ///
    /// The first instance of a car is keyed by the car id itself; further
    /// instances get a random `<carid>_<hex>` key.
    pub fn add_car(&mut self, base_carid: &str) -> String {
        let instance_id = if self.cars.contains_key(base_carid) {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("{base_carid}_{}", &suffix[..8])
        } else {
            base_carid.to_string()
        };
        self.cars.insert(
            instance_id.clone(),
            CarEntry {
                base_carid: base_carid.to_string(),
                skins: Vec::new(),
            },
        );
        instance_id
    }

    /// Check everything that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<(), ModelError> {
        if sanitize_mod_name(&self.mod_name).is_empty() {
            return Err(ModelError::EmptyModName);
        }
        if self.cars.is_empty() {
            return Err(ModelError::NoCars);
        }
        for (instance_id, car) in &self.cars {
            if car.skins.is_empty() {
                return Err(ModelError::CarWithoutSkins(instance_id.clone()));
            }
            for (index, skin) in car.skins.iter().enumerate() {
                if skin.name.trim().is_empty() {
                    return Err(ModelError::UnnamedSkin {
                        car: instance_id.clone(),
                        index,
                    });
                }
                if skin.texture_path.as_os_str().is_empty() {
                    return Err(ModelError::MissingTexturePath {
                        car: instance_id.clone(),
                        skin: skin.name.clone(),
                    });
                }
                validate_overrides(skin)?;
            }
        }
        Ok(())
    }
}

fn validate_overrides(skin: &SkinEntry) -> Result<(), ModelError> {
    let Some(materials) = &skin.material_properties else {
        return Ok(());
    };
    for (material, stages) in materials {
        for (&stage, props) in stages {
            for (&property, value) in props {
                if let Some(v) = *value {
                    if !(0.0..=1.0).contains(&v) {
                        return Err(ModelError::PropertyOutOfRange {
                            skin: skin.name.clone(),
                            material: material.clone(),
                            stage,
                            property,
                            value: v,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
