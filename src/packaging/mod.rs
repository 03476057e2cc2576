//! Mod-packaging pipeline.
//!
//! ```text
//! packaging/
//! ├── template.rs    locate vehicle templates, stage per-skin working copies
//! ├── rewrite.rs     regex rewriting of JBEAM / material JSON files
//! ├── descriptor.rs  per-configuration .pc / icon / info_<skin>.json writer
//! ├── materials.rs   shader-stage property overrides
//! ├── normalize.rs   canonical texture file names
//! ├── archive.rs     scratch tree → .zip
//! └── pipeline.rs    the `generate` entry point tying the above together
//! ```

pub mod archive;
pub mod descriptor;
pub mod materials;
pub mod normalize;
pub mod pipeline;
pub mod rewrite;
pub mod template;

use std::path::PathBuf;

use crate::models::ModelError;

pub use pipeline::{generate, GenerateOptions, GenerateReport, Progress, SkippedSkin};

/// Internal error type for packaging failures.
/// The command layer maps these to `AppError::Packaging` at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("invalid project: {0}")]
    InvalidProject(#[from] ModelError),

    #[error(
        "no template found for vehicle '{carid}'; expected location: {}. \
         Register the vehicle first so its SKINNAME folder exists",
        .expected.display()
    )]
    MissingTemplate { carid: String, expected: PathBuf },

    #[error("no info*.json descriptor template for vehicle '{carid}' in {}", .dir.display())]
    MissingDescriptor { carid: String, dir: PathBuf },

    #[error("a mod archive already exists at {}; choose a different name or delete it", .0.display())]
    OutputExists(PathBuf),

    #[error("vehicle '{carid}' is already registered at {}", .dir.display())]
    VehicleExists { carid: String, dir: PathBuf },

    #[error("cannot register vehicle: {0}")]
    InvalidVehicle(String),

    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("no skins could be packaged")]
    NothingToPackage,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("cannot walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl PackagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walk(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }
}

/// Extensions treated as game textures (case-insensitive).
pub const TEXTURE_EXTENSIONS: &[&str] = &["dds"];

/// Name of the placeholder skin folder inside every vehicle template.
pub const TEMPLATE_SKIN_DIR: &str = "SKINNAME";

pub(crate) fn is_texture(path: &std::path::Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| TEXTURE_EXTENSIONS.contains(&e.as_str()))
}

/// `true` for `materials.json` and `*.materials.json`.
pub(crate) fn is_materials_file(name: &str) -> bool {
    name == "materials.json" || name.ends_with(".materials.json")
}

/// Escape `value` for insertion between the quotes of a JSON string.
pub(crate) fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
