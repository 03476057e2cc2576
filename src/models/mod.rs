pub mod naming;
pub mod project;

pub use naming::{sanitize_mod_name, sanitize_skin_name, skin_identifier};
pub use project::{
    CarEntry, ConfigData, MaterialOverrides, ModelError, Project, ShaderProperty, SkinEntry,
    StageOverrides, DEFAULT_AUTHOR,
};
