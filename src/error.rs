//! Application-level error type returned by all command handlers.
//!
//! `AppError` is serialized to `{ kind, message }` JSON payloads so any front
//! end (the CLI's `--json` output included) can match on a stable `kind` string.

use crate::config::ConfigError;
use crate::packaging::PackagingError;

/// Top-level error returned by command handlers.
///
/// Serialized with serde's adjacently-tagged representation:
/// `{ "kind": "<variant>", "message": "<human-readable text>" }`
#[derive(Debug, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum AppError {
    /// A required file path does not exist on disk.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A generic I/O error, stringified so it stays serializable.
    #[error("{0}")]
    Io(String),

    /// The project file could not be loaded or parsed.
    #[error("{0}")]
    ProjectLoad(String),

    /// The project file could not be written.
    #[error("{0}")]
    ProjectSave(String),

    /// A requested car or skin is not in the project.
    #[error("{0}")]
    NotFound(String),

    /// A command argument was rejected before touching any state.
    #[error("{0}")]
    InvalidInput(String),

    /// Mod generation failed; the message comes from [`PackagingError`].
    #[error("{0}")]
    Packaging(String),

    #[error("{0}")]
    Config(String),
}

impl From<PackagingError> for AppError {
    fn from(e: PackagingError) -> Self {
        Self::Packaging(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    /// Convert an [`std::io::Error`] into an [`AppError::Io`].
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn io_error_serializes_to_kind_message() {
        let err = AppError::Io("disk full".to_string());
        let value = serde_json::to_value(&err).expect("serialize AppError::Io");
        assert_eq!(value["kind"], "Io");
        assert_eq!(value["message"], "disk full");
    }

    #[test]
    fn project_load_error_serializes_to_kind_message() {
        let err = AppError::ProjectLoad("invalid JSON".to_string());
        let value = serde_json::to_value(&err).expect("serialize AppError::ProjectLoad");
        assert_eq!(value["kind"], "ProjectLoad");
        assert_eq!(value["message"], "invalid JSON");
    }

    #[test]
    fn file_not_found_carries_path() {
        let err = AppError::FileNotFound("/tmp/a.dds".to_string());
        let value = serde_json::to_value(&err).expect("serialize AppError::FileNotFound");
        assert_eq!(value["kind"], "FileNotFound");
        assert_eq!(value["message"], "/tmp/a.dds");
        assert_eq!(err.to_string(), "file not found: /tmp/a.dds");
    }

    #[test]
    fn from_packaging_error_keeps_the_template_location() {
        let err = AppError::from(PackagingError::MissingTemplate {
            carid: "ghost".to_string(),
            expected: PathBuf::from("vehicles/ghost/SKINNAME"),
        });
        assert!(matches!(err, AppError::Packaging(_)));
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["kind"], "Packaging");
        let message = value["message"].as_str().unwrap_or_default();
        assert!(message.contains("ghost"));
        assert!(message.contains("SKINNAME"));
    }

    #[test]
    fn from_config_error_produces_config_variant() {
        let err = AppError::from(ConfigError::Invalid("game_version must not be empty".into()));
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["kind"], "Config");
    }

    #[test]
    fn from_io_error_produces_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let app_err = AppError::from(io_err);
        assert!(matches!(app_err, AppError::Io(_)));
        let value = serde_json::to_value(&app_err).expect("serialize");
        assert_eq!(value["kind"], "Io");
    }

    #[test]
    fn not_found_error_serializes_to_kind_message() {
        let err = AppError::NotFound("car etk800 not found".to_string());
        let value = serde_json::to_value(&err).expect("serialize AppError::NotFound");
        assert_eq!(value["kind"], "NotFound");
        assert_eq!(value["message"], "car etk800 not found");
    }
}
