//! User configuration loaded from `config.toml`.
//!
//! ```toml
//! vehicles_dir = "vehicles"
//! mods_folder = "D:/Games/BeamNG/mods"   # optional
//! game_version = "0.33"
//! log_filter = "info"
//! ```
//!
//! Every key is optional. A missing file yields [`Config::default`].

use std::path::{Path, PathBuf};

/// Errors from reading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct Config {
    /// Root of the vehicle template tree (`<vehicles_dir>/<carid>/SKINNAME`).
    pub vehicles_dir: PathBuf,
    /// Where generated mods go when the mods-folder target is chosen.
    pub mods_folder: Option<PathBuf>,
    /// BeamNG.drive version segment of the default mods path.
    pub game_version: String,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vehicles_dir: PathBuf::from("vehicles"),
            mods_folder: None,
            game_version: "0.33".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// `<config_dir>/beamskin/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("beamskin")
            .join("config.toml")
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path`; a missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "game_version must not be empty".to_string(),
            ));
        }
        if self.vehicles_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "vehicles_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured mods folder, else the game's default under the local
    /// data directory (`%LOCALAPPDATA%\BeamNG.drive\<version>\mods` on Windows).
    pub fn default_mods_dir(&self) -> PathBuf {
        match &self.mods_folder {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_default()
                .join("BeamNG.drive")
                .join(&self.game_version)
                .join("mods"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::parse("").expect("empty TOML is valid");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.vehicles_dir, PathBuf::from("vehicles"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::parse(r#"mods_folder = "/games/mods""#).unwrap();
        assert_eq!(cfg.mods_folder, Some(PathBuf::from("/games/mods")));
        assert_eq!(cfg.game_version, "0.33");
        assert_eq!(cfg.default_mods_dir(), PathBuf::from("/games/mods"));
    }

    #[test]
    fn default_mods_dir_uses_game_version() {
        let cfg = Config {
            game_version: "0.34".to_string(),
            ..Config::default()
        };
        let dir = cfg.default_mods_dir();
        assert!(dir.ends_with("BeamNG.drive/0.34/mods"));
    }

    #[test]
    fn empty_game_version_is_rejected() {
        let err = Config::parse(r#"game_version = " ""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("game_version")));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let err = Config::parse("colour = \"red\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = Config::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
