//! # Config Loader
//!
//! Rig configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse JSON/TOML rig setup files
//! - Validate the setup before any sensor is spawned
//! - Produce a typed `RigConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let rig = ConfigLoader::load_car_setup(Path::new("setups"), "sedan").unwrap();
//! println!("Sectors: {:?}", rig.sector_names());
//! ```

mod parser;
mod validator;

pub use contracts::RigConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load a rig setup from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.json / .toml).
    ///
    /// # Errors
    /// - Missing file
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RigConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        debug!(path = %path.display(), ?format, "loading rig configuration");
        Self::load_from_str(&content, format)
    }

    /// Load the setup of one car identity from `setup_dir`
    ///
    /// Looks for `{car_name}.json` first, then `{car_name}.toml`.
    ///
    /// # Errors
    /// `ConfigParse` when neither file exists, otherwise as [`ConfigLoader::load_from_path`].
    pub fn load_car_setup(setup_dir: &Path, car_name: &str) -> Result<RigConfig, ContractError> {
        match Self::find_car_setup(setup_dir, car_name) {
            Some(path) => Self::load_from_path(&path),
            None => Err(ContractError::config_parse(format!(
                "rig configuration not found: {}/{car_name}.{{json,toml}}",
                setup_dir.display()
            ))),
        }
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RigConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize RigConfig to TOML string
    pub fn to_toml(rig: &RigConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(rig)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RigConfig to JSON string
    pub fn to_json(rig: &RigConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(rig)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Setup file of `car_name` in `setup_dir`, `.json` before `.toml`
    pub fn find_car_setup(setup_dir: &Path, car_name: &str) -> Option<PathBuf> {
        [ConfigFormat::Json, ConfigFormat::Toml]
            .iter()
            .map(|format| setup_dir.join(format!("{car_name}.{}", format.extension())))
            .find(|path| path.is_file())
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContractError::ConfigParse {
                    message: format!("rig configuration not found: {}", path.display()),
                    source: Some(Box::new(e)),
                }
            } else {
                ContractError::Io(e)
            }
        })
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<RigConfig, ContractError> {
        let rig = parser::parse(content, format)?;
        validator::validate(&rig)?;
        Ok(rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SECTOR_JSON: &str = r#"{
        "reset_matrix": [[1,0,0,0],[0,1,0,1.5],[0,0,1,0.25],[0,0,0,1]],
        "cameras_locations": {
            "main": [0.0, 0.0, 0.0],
            "left": [-0.3, 0.0, 0.0],
            "rear": [0.0, 0.0, -2.5]
        },
        "views": {
            "main": {
                "R_to_main": [0, 0, 0], "origin": [640, 360],
                "width": 1280, "height": 720, "focal": 1000.0, "scale": 2,
                "cams": ["main", "left"]
            },
            "rear": {
                "R_to_main": [0, 180, 0], "origin": [640, 360],
                "width": 1280, "height": 720, "focal": 800.0, "scale": 1,
                "cams": ["rear"]
            }
        }
    }"#;

    #[test]
    fn test_load_from_str_json() {
        let rig = ConfigLoader::load_from_str(TWO_SECTOR_JSON, ConfigFormat::Json).unwrap();
        assert_eq!(rig.sector_names(), vec!["main", "rear"]);
        assert_eq!(rig.camera_location("left"), Some([-0.3, 0.0, 0.0]));
    }

    #[test]
    fn test_round_trip_toml() {
        let rig = ConfigLoader::load_from_str(TWO_SECTOR_JSON, ConfigFormat::Json).unwrap();
        let serialized = ConfigLoader::to_toml(&rig).unwrap();
        let rig2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(rig.views, rig2.views);
        assert_eq!(rig.reset_matrix, rig2.reset_matrix);
    }

    #[test]
    fn test_round_trip_json() {
        let rig = ConfigLoader::load_from_str(TWO_SECTOR_JSON, ConfigFormat::Json).unwrap();
        let json = ConfigLoader::to_json(&rig).unwrap();
        assert!(json.contains("R_to_main"));
        let rig2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(rig.cameras_locations, rig2.cameras_locations);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = TWO_SECTOR_JSON.replace(r#""cams": ["rear"]"#, r#""cams": ["ghost"]"#);
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Json).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ghost"), "got: {err}");
    }

    #[test]
    fn test_load_car_setup_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sedan.json"), TWO_SECTOR_JSON).unwrap();
        std::fs::write(dir.path().join("sedan.toml"), "not toml at all [").unwrap();

        let rig = ConfigLoader::load_car_setup(dir.path(), "sedan").unwrap();
        assert_eq!(rig.views.len(), 2);
    }

    #[test]
    fn test_load_car_setup_falls_back_to_toml() {
        let dir = tempfile::tempdir().unwrap();
        let rig = ConfigLoader::load_from_str(TWO_SECTOR_JSON, ConfigFormat::Json).unwrap();
        std::fs::write(
            dir.path().join("van.toml"),
            ConfigLoader::to_toml(&rig).unwrap(),
        )
        .unwrap();

        let loaded = ConfigLoader::load_car_setup(dir.path(), "van").unwrap();
        assert_eq!(loaded.views, rig.views);
    }

    #[test]
    fn test_missing_file_is_fatal_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_car_setup(dir.path(), "nobody").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("not found"));

        let err = ConfigLoader::load_from_path(&dir.path().join("nobody.json")).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("rig.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
