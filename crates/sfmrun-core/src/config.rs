use std::{fmt::Display, fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::ConfigError;

pub const COLMAP_BIN_VAR: &str = "SFMRUN_COLMAP_BIN";
pub const OPENMVG_BIN_DIR_VAR: &str = "SFMRUN_OPENMVG_BIN_DIR";
pub const OPENMVG_SENSOR_DB_VAR: &str = "SFMRUN_OPENMVG_SENSOR_DB";

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Configuration {
    pub colmap: ColmapConfig,
    pub openmvg: OpenMvgConfig,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColmapConfig {
    pub binary: PathBuf,
    /// Passed as `--ImageReader.camera_model`, COLMAP picks its own default otherwise
    pub camera_model: Option<String>,
    pub dense: bool,
    pub mesh: bool,
    pub geom_consistency: bool,
}

impl Default for ColmapConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("colmap"),
            camera_model: None,
            dense: true,
            mesh: false,
            geom_consistency: true,
        }
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineSelection {
    Incremental,
    Global,
    #[default]
    Both,
}

impl Display for EngineSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineSelection::Incremental => f.write_str("incremental"),
            EngineSelection::Global => f.write_str("global"),
            EngineSelection::Both => f.write_str("both"),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenMvgConfig {
    /// Directory holding the `openMVG_main_*` binaries, `PATH` is searched when unset
    pub bin_dir: Option<PathBuf>,
    /// `sensor_width_camera_database.txt`
    pub sensor_database: Option<PathBuf>,
    pub camera_model: u8,
    pub describer: String,
    pub nearest_matching: String,
    pub engine: EngineSelection,
}

impl Default for OpenMvgConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            sensor_database: None,
            camera_model: 3,
            describer: "SIFT".to_owned(),
            nearest_matching: "ANNL2".to_owned(),
            engine: EngineSelection::Both,
        }
    }
}

impl Configuration {
    /// Loads the JSON file at `path` (or the defaults) and applies environment overrides.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        debug!(config=?config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(binary) = lookup(COLMAP_BIN_VAR) {
            info!(binary=%binary, "colmap binary overridden from environment");
            self.colmap.binary = binary.into();
        }
        if let Some(dir) = lookup(OPENMVG_BIN_DIR_VAR) {
            info!(dir=%dir, "openMVG binary directory overridden from environment");
            self.openmvg.bin_dir = Some(dir.into());
        }
        if let Some(database) = lookup(OPENMVG_SENSOR_DB_VAR) {
            info!(database=%database, "openMVG sensor database overridden from environment");
            self.openmvg.sensor_database = Some(database.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs, path::PathBuf};

    use super::{
        Configuration, EngineSelection, COLMAP_BIN_VAR, OPENMVG_BIN_DIR_VAR,
        OPENMVG_SENSOR_DB_VAR,
    };
    use crate::error::ConfigError;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "colmap": { "mesh": true }, "openmvg": { "engine": "global" } }"#,
        )
        .unwrap();

        let config = Configuration::from_file(&path).unwrap();

        assert!(config.colmap.mesh);
        assert!(config.colmap.dense);
        assert_eq!(config.colmap.binary, PathBuf::from("colmap"));
        assert_eq!(config.openmvg.engine, EngineSelection::Global);
        assert_eq!(config.openmvg.camera_model, 3);
        assert_eq!(config.openmvg.nearest_matching, "ANNL2");
    }

    #[test]
    fn default_round_trips_through_json() {
        let config = Configuration::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let parsed: Configuration = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let error = Configuration::from_file(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let error = Configuration::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (COLMAP_BIN_VAR, "/opt/colmap/bin/colmap"),
            (OPENMVG_BIN_DIR_VAR, "/opt/openmvg/bin"),
            (OPENMVG_SENSOR_DB_VAR, ""),
        ]);
        let mut config = Configuration::default();

        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.colmap.binary, PathBuf::from("/opt/colmap/bin/colmap"));
        assert_eq!(config.openmvg.bin_dir, Some(PathBuf::from("/opt/openmvg/bin")));
        // Empty values are ignored
        assert_eq!(config.openmvg.sensor_database, None);
    }
}
