//! Tracker configuration loaded from JSON

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{Regime, DEFAULT_BASE_URL, STATIONS_CATEGORY};
use crate::propagation::{GroundTrackWindow, LayerVisibility, PathWindow};

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "satwatch.json";

/// Every field is optional in the file; missing fields take their defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Element-set source endpoint
    pub source_base_url: String,
    pub request_timeout_secs: u64,
    /// Categories fetched at startup
    pub initial_categories: Vec<String>,
    /// Orbit types shown at startup
    pub initial_orbit_types: Vec<Regime>,
    pub initial_rate: f64,
    pub layers: LayerVisibility,
    pub path_window: PathWindow,
    pub ground_track_window: GroundTrackWindow,
    /// Equirectangular earth image. Without one the earth is drawn flat-colored.
    pub earth_texture: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 15,
            initial_categories: vec![STATIONS_CATEGORY.to_string()],
            initial_orbit_types: Regime::ALL.to_vec(),
            initial_rate: 1.0,
            layers: LayerVisibility::default(),
            path_window: PathWindow::default(),
            ground_track_window: GroundTrackWindow::default(),
            earth_texture: None,
        }
    }
}

impl TrackerConfig {
    /// Load the configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading configuration from {:?}", path);

        let file =
            File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let config: TrackerConfig = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise use defaults. A file that exists
    /// but cannot be parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "initial_categories": ["geo", "gps-ops"],
            "initial_orbit_types": ["GEO", "MEO"],
            "path_window": { "steps_each_side": 10 }
        }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.initial_categories, vec!["geo", "gps-ops"]);
        assert_eq!(config.initial_orbit_types, vec![Regime::Geo, Regime::Meo]);
        assert_eq!(config.path_window.steps_each_side, 10);
        assert_eq!(config.path_window.step_seconds, PathWindow::default().step_seconds);
        assert_eq!(config.source_base_url, DEFAULT_BASE_URL);
        assert!(config.earth_texture.is_none());
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: TrackerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = TrackerConfig::load_or_default("no/such/satwatch.json").unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let path = std::env::temp_dir().join(format!("satwatch-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = TrackerConfig::load_or_default(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_request_timeout_is_at_least_one_second() {
        let config = TrackerConfig {
            request_timeout_secs: 0,
            ..TrackerConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
