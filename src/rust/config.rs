use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{default_catalog, ModelDescriptor};
use crate::engine::ClassifierOptions;
use crate::presentation::Translations;
use crate::runtime::RuntimeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings, loaded from a JSON file. Every field is optional in
/// the file and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub score_threshold: f32,
    pub max_results: usize,
    /// Refresh interval of the frame pump
    pub frame_interval_ms: u64,
    pub models: Vec<ModelDescriptor>,
    /// Lowercase label to display label
    pub translations: BTreeMap<String, String>,
    pub runtime: RuntimeConfig,
    /// Directory of frames replayed by the camera
    pub camera_dir: Option<PathBuf>,
    pub camera_fps: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = Translations::default();
        let translations = ["normal", "pneumonia", "tuberculosis"]
            .iter()
            .map(|label| (label.to_string(), defaults.translate(label).to_string()))
            .collect();
        Self {
            score_threshold: 0.1,
            max_results: 5,
            frame_interval_ms: 16,
            models: default_catalog(),
            translations,
            runtime: RuntimeConfig::default(),
            camera_dir: None,
            camera_fps: 15.0,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be positive".into()));
        }
        if self.camera_fps <= 0.0 {
            return Err(ConfigError::Invalid("camera_fps must be positive".into()));
        }
        if let Some(pos) = self.models.iter().position(|m| m.path.is_empty()) {
            return Err(ConfigError::Invalid(format!("model {} has an empty path", pos)));
        }
        Ok(())
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            score_threshold: self.score_threshold,
            max_results: self.max_results,
        }
    }

    pub fn translations(&self) -> Translations {
        Translations::from_map(&self.translations)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.classifier_options(), ClassifierOptions::default());
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.translations().translate("Normal"), "正常");
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "score_threshold": 0.3,
                "models": [{"name": "Flowers", "path": "flowers.onnx", "labels": "flowers.txt"}],
                "translations": {"Rose": "玫瑰"}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.score_threshold, 0.3);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].labels.as_deref(), Some("flowers.txt"));
        assert_eq!(config.translations().translate("rose"), "玫瑰");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, r#"{"score_threshold": 1.5}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));
    }
}
