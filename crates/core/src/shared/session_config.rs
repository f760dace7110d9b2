//! Session configuration: detection thresholds, pacing and backend
//! selection, loadable from a JSON file and overridable from the CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eye_contact::domain::eye_contact_settings::{EyeContactSettings, Strictness};

use super::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECT_TIMEOUT_MS, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_MAX_DETECTED_FACES, DEFAULT_PITCH_THRESHOLD, DEFAULT_PROCESS_INTERVAL_MS,
    DEFAULT_YAW_THRESHOLD,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where detection runs relative to the scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Detection runs synchronously inside the tick.
    #[default]
    Inline,
    /// Detection runs on a dedicated worker thread; ticks poll for results.
    Threaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub yaw_threshold: f64,
    pub pitch_threshold: f64,
    pub confidence_threshold: f64,
    pub max_detected_faces: usize,
    pub process_interval_ms: u64,
    pub detect_timeout_ms: u64,
    pub history_capacity: usize,
    pub strictness: Strictness,
    pub executor: ExecutorMode,
    /// Extra directory searched first for ONNX models.
    pub model_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_detected_faces: DEFAULT_MAX_DETECTED_FACES,
            process_interval_ms: DEFAULT_PROCESS_INTERVAL_MS,
            detect_timeout_ms: DEFAULT_DETECT_TIMEOUT_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            strictness: Strictness::default(),
            executor: ExecutorMode::default(),
            model_dir: None,
        }
    }
}

impl SessionConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=180.0).contains(&self.yaw_threshold) {
            return Err(ConfigError::Invalid(format!(
                "yaw_threshold must be between 0 and 180, got {}",
                self.yaw_threshold
            )));
        }
        if !(0.0..=180.0).contains(&self.pitch_threshold) {
            return Err(ConfigError::Invalid(format!(
                "pitch_threshold must be between 0 and 180, got {}",
                self.pitch_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.max_detected_faces == 0 {
            return Err(ConfigError::Invalid(
                "max_detected_faces must be at least 1".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.detect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "detect_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn eye_contact_settings(&self) -> EyeContactSettings {
        EyeContactSettings {
            yaw_threshold: self.yaw_threshold,
            pitch_threshold: self.pitch_threshold,
            confidence_threshold: self.confidence_threshold,
            strictness: self.strictness,
        }
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }
}
