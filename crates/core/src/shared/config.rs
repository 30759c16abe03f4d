use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::stride_decoder::StrideConfig;
use crate::shared::constants::DETECTOR_TARGET_SIZE;
use crate::tracking::domain::identity_tracker::TrackerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Detector post-processing parameters.
///
/// Thresholds are shared by every stride; anchors are per stride.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub input_size: u32,
    pub score_threshold: f64,
    /// Stricter threshold used when detecting faces in enrollment images.
    pub enroll_score_threshold: f64,
    pub nms_threshold: f64,
    pub strides: Vec<StrideConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: DETECTOR_TARGET_SIZE,
            score_threshold: 0.4,
            enroll_score_threshold: 0.5,
            nms_threshold: 0.4,
            strides: StrideConfig::scrfd_defaults(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub similarity_threshold: f32,
    /// How many ranked candidates are kept for logging.
    pub top_k: usize,
    /// Faces narrower or shorter than this (pixels) are not recognized.
    pub min_face_size: f64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.45,
            top_k: 5,
            min_face_size: 40.0,
        }
    }
}

/// Everything tunable about the engine, loadable from a JSON file.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub recognition: RecognitionConfig,
    pub tracker: TrackerConfig,
}

impl EngineConfig {
    /// `<config_dir>/Rollcall/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Rollcall").join("config.json"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `path` is `None`. An explicit path must exist; a missing default
    /// file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::read(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::read(&p)?,
                None => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detector.input_size == 0 {
            return Err(ConfigError::Invalid("detector.input_size must be > 0".into()));
        }
        if self.detector.strides.is_empty() {
            return Err(ConfigError::Invalid("detector.strides must not be empty".into()));
        }
        for s in &self.detector.strides {
            if s.stride == 0 || s.anchor_sizes.iter().any(|a| a.is_nan() || *a <= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "stride {} needs a positive stride and positive anchor sizes",
                    s.stride
                )));
            }
        }
        if self.tracker.history_len == 0 {
            return Err(ConfigError::Invalid("tracker.history_len must be > 0".into()));
        }
        if self.tracker.max_misses == 0 {
            return Err(ConfigError::Invalid("tracker.max_misses must be > 0".into()));
        }
        Ok(())
    }
}
