use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::constants::{
    DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE, MAX_FACES,
};

pub const DEFAULT_MAX_SOLVER_ITERATIONS: usize = 100;

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
    #[error("max_faces must be 1, got {0}")]
    MaxFaces(u32),
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("max_solver_iterations must be at least 1")]
    NoSolverIterations,
    #[error("camera intrinsics must have positive focal lengths")]
    FocalLength,
}

/// Options recognised by the landmark detector session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub max_faces: u32,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
    /// Selects the iris-refined mesh model.
    pub refine_landmarks: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_faces: MAX_FACES,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
            refine_landmarks: true,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_faces != MAX_FACES {
            return Err(ConfigError::MaxFaces(self.max_faces));
        }
        check_unit_range("min_detection_confidence", self.min_detection_confidence)?;
        check_unit_range("min_tracking_confidence", self.min_tracking_confidence)?;
        Ok(())
    }
}

/// Where model files come from. Missing files are downloaded only when a
/// URL is configured.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory checked after the user cache.
    pub dir: Option<PathBuf>,
    pub face_mesh_url: Option<String>,
    pub blazeface_url: Option<String>,
    /// Disables the bounding-box fallback tier.
    pub mesh_only: bool,
}

/// Top-level pipeline configuration, usually loaded from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TryOnConfig {
    pub detector: DetectorConfig,
    /// Calibrated intrinsics; approximated from the frame size when absent.
    pub intrinsics: Option<CameraIntrinsics>,
    pub lighting: bool,
    pub max_solver_iterations: usize,
    pub models: ModelConfig,
}

impl Default for TryOnConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            intrinsics: None,
            lighting: true,
            max_solver_iterations: DEFAULT_MAX_SOLVER_ITERATIONS,
            models: ModelConfig::default(),
        }
    }
}

impl TryOnConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: TryOnConfig = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        if self.max_solver_iterations == 0 {
            return Err(ConfigError::NoSolverIterations);
        }
        if let Some(k) = &self.intrinsics {
            if k.fx <= 0.0 || k.fy <= 0.0 {
                return Err(ConfigError::FocalLength);
            }
        }
        Ok(())
    }
}

fn check_unit_range(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}
