//! Loaders for the three detector tiers.
//!
//! ONNX tiers resolve their model from local disk on `load()`; a missing
//! file or an unusable runtime fails the tier so the next one is tried.

use std::path::PathBuf;

use crate::detection::domain::face_detector::{BackendKind, BackendProvider, FaceDetector};
use crate::detection::domain::multi_strategy_detector::MultiStrategyDetector;
use crate::shared::constants::{BOX_MODEL_NAME, LANDMARK_MODEL_NAME};
use crate::shared::model_resolver;

use super::onnx_box_detector::{self, OnnxBoxDetector};
use super::onnx_landmark_detector::{self, OnnxLandmarkDetector};
use super::skin_tone_detector::SkinToneDetector;

/// Directories searched for model files, in order after the explicit one.
#[derive(Clone, Debug, Default)]
pub struct ModelLocations {
    pub model_dir: Option<PathBuf>,
    pub bundled_dir: Option<PathBuf>,
}

impl ModelLocations {
    pub fn new(model_dir: Option<PathBuf>) -> Self {
        Self {
            model_dir,
            bundled_dir: bundled_models_dir(),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, model_resolver::ModelResolveError> {
        model_resolver::resolve(
            name,
            self.model_dir.as_deref(),
            self.bundled_dir.as_deref(),
        )
    }
}

/// `models/` next to the running executable, for pre-packaged installs.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

pub struct LandmarkModelProvider {
    locations: ModelLocations,
}

impl LandmarkModelProvider {
    pub fn new(locations: ModelLocations) -> Self {
        Self { locations }
    }
}

impl BackendProvider for LandmarkModelProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Landmark
    }

    fn load(&self) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        let path = self.locations.resolve(LANDMARK_MODEL_NAME)?;
        log::debug!("Loading landmark model from {}", path.display());
        let detector =
            OnnxLandmarkDetector::new(&path, onnx_landmark_detector::DEFAULT_CONFIDENCE)?;
        Ok(Box::new(detector))
    }
}

pub struct BoxModelProvider {
    locations: ModelLocations,
}

impl BoxModelProvider {
    pub fn new(locations: ModelLocations) -> Self {
        Self { locations }
    }
}

impl BackendProvider for BoxModelProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn load(&self) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        let path = self.locations.resolve(BOX_MODEL_NAME)?;
        log::debug!("Loading box model from {}", path.display());
        let detector = OnnxBoxDetector::new(&path, onnx_box_detector::DEFAULT_CONFIDENCE)?;
        Ok(Box::new(detector))
    }
}

/// Always loads.
pub struct SkinToneProvider;

impl BackendProvider for SkinToneProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::SkinTone
    }

    fn load(&self) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        Ok(Box::new(SkinToneDetector::new()))
    }
}

/// All three tiers in preference order.
pub fn default_providers(locations: ModelLocations) -> Vec<Box<dyn BackendProvider>> {
    vec![
        Box::new(LandmarkModelProvider::new(locations.clone())),
        Box::new(BoxModelProvider::new(locations)),
        Box::new(SkinToneProvider),
    ]
}

/// Uninitialized detector over the default tiers.
pub fn default_detector(model_dir: Option<PathBuf>) -> MultiStrategyDetector {
    MultiStrategyDetector::new(default_providers(ModelLocations::new(model_dir)))
}
