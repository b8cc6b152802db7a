use nalgebra::Point2;

use crate::detection::domain::face_detector::{BoxBackend, MeshBackend};
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::frame::Frame;

/// One tier of the face-locator cascade.
///
/// `Ok(None)` means "no face at this tier"; the locator moves on to the
/// next strategy.
pub trait LandmarkStrategy: Send {
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>>;
}

/// Dense mesh tier: converts backend output to pixel-space landmarks.
pub struct MeshStrategy {
    backend: Box<dyn MeshBackend>,
    min_detection_confidence: f64,
}

impl MeshStrategy {
    pub fn new(backend: Box<dyn MeshBackend>, min_detection_confidence: f64) -> Self {
        Self {
            backend,
            min_detection_confidence,
        }
    }
}

impl LandmarkStrategy for MeshStrategy {
    fn name(&self) -> &'static str {
        "face_mesh"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
        let Some(detection) = self.backend.detect(frame)? else {
            return Ok(None);
        };
        if detection
            .face_score
            .is_some_and(|s| s < self.min_detection_confidence)
        {
            return Ok(None);
        }
        let Some(confidence) = detection.confidence() else {
            return Ok(None);
        };

        let w = frame.width() as f64;
        let h = frame.height() as f64;
        let points = detection
            .points
            .iter()
            .map(|p| Point2::new(p.x * w, p.y * h))
            .collect();

        Ok(Some(LandmarkSet::mesh(
            self.backend.model(),
            points,
            confidence,
        )?))
    }
}

/// Coarse tier: synthesizes 6 points from the detector's face rectangle.
pub struct BoundingBoxStrategy {
    backend: Box<dyn BoxBackend>,
    min_detection_confidence: f64,
}

impl BoundingBoxStrategy {
    pub fn new(backend: Box<dyn BoxBackend>, min_detection_confidence: f64) -> Self {
        Self {
            backend,
            min_detection_confidence,
        }
    }
}

impl LandmarkStrategy for BoundingBoxStrategy {
    fn name(&self) -> &'static str {
        "bounding_box"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
        let detection = self
            .backend
            .detect(frame)?
            .filter(|d| d.score >= self.min_detection_confidence);

        Ok(detection.map(|d| {
            LandmarkSet::from_bounding_box(&d.bbox, frame.width(), frame.height(), d.score)
        }))
    }
}
