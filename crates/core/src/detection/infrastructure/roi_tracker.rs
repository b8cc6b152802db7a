//! Crop bookkeeping for the mesh backend: seed from a detector box,
//! follow the landmarks while the face score holds, drop on loss.

use nalgebra::Point2;

use crate::detection::domain::face_detector::BoxDetection;
use crate::shared::frame::Frame;

use super::preprocess::CropRect;

pub struct RoiTracker {
    roi: Option<CropRect>,
    crop_scale: f64,
    min_detection_confidence: f64,
    min_tracking_confidence: f64,
}

impl RoiTracker {
    pub fn new(min_detection_confidence: f64, min_tracking_confidence: f64, crop_scale: f64) -> Self {
        Self {
            roi: None,
            crop_scale,
            min_detection_confidence,
            min_tracking_confidence,
        }
    }

    /// Crop carried over from the previous frame.
    pub fn tracked(&self) -> Option<CropRect> {
        self.roi
    }

    /// Crop for an untracked frame. Boxes under the detection threshold
    /// seed nothing.
    pub fn seed(&self, frame: &Frame, detection: Option<BoxDetection>) -> Option<CropRect> {
        detection
            .filter(|d| d.score >= self.min_detection_confidence)
            .map(|d| CropRect::around_box(&d.bbox, frame, self.crop_scale))
    }

    /// Records this frame's landmarks and returns whether tracking holds.
    /// A model without a face flag keeps tracking as long as it returns
    /// landmarks.
    pub fn update(&mut self, pixels: &[Point2<f64>], face_score: Option<f64>) -> bool {
        let tracked = face_score.unwrap_or(1.0) >= self.min_tracking_confidence;
        self.roi = if tracked {
            CropRect::around_points(pixels, self.crop_scale)
        } else {
            None
        };
        self.roi.is_some()
    }
}
