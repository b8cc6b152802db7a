use crate::detection::domain::landmark_set::{MeshModel, RelativeBoundingBox};
use crate::shared::frame::Frame;

/// One mesh point in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshPoint {
    pub x: f64,
    pub y: f64,
    /// Per-point presence score, when the model exposes one.
    pub presence: Option<f64>,
}

impl MeshPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            presence: None,
        }
    }
}

/// Raw output of a dense landmark model for the single tracked face.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshDetection {
    pub points: Vec<MeshPoint>,
    /// Model's face-present score, when it produces one.
    pub face_score: Option<f64>,
}

impl MeshDetection {
    /// Mean per-point presence, counting missing scores as 1.0.
    ///
    /// Returns `None` for an empty detection.
    pub fn confidence(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let sum: f64 = self.points.iter().map(|p| p.presence.unwrap_or(1.0)).sum();
        Some(sum / self.points.len() as f64)
    }
}

/// Raw output of a coarse face detector: the best box and its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxDetection {
    pub bbox: RelativeBoundingBox,
    pub score: f64,
}

/// External dense-landmark capability.
///
/// Implementations may be stateful (e.g., tracking a region of interest
/// across frames), hence `&mut self`.
pub trait MeshBackend: Send {
    fn model(&self) -> MeshModel;

    fn detect(&mut self, frame: &Frame)
        -> Result<Option<MeshDetection>, Box<dyn std::error::Error>>;
}

/// External coarse face-detection capability.
pub trait BoxBackend: Send {
    fn detect(&mut self, frame: &Frame)
        -> Result<Option<BoxDetection>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_confidence_defaults_missing_presence_to_one() {
        let det = MeshDetection {
            points: vec![MeshPoint::new(0.1, 0.2), MeshPoint::new(0.3, 0.4)],
            face_score: None,
        };
        assert_relative_eq!(det.confidence().unwrap(), 1.0);
    }

    #[test]
    fn test_confidence_averages_presence() {
        let det = MeshDetection {
            points: vec![
                MeshPoint {
                    presence: Some(0.2),
                    ..MeshPoint::new(0.1, 0.2)
                },
                MeshPoint {
                    presence: Some(0.8),
                    ..MeshPoint::new(0.3, 0.4)
                },
            ],
            face_score: None,
        };
        assert_relative_eq!(det.confidence().unwrap(), 0.5);
    }

    #[test]
    fn test_confidence_mixes_missing_and_reported() {
        let det = MeshDetection {
            points: vec![
                MeshPoint {
                    presence: Some(0.5),
                    ..MeshPoint::new(0.0, 0.0)
                },
                MeshPoint::new(0.0, 0.0),
            ],
            face_score: None,
        };
        assert_relative_eq!(det.confidence().unwrap(), 0.75);
    }

    #[test]
    fn test_confidence_of_empty_detection_is_none() {
        let det = MeshDetection {
            points: vec![],
            face_score: Some(0.9),
        };
        assert!(det.confidence().is_none());
    }
}
