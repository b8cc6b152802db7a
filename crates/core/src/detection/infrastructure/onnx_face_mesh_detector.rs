//! MediaPipe Face Mesh as the dense landmark backend.
//!
//! The model sees a square crop around the face. Between frames of one
//! stream the crop follows the previous landmarks, so the detector only
//! runs when tracking is lost.

use std::path::Path;

use nalgebra::Point2;

use crate::detection::domain::face_detector::{MeshBackend, MeshDetection, MeshPoint};
use crate::detection::domain::landmark_set::MeshModel;
use crate::shared::frame::Frame;

use super::execution_provider::open_session;
use super::preprocess::{crop_to_tensor, sigmoid, CropRect};
use super::roi_tracker::RoiTracker;
use super::shared_box_detector::SharedBoxBackend;

/// Crop side relative to the face extent.
const CROP_SCALE: f64 = 1.5;

/// Square input side of the landmark network.
fn input_size(model: MeshModel) -> u32 {
    match model {
        MeshModel::FaceMesh468 => 192,
        MeshModel::FaceMeshIris478 => 256,
    }
}

pub struct OnnxFaceMeshBackend {
    session: ort::session::Session,
    model: MeshModel,
    tracker: RoiTracker,
    seed_detector: Option<SharedBoxBackend>,
}

impl OnnxFaceMeshBackend {
    pub fn new(
        model_path: &Path,
        model: MeshModel,
        min_detection_confidence: f64,
        min_tracking_confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
            model,
            tracker: RoiTracker::new(min_detection_confidence, min_tracking_confidence, CROP_SCALE),
            seed_detector: None,
        })
    }

    /// Seeds the crop from a face detector when nothing is being tracked.
    /// Without one, untracked frames are fed whole.
    pub fn with_seed_detector(mut self, detector: SharedBoxBackend) -> Self {
        self.seed_detector = Some(detector);
        self
    }

    fn crop(&self, frame: &Frame) -> Result<Option<CropRect>, Box<dyn std::error::Error>> {
        if let Some(roi) = self.tracker.tracked() {
            return Ok(Some(roi));
        }
        match &self.seed_detector {
            Some(detector) => {
                let detection = detector.detect_and_keep(frame)?;
                Ok(self.tracker.seed(frame, detection))
            }
            None => Ok(Some(CropRect::full(frame))),
        }
    }

    fn infer(
        &mut self,
        frame: &Frame,
        crop: &CropRect,
    ) -> Result<(Vec<f32>, Option<f32>), Box<dyn std::error::Error>> {
        let input = crop_to_tensor(frame, crop, input_size(self.model));
        let outputs = self
            .session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;

        let mut values: Vec<Vec<f32>> = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            values.push(outputs[i].try_extract_array::<f32>()?.iter().copied().collect());
        }
        Ok(select_outputs(values, self.model)?)
    }
}

impl MeshBackend for OnnxFaceMeshBackend {
    fn model(&self) -> MeshModel {
        self.model
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<MeshDetection>, Box<dyn std::error::Error>> {
        if let Some(detector) = &self.seed_detector {
            detector.forget();
        }
        let Some(crop) = self.crop(frame)? else {
            return Ok(None);
        };

        let (raw, face_flag) = self.infer(frame, &crop)?;
        let face_score = face_flag.map(|f| sigmoid(f) as f64);
        let pixels = to_frame_pixels(&raw, &crop, input_size(self.model));

        if !self.tracker.update(&pixels, face_score) {
            log::debug!("Face Mesh lost track on frame {}", frame.index());
        }

        let (w, h) = (frame.width() as f64, frame.height() as f64);
        Ok(Some(MeshDetection {
            points: pixels
                .iter()
                .map(|p| MeshPoint::new(p.x / w, p.y / h))
                .collect(),
            face_score,
        }))
    }
}

/// Picks the landmark tensor (x, y, z per point, in input pixels) and the
/// first single-value output as the face-flag logit.
fn select_outputs(
    outputs: Vec<Vec<f32>>,
    model: MeshModel,
) -> Result<(Vec<f32>, Option<f32>), String> {
    let expected = model.point_count() * 3;
    let mut landmarks = None;
    let mut face_flag = None;
    for values in outputs {
        match values.len() {
            1 if face_flag.is_none() => face_flag = Some(values[0]),
            n if n == expected && landmarks.is_none() => landmarks = Some(values),
            _ => {}
        }
    }
    let landmarks =
        landmarks.ok_or_else(|| format!("{model} model has no {expected}-value landmark output"))?;
    Ok((landmarks, face_flag))
}

fn to_frame_pixels(raw: &[f32], crop: &CropRect, input_size: u32) -> Vec<Point2<f64>> {
    let size = input_size as f64;
    raw.chunks_exact(3)
        .map(|v| crop.to_frame(v[0] as f64 / size, v[1] as f64 / size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_landmarks_mapped_from_crop_to_frame() {
        let crop = CropRect {
            x: 100.0,
            y: 40.0,
            width: 96.0,
            height: 96.0,
        };
        let raw = [0.0, 0.0, 5.0, 192.0, 96.0, -3.0];
        let pixels = to_frame_pixels(&raw, &crop, 192);
        assert_eq!(pixels.len(), 2);
        assert_relative_eq!(pixels[0].x, 100.0);
        assert_relative_eq!(pixels[0].y, 40.0);
        assert_relative_eq!(pixels[1].x, 196.0);
        assert_relative_eq!(pixels[1].y, 88.0);
    }

    #[test]
    fn test_refined_landmarks_scaled_by_their_input_size() {
        let crop = CropRect {
            x: 0.0,
            y: 0.0,
            width: 512.0,
            height: 512.0,
        };
        let raw = [128.0, 256.0, 0.0];
        let size = input_size(MeshModel::FaceMeshIris478);
        let pixels = to_frame_pixels(&raw, &crop, size);
        assert_relative_eq!(pixels[0].x, 256.0);
        assert_relative_eq!(pixels[0].y, 512.0);
    }

    #[test]
    fn test_selects_478_point_tensor_and_face_flag() {
        // landmarks, face presence, second single-value head
        let outputs = vec![vec![0.5; 1434], vec![2.0], vec![-7.0]];
        let (landmarks, flag) = select_outputs(outputs, MeshModel::FaceMeshIris478).unwrap();
        assert_eq!(landmarks.len(), 1434);
        assert_eq!(flag, Some(2.0));
    }

    #[test]
    fn test_selects_468_point_tensor_regardless_of_order() {
        let outputs = vec![vec![3.0], vec![0.25; 1404]];
        let (landmarks, flag) = select_outputs(outputs, MeshModel::FaceMesh468).unwrap();
        assert_eq!(landmarks.len(), 1404);
        assert_eq!(flag, Some(3.0));
    }

    #[test]
    fn test_split_attention_outputs_are_rejected_for_478_points() {
        // mesh, lips, eyes, irises, face flag
        let outputs = vec![
            vec![0.0; 1404],
            vec![0.0; 160],
            vec![0.0; 142],
            vec![0.0; 142],
            vec![0.0; 10],
            vec![0.0; 10],
            vec![1.0],
        ];
        let err = select_outputs(outputs, MeshModel::FaceMeshIris478).unwrap_err();
        assert!(err.contains("1434"));
    }

    #[test]
    fn test_missing_face_flag_is_none() {
        let (_, flag) = select_outputs(vec![vec![0.0; 1404]], MeshModel::FaceMesh468).unwrap();
        assert!(flag.is_none());
    }
}
