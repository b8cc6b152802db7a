//! BlazeFace short-range detector as the coarse bounding-box backend.

use std::path::Path;

use crate::detection::domain::face_detector::{BoxBackend, BoxDetection};
use crate::detection::domain::landmark_set::RelativeBoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::open_session;
use super::preprocess::{crop_to_tensor, sigmoid, CropRect};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

/// Returns the single highest-scoring face box per frame.
pub struct OnnxBlazefaceBackend {
    session: ort::session::Session,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceBackend {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
            anchors: generate_anchors(),
        })
    }
}

impl BoxBackend for OnnxBlazefaceBackend {
    fn detect(&mut self, frame: &Frame) -> Result<Option<BoxDetection>, Box<dyn std::error::Error>> {
        let input = crop_to_tensor(frame, &CropRect::full(frame), INPUT_SIZE);
        let outputs = self
            .session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;

        // regressors [1, 896, 16], classificators [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let scores: Vec<f32> = outputs[1].try_extract_array::<f32>()?.iter().copied().collect();

        Ok(best_box(&self.anchors, &regressors, &scores))
    }
}

fn best_box(anchors: &[[f32; 2]], regressors: &[f32], scores: &[f32]) -> Option<BoxDetection> {
    let (i, raw) = scores
        .iter()
        .take(anchors.len())
        .enumerate()
        .filter(|(i, _)| (i + 1) * REGRESSOR_STRIDE <= regressors.len())
        .max_by(|a, b| a.1.total_cmp(b.1))?;

    let reg = &regressors[i * REGRESSOR_STRIDE..];
    let size = INPUT_SIZE as f32;
    let cx = anchors[i][0] + reg[0] / size;
    let cy = anchors[i][1] + reg[1] / size;
    let w = reg[2] / size;
    let h = reg[3] / size;

    let x1 = (cx - w / 2.0).clamp(0.0, 1.0) as f64;
    let y1 = (cy - h / 2.0).clamp(0.0, 1.0) as f64;
    let x2 = (cx + w / 2.0).clamp(0.0, 1.0) as f64;
    let y2 = (cy + h / 2.0).clamp(0.0, 1.0) as f64;

    Some(BoxDetection {
        bbox: RelativeBoundingBox {
            xmin: x1,
            ymin: y1,
            width: x2 - x1,
            height: y2 - y1,
        },
        score: sigmoid(*raw) as f64,
    })
}

/// Anchor centres for the short-range model: a 16×16 grid with 2 anchors
/// per cell, then an 8×8 grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                anchors.extend((0..num).map(|_| [cx, cy]));
            }
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_anchors_count() {
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_best_box_picks_highest_score() {
        let anchors = vec![[0.25, 0.25], [0.5, 0.5]];
        let mut regressors = vec![0.0; 2 * REGRESSOR_STRIDE];
        regressors[REGRESSOR_STRIDE + 2] = 64.0;
        regressors[REGRESSOR_STRIDE + 3] = 32.0;
        let scores = vec![1.0, 3.0];

        let det = best_box(&anchors, &regressors, &scores).unwrap();
        assert_relative_eq!(det.bbox.xmin, 0.25);
        assert_relative_eq!(det.bbox.ymin, 0.375);
        assert_relative_eq!(det.bbox.width, 0.5);
        assert_relative_eq!(det.bbox.height, 0.25);
        assert_relative_eq!(det.score, sigmoid(3.0) as f64, epsilon = 1e-6);
    }

    #[test]
    fn test_best_box_clamps_to_frame() {
        let anchors = vec![[0.05, 0.95]];
        let mut regressors = vec![0.0; REGRESSOR_STRIDE];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let det = best_box(&anchors, &regressors, &[0.0]).unwrap();
        assert_relative_eq!(det.bbox.xmin, 0.0);
        assert_relative_eq!(det.bbox.ymin + det.bbox.height, 1.0);
    }

    #[test]
    fn test_best_box_empty_output() {
        assert!(best_box(&generate_anchors(), &[], &[]).is_none());
    }
}
