//! Frame-to-tensor conversion shared by the ONNX backends.

use nalgebra::Point2;

use crate::detection::domain::landmark_set::RelativeBoundingBox;
use crate::shared::frame::Frame;

/// Axis-aligned crop in frame pixels. May extend past the frame edges;
/// samples outside the frame read as black.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn full(frame: &Frame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width() as f64,
            height: frame.height() as f64,
        }
    }

    pub fn square(center: Point2<f64>, side: f64) -> Self {
        Self {
            x: center.x - side / 2.0,
            y: center.y - side / 2.0,
            width: side,
            height: side,
        }
    }

    /// Square crop around a relative box, enlarged by `scale`.
    pub fn around_box(bbox: &RelativeBoundingBox, frame: &Frame, scale: f64) -> Self {
        let (w, h) = (frame.width() as f64, frame.height() as f64);
        let center = Point2::new(
            (bbox.xmin + bbox.width / 2.0) * w,
            (bbox.ymin + bbox.height / 2.0) * h,
        );
        Self::square(center, (bbox.width * w).max(bbox.height * h) * scale)
    }

    /// Square crop around the bounds of `points`, enlarged by `scale`.
    pub fn around_points(points: &[Point2<f64>], scale: f64) -> Option<Self> {
        let first = points.first()?;
        let (lo, hi) = points.iter().fold((*first, *first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });
        let side = (hi.x - lo.x).max(hi.y - lo.y) * scale;
        (side > 0.0).then(|| Self::square(nalgebra::center(&lo, &hi), side))
    }

    /// Maps a point in crop-relative [0,1] units back to frame pixels.
    pub fn to_frame(&self, u: f64, v: f64) -> Point2<f64> {
        Point2::new(self.x + u * self.width, self.y + v * self.height)
    }
}

/// Samples `crop` into a `1×3×size×size` RGB tensor scaled to [0,1]
/// (nearest neighbour).
pub fn crop_to_tensor(frame: &Frame, crop: &CropRect, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let (fw, fh) = (frame.width() as i64, frame.height() as i64);
    let (r, g, b) = frame.color_space().rgb_offsets();
    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let sy = (crop.y + (y as f64 + 0.5) * crop.height / s as f64).floor() as i64;
        if sy < 0 || sy >= fh {
            continue;
        }
        for x in 0..s {
            let sx = (crop.x + (x as f64 + 0.5) * crop.width / s as f64).floor() as i64;
            if sx < 0 || sx >= fw {
                continue;
            }
            let (sy, sx) = (sy as usize, sx as usize);
            for (c, offset) in [r, g, b].into_iter().enumerate() {
                tensor[[0, c, y, x]] = src[[sy, sx, offset]] as f32 / 255.0;
            }
        }
    }
    tensor
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
