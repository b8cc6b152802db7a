//! Pinhole camera model with Brown–Conrady lens distortion.
//!
//! Coefficient layout and distortion formula follow the OpenCV convention
//! (`k1, k2, p1, p2, k3`), so calibrations exported from common tools can be
//! used as-is.

use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Radial (`k1`, `k2`, `k3`) and tangential (`p1`, `p2`) distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub p1: f64,
    #[serde(default)]
    pub p2: f64,
    #[serde(default)]
    pub k3: f64,
}

impl Distortion {
    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.p1 == 0.0 && self.p2 == 0.0 && self.k3 == 0.0
    }

    /// Applies distortion to a point on the normalized image plane.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        if self.is_zero() {
            return (x, y);
        }
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (xd, yd)
    }
}

/// Immutable camera intrinsics, shared read-only across frames and streams.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            distortion: Distortion::default(),
        }
    }

    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// Uncalibrated approximation: focal length equal to the frame width,
    /// principal point at the frame centre, no distortion.
    pub fn approximate(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        Self::new(w, w, w / 2.0, h / 2.0)
    }

    /// Maps a camera-space point to pixel coordinates.
    ///
    /// Performs no depth check; callers must ensure `point.z > 0`.
    pub fn project_camera_point(&self, point: &Vector3<f64>) -> Point2<f64> {
        let x = point.x / point.z;
        let y = point.y / point.z;
        let (xd, yd) = self.distortion.apply(x, y);
        Point2::new(self.fx * xd + self.cx, self.fy * yd + self.cy)
    }

    /// Maps a pixel to the normalized image plane, ignoring distortion.
    pub fn normalize_pixel(&self, pixel: &Point2<f64>) -> (f64, f64) {
        ((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }
}
