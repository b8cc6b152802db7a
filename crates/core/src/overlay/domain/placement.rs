//! 2D placement of an accessory on the face mesh.
//!
//! Offsets and scale factors are in normalised frame units (fractions of
//! width/height); only the resulting centre is converted to pixels.

use nalgebra::Point2;
use serde::Serialize;

use crate::detection::domain::landmark_index_table::LandmarkIndexTable;
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::overlay::domain::overlay_asset::AccessoryKind;

const GLASSES_SCALE: f64 = 6.0;
const EARRING_DROP: f64 = 0.03;
const EARRING_SCALE: f64 = 1.4;
const HAT_LIFT: f64 = 0.03;
const HAT_SCALE: f64 = 4.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub kind: AccessoryKind,
    /// Centre in pixels.
    pub center: Point2<f64>,
    pub scale: f64,
}

impl Placement {
    /// Returns `None` if the set lacks any of the placement points.
    pub fn compute(
        kind: AccessoryKind,
        landmarks: &LandmarkSet,
        table: &LandmarkIndexTable,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        let (w, h) = (frame_width as f64, frame_height as f64);
        let normalized = |index: usize| {
            landmarks
                .point(index)
                .map(|p| Point2::new(p.x / w, p.y / h))
        };
        let idx = &table.placement;

        let (center, scale) = match kind {
            AccessoryKind::Glasses => {
                let l = normalized(idx.left_eye_corner)?;
                let r = normalized(idx.right_eye_corner)?;
                (nalgebra::center(&l, &r), (r - l).norm() * GLASSES_SCALE)
            }
            AccessoryKind::Earring => {
                let ear = normalized(idx.left_ear)?;
                (Point2::new(ear.x, ear.y + EARRING_DROP), EARRING_SCALE)
            }
            AccessoryKind::Hat => {
                let l = normalized(idx.left_ear)?;
                let r = normalized(idx.right_ear)?;
                let forehead = normalized(idx.forehead)?;
                (
                    Point2::new((l.x + r.x) / 2.0, forehead.y - HAT_LIFT),
                    (r - l).norm() * HAT_SCALE,
                )
            }
        };

        Some(Self {
            kind,
            center: Point2::new(center.x * w, center.y * h),
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::landmark_index_table::FACE_MESH_V1;
    use crate::detection::domain::landmark_set::MeshModel;
    use approx::assert_relative_eq;

    fn landmarks(set: &[(usize, f64, f64)]) -> LandmarkSet {
        let mut points = vec![Point2::new(0.0, 0.0); 468];
        for &(i, x, y) in set {
            points[i] = Point2::new(x, y);
        }
        LandmarkSet::mesh(MeshModel::FaceMesh468, points, 1.0).unwrap()
    }

    #[test]
    fn test_glasses_centered_between_eye_corners() {
        let set = landmarks(&[(33, 80.0, 100.0), (263, 120.0, 100.0)]);
        let p = Placement::compute(AccessoryKind::Glasses, &set, &FACE_MESH_V1, 200, 200).unwrap();
        assert_relative_eq!(p.center.x, 100.0);
        assert_relative_eq!(p.center.y, 100.0);
        assert_relative_eq!(p.scale, 0.2 * 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_earring_hangs_below_ear() {
        let set = landmarks(&[(234, 50.0, 100.0)]);
        let p = Placement::compute(AccessoryKind::Earring, &set, &FACE_MESH_V1, 200, 200).unwrap();
        assert_relative_eq!(p.center.x, 50.0);
        assert_relative_eq!(p.center.y, 106.0, epsilon = 1e-9);
        assert_relative_eq!(p.scale, 1.4);
    }

    #[test]
    fn test_hat_sits_above_forehead() {
        let set = landmarks(&[(234, 40.0, 100.0), (454, 160.0, 100.0), (10, 100.0, 60.0)]);
        let p = Placement::compute(AccessoryKind::Hat, &set, &FACE_MESH_V1, 200, 100).unwrap();
        assert_relative_eq!(p.center.x, 100.0);
        assert_relative_eq!(p.center.y, 57.0, epsilon = 1e-9);
        assert_relative_eq!(p.scale, 0.6 * 4.5, epsilon = 1e-12);
    }
}
