use nalgebra::Point3;

use crate::detection::domain::landmark_index_table::FaceAnchor;

/// Canonical head model: six facial features in millimetres.
///
/// Origin at the nose tip, +y towards the forehead, +z out of the face.
#[derive(Clone, Debug, PartialEq)]
pub struct Face3DModel {
    points: [Point3<f64>; 6],
}

impl Face3DModel {
    pub fn canonical() -> Self {
        Self {
            points: [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, -330.0, -65.0),
                Point3::new(-225.0, 170.0, -135.0),
                Point3::new(225.0, 170.0, -135.0),
                Point3::new(-150.0, -150.0, -125.0),
                Point3::new(150.0, -150.0, -125.0),
            ],
        }
    }

    /// Points in [`FaceAnchor::ALL`] order.
    pub fn points(&self) -> &[Point3<f64>; 6] {
        &self.points
    }

    pub fn point(&self, anchor: FaceAnchor) -> Point3<f64> {
        let i = match anchor {
            FaceAnchor::NoseTip => 0,
            FaceAnchor::Chin => 1,
            FaceAnchor::LeftEyeOuter => 2,
            FaceAnchor::RightEyeOuter => 3,
            FaceAnchor::LeftMouth => 4,
            FaceAnchor::RightMouth => 5,
        };
        self.points[i]
    }
}

impl Default for Face3DModel {
    fn default() -> Self {
        Self::canonical()
    }
}
