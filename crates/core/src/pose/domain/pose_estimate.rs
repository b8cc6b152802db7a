use nalgebra::{Rotation3, Vector3};

/// A converged rigid transform from model space to camera space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSolution {
    /// Rodrigues rotation vector (axis × angle, radians).
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
    /// Root-mean-square reprojection error in pixels.
    pub reprojection_error: f64,
}

impl PoseSolution {
    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rotation)
    }

    /// Head angles in degrees: pitch about x, yaw about y, roll about z.
    pub fn euler_degrees(&self) -> HeadAngles {
        let (x, y, z) = self.rotation_matrix().euler_angles();
        HeadAngles {
            pitch: x.to_degrees(),
            yaw: y.to_degrees(),
            roll: z.to_degrees(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadAngles {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Result of head-pose estimation for one frame.
///
/// A failed estimate carries no vectors at all, so it cannot be read as a
/// zero rotation/translation.
#[derive(Clone, Debug, PartialEq)]
pub enum PoseEstimate {
    Valid(PoseSolution),
    Failed { reason: String },
}

impl PoseEstimate {
    pub fn valid(rotation: Vector3<f64>, translation: Vector3<f64>, reprojection_error: f64) -> Self {
        PoseEstimate::Valid(PoseSolution {
            rotation,
            translation,
            reprojection_error,
        })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PoseEstimate::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PoseEstimate::Valid(_))
    }

    pub fn solution(&self) -> Option<&PoseSolution> {
        match self {
            PoseEstimate::Valid(s) => Some(s),
            PoseEstimate::Failed { .. } => None,
        }
    }

    pub fn rotation(&self) -> Option<&Vector3<f64>> {
        self.solution().map(|s| &s.rotation)
    }

    pub fn translation(&self) -> Option<&Vector3<f64>> {
        self.solution().map(|s| &s.translation)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            PoseEstimate::Valid(_) => None,
            PoseEstimate::Failed { reason } => Some(reason),
        }
    }
}
