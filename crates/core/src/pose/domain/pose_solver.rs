use nalgebra::{Point2, Point3};
use thiserror::Error;

use crate::pose::domain::pose_estimate::PoseSolution;
use crate::shared::camera_intrinsics::CameraIntrinsics;

/// Why a Perspective-n-Point solve produced no pose.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("need at least 4 correspondences, got {0}")]
    TooFewPoints(usize),
    #[error("{object} model points but {image} image points")]
    CorrespondenceMismatch { object: usize, image: usize },
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("non-finite value encountered")]
    NonFinite,
    #[error("model point {index} lies at or behind the camera")]
    BehindCamera { index: usize },
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Recovers the rigid transform mapping `object` points onto their
/// observed `image` projections.
///
/// Implementations must be deterministic and free of interior state so a
/// solver can be shared across pipelines.
pub trait PoseSolver: Send + Sync {
    fn solve(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<PoseSolution, SolverError>;
}
