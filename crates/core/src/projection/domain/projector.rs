use nalgebra::{Point2, Point3};
use thiserror::Error;

use crate::pose::domain::pose_estimate::PoseEstimate;
use crate::shared::camera_intrinsics::CameraIntrinsics;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("cannot project with an invalid pose")]
    InvalidPoseUsed,
    #[error("point {index} lies at or behind the camera")]
    PointBehindCamera { index: usize },
}

/// Pinhole projection of model-space points through a solved pose.
#[derive(Clone, Copy, Debug, Default)]
pub struct Projector;

impl Projector {
    pub fn project(
        &self,
        points: &[Point3<f64>],
        pose: &PoseEstimate,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Vec<Point2<f64>>, ProjectionError> {
        let solution = pose.solution().ok_or(ProjectionError::InvalidPoseUsed)?;
        let rotation = solution.rotation_matrix();

        points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let camera = rotation * p.coords + solution.translation;
                if camera.z <= 0.0 {
                    return Err(ProjectionError::PointBehindCamera { index });
                }
                Ok(intrinsics.project_camera_point(&camera))
            })
            .collect()
    }
}
