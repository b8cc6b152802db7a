use std::sync::Arc;

use nalgebra::Point2;

use crate::detection::domain::landmark_index_table::{FaceAnchor, LandmarkIndexTable};
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::pose::domain::face_3d_model::Face3DModel;
use crate::pose::domain::pose_error::PoseError;
use crate::pose::domain::pose_estimate::PoseEstimate;
use crate::pose::domain::pose_solver::PoseSolver;
use crate::shared::camera_intrinsics::CameraIntrinsics;

/// Solves head pose from the six canonical mesh landmarks.
pub struct HeadPoseEstimator {
    model: Arc<Face3DModel>,
    table: LandmarkIndexTable,
    solver: Arc<dyn PoseSolver>,
}

impl HeadPoseEstimator {
    pub fn new(
        model: Arc<Face3DModel>,
        table: LandmarkIndexTable,
        solver: Arc<dyn PoseSolver>,
    ) -> Self {
        Self {
            model,
            table,
            solver,
        }
    }

    pub fn model(&self) -> &Face3DModel {
        &self.model
    }

    pub fn table(&self) -> &LandmarkIndexTable {
        &self.table
    }

    /// Estimates the pose for one frame's landmarks.
    ///
    /// `Err` means the landmarks violate the index-table contract. A solver
    /// that does not converge yields `Ok(PoseEstimate::Failed)`.
    pub fn estimate(
        &self,
        landmarks: &LandmarkSet,
        intrinsics: &CameraIntrinsics,
    ) -> Result<PoseEstimate, PoseError> {
        let image = self.canonical_points(landmarks)?;

        match self.solver.solve(self.model.points(), &image, intrinsics) {
            Ok(solution) => {
                log::debug!(
                    "Pose solved, reprojection error {:.3}px",
                    solution.reprojection_error
                );
                Ok(PoseEstimate::Valid(solution))
            }
            Err(e) => {
                log::warn!("Pose solver failed: {e}");
                Ok(PoseEstimate::failed(e.to_string()))
            }
        }
    }

    fn canonical_points(&self, landmarks: &LandmarkSet) -> Result<Vec<Point2<f64>>, PoseError> {
        if !self.table.accepts(landmarks) {
            return Err(PoseError::IncompatibleLandmarks {
                found: landmarks.source(),
                table: self.table.version,
            });
        }
        FaceAnchor::ALL
            .iter()
            .map(|&anchor| {
                let index = self.table.index_of(anchor);
                landmarks
                    .point(index)
                    .copied()
                    .ok_or(PoseError::MissingLandmark { anchor, index })
            })
            .collect()
    }
}
