use thiserror::Error;

use crate::detection::domain::landmark_index_table::FaceAnchor;
use crate::detection::domain::landmark_set::LandmarkSource;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    /// Landmarks from a tier or model the index table does not cover.
    #[error("{found} landmarks are not covered by index table {table}")]
    IncompatibleLandmarks {
        found: LandmarkSource,
        table: &'static str,
    },
    #[error("landmark set has no point {index} for the {anchor}")]
    MissingLandmark { anchor: FaceAnchor, index: usize },
    #[error("head pose estimation failed: {reason}")]
    PoseEstimationFailed { reason: String },
}
