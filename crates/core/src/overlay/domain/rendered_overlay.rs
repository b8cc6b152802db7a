use nalgebra::Point2;

use crate::detection::domain::landmark_set::LandmarkSource;
use crate::overlay::domain::placement::Placement;
use crate::pose::domain::pose_estimate::PoseSolution;
use crate::shared::frame::Frame;

/// Per-frame output handed to the compositing layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedOverlay {
    /// Asset anchors projected to pixel coordinates.
    pub anchors_2d: Vec<Point2<f64>>,
    /// Overlay image after lighting adaptation.
    pub image: Frame,
    pub pose: PoseSolution,
    pub placement: Option<Placement>,
    pub source_tier: LandmarkSource,
    pub confidence: f64,
}
