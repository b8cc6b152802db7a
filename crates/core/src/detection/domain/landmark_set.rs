use std::fmt;

use nalgebra::Point2;
use thiserror::Error;

/// Number of points synthesized by the bounding-box fallback.
pub const BOUNDING_BOX_POINT_COUNT: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("{model} produces {expected} landmarks, got {actual}")]
    PointCountMismatch {
        model: MeshModel,
        expected: usize,
        actual: usize,
    },
}

/// Dense landmark models whose point indexing is stable across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshModel {
    /// MediaPipe Face Mesh, 468 surface points.
    FaceMesh468,
    /// Face Mesh with refined eye/lip regions and 10 iris points appended.
    FaceMeshIris478,
}

impl MeshModel {
    pub const fn point_count(self) -> usize {
        match self {
            MeshModel::FaceMesh468 => 468,
            MeshModel::FaceMeshIris478 => 478,
        }
    }

    pub fn for_refinement(refine_landmarks: bool) -> Self {
        if refine_landmarks {
            MeshModel::FaceMeshIris478
        } else {
            MeshModel::FaceMesh468
        }
    }

    pub fn from_point_count(count: usize) -> Option<Self> {
        match count {
            468 => Some(MeshModel::FaceMesh468),
            478 => Some(MeshModel::FaceMeshIris478),
            _ => None,
        }
    }
}

impl fmt::Display for MeshModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshModel::FaceMesh468 => write!(f, "face-mesh-468"),
            MeshModel::FaceMeshIris478 => write!(f, "face-mesh-iris-478"),
        }
    }
}

/// Which detector tier produced a [`LandmarkSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandmarkSource {
    Mesh(MeshModel),
    BoundingBoxFallback,
}

impl LandmarkSource {
    pub fn is_mesh(&self) -> bool {
        matches!(self, LandmarkSource::Mesh(_))
    }
}

impl fmt::Display for LandmarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandmarkSource::Mesh(model) => write!(f, "mesh ({model})"),
            LandmarkSource::BoundingBoxFallback => write!(f, "bounding-box fallback"),
        }
    }
}

/// Face rectangle in fractions of the frame size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeBoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
}

/// Ordered 2D landmarks in pixel coordinates, tagged with their source tier.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point2<f64>>,
    source: LandmarkSource,
    confidence: f64,
}

impl LandmarkSet {
    /// Builds a mesh set, rejecting point counts that disagree with `model`.
    pub fn mesh(
        model: MeshModel,
        points: Vec<Point2<f64>>,
        confidence: f64,
    ) -> Result<Self, DetectionError> {
        if points.len() != model.point_count() {
            return Err(DetectionError::PointCountMismatch {
                model,
                expected: model.point_count(),
                actual: points.len(),
            });
        }
        Ok(Self {
            points,
            source: LandmarkSource::Mesh(model),
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    /// Synthesizes the 6 fallback points from a relative bounding box.
    ///
    /// Order: top-left, top-right, bottom-right, bottom-left, top-mid, bottom-mid.
    pub fn from_bounding_box(
        bbox: &RelativeBoundingBox,
        frame_width: u32,
        frame_height: u32,
        score: f64,
    ) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        let left = bbox.xmin * w;
        let right = (bbox.xmin + bbox.width) * w;
        let mid = (bbox.xmin + bbox.width / 2.0) * w;
        let top = bbox.ymin * h;
        let bottom = (bbox.ymin + bbox.height) * h;

        Self {
            points: vec![
                Point2::new(left, top),
                Point2::new(right, top),
                Point2::new(right, bottom),
                Point2::new(left, bottom),
                Point2::new(mid, top),
                Point2::new(mid, bottom),
            ],
            source: LandmarkSource::BoundingBoxFallback,
            confidence: score.clamp(0.0, 1.0),
        }
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&Point2<f64>> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn source(&self) -> LandmarkSource {
        self.source
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Axis-aligned bounds `(min, max)` of all points.
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = self.points.first()?;
        let init = (*first, *first);
        Some(self.points.iter().fold(init, |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}
