//! Versioned mapping from mesh landmark indices to named facial features.
//!
//! The table is the compatibility contract between the mesh model a locator
//! runs and the consumers that pick specific points out of its output. A
//! landmark set from a model the table does not list is rejected instead of
//! being read at indices that mean something else.

use std::fmt;

use crate::detection::domain::landmark_set::{LandmarkSet, LandmarkSource, MeshModel};

/// The six facial features the head model is anchored on, in solver order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceAnchor {
    NoseTip,
    Chin,
    LeftEyeOuter,
    RightEyeOuter,
    LeftMouth,
    RightMouth,
}

impl FaceAnchor {
    pub const ALL: [FaceAnchor; 6] = [
        FaceAnchor::NoseTip,
        FaceAnchor::Chin,
        FaceAnchor::LeftEyeOuter,
        FaceAnchor::RightEyeOuter,
        FaceAnchor::LeftMouth,
        FaceAnchor::RightMouth,
    ];
}

impl fmt::Display for FaceAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaceAnchor::NoseTip => "nose tip",
            FaceAnchor::Chin => "chin",
            FaceAnchor::LeftEyeOuter => "left eye outer corner",
            FaceAnchor::RightEyeOuter => "right eye outer corner",
            FaceAnchor::LeftMouth => "left mouth corner",
            FaceAnchor::RightMouth => "right mouth corner",
        };
        f.write_str(name)
    }
}

/// Mesh points used for 2D accessory placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementIndices {
    pub left_eye_corner: usize,
    pub right_eye_corner: usize,
    pub left_ear: usize,
    pub right_ear: usize,
    pub forehead: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LandmarkIndexTable {
    pub version: &'static str,
    pub models: &'static [MeshModel],
    pub nose_tip: usize,
    pub chin: usize,
    pub left_eye_outer: usize,
    pub right_eye_outer: usize,
    pub left_mouth: usize,
    pub right_mouth: usize,
    pub placement: PlacementIndices,
}

/// Face Mesh topology. The iris model appends points after index 467 and
/// keeps the first 468 unchanged, so both share one table.
pub const FACE_MESH_V1: LandmarkIndexTable = LandmarkIndexTable {
    version: "face-mesh-v1",
    models: &[MeshModel::FaceMesh468, MeshModel::FaceMeshIris478],
    nose_tip: 1,
    chin: 152,
    left_eye_outer: 226,
    right_eye_outer: 446,
    left_mouth: 57,
    right_mouth: 287,
    placement: PlacementIndices {
        left_eye_corner: 33,
        right_eye_corner: 263,
        left_ear: 234,
        right_ear: 454,
        forehead: 10,
    },
};

impl LandmarkIndexTable {
    pub fn supports(&self, model: MeshModel) -> bool {
        self.models.contains(&model)
    }

    /// Whether `landmarks` is a mesh set produced by a model this table covers.
    pub fn accepts(&self, landmarks: &LandmarkSet) -> bool {
        match landmarks.source() {
            LandmarkSource::Mesh(model) => self.supports(model),
            LandmarkSource::BoundingBoxFallback => false,
        }
    }

    pub fn index_of(&self, anchor: FaceAnchor) -> usize {
        match anchor {
            FaceAnchor::NoseTip => self.nose_tip,
            FaceAnchor::Chin => self.chin,
            FaceAnchor::LeftEyeOuter => self.left_eye_outer,
            FaceAnchor::RightEyeOuter => self.right_eye_outer,
            FaceAnchor::LeftMouth => self.left_mouth,
            FaceAnchor::RightMouth => self.right_mouth,
        }
    }

    /// Indices in [`FaceAnchor::ALL`] order.
    pub fn anchor_indices(&self) -> [usize; 6] {
        FaceAnchor::ALL.map(|a| self.index_of(a))
    }
}
