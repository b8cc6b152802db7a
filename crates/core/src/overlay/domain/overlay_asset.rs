use std::fmt;
use std::path::PathBuf;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessoryKind {
    Glasses,
    Earring,
    Hat,
}

impl fmt::Display for AccessoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessoryKind::Glasses => write!(f, "glasses"),
            AccessoryKind::Earring => write!(f, "earring"),
            AccessoryKind::Hat => write!(f, "hat"),
        }
    }
}

/// An accessory from the catalog: model-space anchors plus the image that
/// gets lighting-matched for each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayAsset {
    pub id: String,
    pub kind: AccessoryKind,
    /// 3D model file for renderers that draw the mesh themselves.
    pub model_path: Option<PathBuf>,
    pub color_variants: Vec<String>,
    /// Anchor points in head-model space (mm). Empty means "use the head
    /// model's own points".
    pub anchors: Vec<Point3<f64>>,
    pub image: Frame,
}

impl OverlayAsset {
    pub fn new(id: impl Into<String>, kind: AccessoryKind, image: Frame) -> Self {
        Self {
            id: id.into(),
            kind,
            model_path: None,
            color_variants: Vec::new(),
            anchors: Vec::new(),
            image,
        }
    }

    pub fn with_anchors(mut self, anchors: Vec<Point3<f64>>) -> Self {
        self.anchors = anchors;
        self
    }
}
