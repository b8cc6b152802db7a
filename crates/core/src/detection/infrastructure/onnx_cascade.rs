//! Wires the ONNX backends into a landmark strategy cascade.

use std::path::PathBuf;

use crate::detection::domain::landmark_set::MeshModel;
use crate::detection::domain::landmark_strategy::{
    BoundingBoxStrategy, LandmarkStrategy, MeshStrategy,
};
use crate::shared::config::{DetectorConfig, ModelConfig};
use crate::shared::constants::{
    BLAZEFACE_MODEL_NAME, FACE_MESH_MODEL_NAME, FACE_MESH_REFINED_MODEL_NAME,
};

use super::model_resolver::{self, ModelResolveError, ProgressFn};
use super::onnx_blazeface_detector::OnnxBlazefaceBackend;
use super::onnx_face_mesh_detector::OnnxFaceMeshBackend;
use super::shared_box_detector::SharedBoxBackend;

/// Resolved model files for one cascade.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelPaths {
    pub face_mesh: PathBuf,
    pub mesh_model: MeshModel,
    /// `None` runs the mesh tier alone, on whole frames when untracked.
    pub blazeface: Option<PathBuf>,
}

impl ModelPaths {
    /// `progress` receives `(name, downloaded, total)` for any model that
    /// has to be fetched.
    pub fn resolve(
        detector: &DetectorConfig,
        models: &ModelConfig,
        progress: Option<fn(&str, u64, u64)>,
    ) -> Result<Self, ModelResolveError> {
        let mesh_model = MeshModel::for_refinement(detector.refine_landmarks);
        let mesh_name = match mesh_model {
            MeshModel::FaceMesh468 => FACE_MESH_MODEL_NAME,
            MeshModel::FaceMeshIris478 => FACE_MESH_REFINED_MODEL_NAME,
        };
        let face_mesh = model_resolver::resolve(
            mesh_name,
            models.face_mesh_url.as_deref(),
            models.dir.as_deref(),
            reporter(mesh_name, progress),
        )?;
        let blazeface = if models.mesh_only {
            None
        } else {
            Some(model_resolver::resolve(
                BLAZEFACE_MODEL_NAME,
                models.blazeface_url.as_deref(),
                models.dir.as_deref(),
                reporter(BLAZEFACE_MODEL_NAME, progress),
            )?)
        };
        Ok(Self {
            face_mesh,
            mesh_model,
            blazeface,
        })
    }
}

fn reporter(name: &'static str, progress: Option<fn(&str, u64, u64)>) -> Option<ProgressFn> {
    progress.map(|f| -> ProgressFn { Box::new(move |done, total| f(name, done, total)) })
}

/// Builds a fresh mesh → bounding-box cascade. Every call opens new ONNX
/// sessions, so the result can back an independent detector session.
/// Both tiers share one BlazeFace session.
pub fn onnx_cascade(
    paths: &ModelPaths,
    config: &DetectorConfig,
) -> Result<Vec<Box<dyn LandmarkStrategy>>, Box<dyn std::error::Error>> {
    let mut mesh = OnnxFaceMeshBackend::new(
        &paths.face_mesh,
        paths.mesh_model,
        config.min_detection_confidence,
        config.min_tracking_confidence,
    )?;
    let blazeface = match &paths.blazeface {
        Some(path) => Some(SharedBoxBackend::new(Box::new(OnnxBlazefaceBackend::new(path)?))),
        None => None,
    };
    if let Some(detector) = &blazeface {
        mesh = mesh.with_seed_detector(detector.clone());
    }

    let mut strategies: Vec<Box<dyn LandmarkStrategy>> = vec![Box::new(MeshStrategy::new(
        Box::new(mesh),
        config.min_detection_confidence,
    ))];
    if let Some(detector) = blazeface {
        strategies.push(Box::new(BoundingBoxStrategy::new(
            Box::new(detector),
            config.min_detection_confidence,
        )));
    }
    Ok(strategies)
}
