//! Per-frame try-on orchestration: locate → pose → project → lighting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::face_locator::{FaceLocator, StreamId};
use crate::detection::domain::landmark_index_table::{LandmarkIndexTable, FACE_MESH_V1};
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::detection::domain::landmark_strategy::LandmarkStrategy;
use crate::detection::infrastructure::onnx_cascade::{onnx_cascade, ModelPaths};
use crate::lighting::domain::lighting_adapter::LightingAdapter;
use crate::lighting::infrastructure::mean_luminance_adapter::MeanLuminanceAdapter;
use crate::overlay::domain::overlay_asset::OverlayAsset;
use crate::overlay::domain::placement::Placement;
use crate::overlay::domain::rendered_overlay::RenderedOverlay;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pose::domain::face_3d_model::Face3DModel;
use crate::pose::domain::head_pose_estimator::HeadPoseEstimator;
use crate::pose::domain::pose_error::PoseError;
use crate::pose::domain::pose_estimate::PoseEstimate;
use crate::pose::domain::pose_solver::PoseSolver;
use crate::pose::infrastructure::levenberg_marquardt_solver::LevenbergMarquardtSolver;
use crate::projection::domain::projector::{ProjectionError, Projector};
use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::config::TryOnConfig;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("face detection failed: {0}")]
    Detection(Box<dyn std::error::Error>),
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// How one frame ended. Only `Rendered` carries an overlay.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    NoFace,
    /// Only the bounding-box tier found the face; no pose can be solved
    /// from it.
    CoarseOnly(LandmarkSet),
    Rendered(RenderedOverlay),
}

impl FrameOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            FrameOutcome::NoFace => "no_face",
            FrameOutcome::CoarseOnly(_) => "coarse_only",
            FrameOutcome::Rendered(_) => "rendered",
        }
    }
}

/// Try-on pipeline for a single video stream. Owns that stream's detector
/// session; build one per stream with [`PipelineFactory`].
pub struct TryOnPipeline {
    locator: FaceLocator,
    estimator: HeadPoseEstimator,
    projector: Projector,
    lighting: Option<Arc<dyn LightingAdapter>>,
    intrinsics: Option<CameraIntrinsics>,
    logger: Box<dyn PipelineLogger>,
}

impl TryOnPipeline {
    /// `intrinsics: None` approximates them from each frame's size.
    pub fn new(
        locator: FaceLocator,
        estimator: HeadPoseEstimator,
        lighting: Option<Arc<dyn LightingAdapter>>,
        intrinsics: Option<CameraIntrinsics>,
    ) -> Self {
        Self {
            locator,
            estimator,
            projector: Projector,
            lighting,
            intrinsics,
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn stream_id(&self) -> StreamId {
        self.locator.stream_id()
    }

    pub fn summary(&self) {
        self.logger.summary();
    }

    pub fn process(
        &mut self,
        frame: &Frame,
        asset: &OverlayAsset,
    ) -> Result<FrameOutcome, PipelineError> {
        let result = self.run_stages(frame, asset);
        match &result {
            Ok(outcome) => self.logger.outcome(outcome.name()),
            Err(e) => {
                log::warn!("{}: dropping overlay for frame {}: {e}", self.stream_id(), frame.index());
                self.logger.outcome("failed");
            }
        }
        result
    }

    fn run_stages(
        &mut self,
        frame: &Frame,
        asset: &OverlayAsset,
    ) -> Result<FrameOutcome, PipelineError> {
        let frame = frame.to_rgb();

        let t = Instant::now();
        let located = self.locator.locate(&frame).map_err(PipelineError::Detection)?;
        self.logger.timing("locate", elapsed_ms(t));

        let Some(landmarks) = located else {
            log::debug!("{}: no face in frame {}", self.stream_id(), frame.index());
            return Ok(FrameOutcome::NoFace);
        };
        self.logger.metric("landmark_confidence", landmarks.confidence());
        if !landmarks.source().is_mesh() {
            return Ok(FrameOutcome::CoarseOnly(landmarks));
        }

        let intrinsics = self
            .intrinsics
            .unwrap_or_else(|| CameraIntrinsics::approximate(frame.width(), frame.height()));

        let t = Instant::now();
        let pose = self.estimator.estimate(&landmarks, &intrinsics)?;
        self.logger.timing("pose", elapsed_ms(t));
        let solution = match &pose {
            PoseEstimate::Valid(solution) => *solution,
            PoseEstimate::Failed { reason } => {
                return Err(PoseError::PoseEstimationFailed {
                    reason: reason.clone(),
                }
                .into())
            }
        };
        self.logger
            .metric("reprojection_error_px", solution.reprojection_error);

        let t = Instant::now();
        let anchors: &[_] = if asset.anchors.is_empty() {
            self.estimator.model().points()
        } else {
            &asset.anchors
        };
        let anchors_2d = self.projector.project(anchors, &pose, &intrinsics)?;
        self.logger.timing("project", elapsed_ms(t));

        let t = Instant::now();
        let image = match &self.lighting {
            Some(adapter) => adapter.adapt(&frame, &asset.image),
            None => asset.image.clone(),
        };
        self.logger.timing("lighting", elapsed_ms(t));

        let placement = Placement::compute(
            asset.kind,
            &landmarks,
            self.estimator.table(),
            frame.width(),
            frame.height(),
        );

        Ok(FrameOutcome::Rendered(RenderedOverlay {
            anchors_2d,
            image,
            pose: solution,
            placement,
            source_tier: landmarks.source(),
            confidence: landmarks.confidence(),
        }))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Builds the strategy cascade for a new detector session.
pub type SessionFactory = Box<
    dyn Fn(StreamId) -> Result<Vec<Box<dyn LandmarkStrategy>>, Box<dyn std::error::Error>>
        + Send
        + Sync,
>;

/// Builds one [`TryOnPipeline`] per stream. The head model, solver, lighting
/// adapter and intrinsics are shared read-only; every pipeline gets a fresh
/// detector session.
pub struct PipelineFactory {
    sessions: SessionFactory,
    model: Arc<Face3DModel>,
    table: LandmarkIndexTable,
    solver: Arc<dyn PoseSolver>,
    lighting: Option<Arc<dyn LightingAdapter>>,
    intrinsics: Option<CameraIntrinsics>,
    next_stream: AtomicU64,
}

impl PipelineFactory {
    pub fn new(
        sessions: SessionFactory,
        table: LandmarkIndexTable,
        solver: Arc<dyn PoseSolver>,
        lighting: Option<Arc<dyn LightingAdapter>>,
        intrinsics: Option<CameraIntrinsics>,
    ) -> Self {
        Self {
            sessions,
            model: Arc::new(Face3DModel::canonical()),
            table,
            solver,
            lighting,
            intrinsics,
            next_stream: AtomicU64::new(0),
        }
    }

    /// ONNX detector sessions, Levenberg–Marquardt solver and (unless
    /// disabled) mean-luminance lighting, all per `config`.
    pub fn onnx(config: &TryOnConfig, paths: ModelPaths) -> Self {
        let detector = config.detector.clone();
        let lighting: Option<Arc<dyn LightingAdapter>> = if config.lighting {
            Some(Arc::new(MeanLuminanceAdapter::new()))
        } else {
            None
        };
        Self::new(
            Box::new(move |_: StreamId| onnx_cascade(&paths, &detector)),
            FACE_MESH_V1,
            Arc::new(LevenbergMarquardtSolver::new(config.max_solver_iterations)),
            lighting,
            config.intrinsics,
        )
    }

    pub fn create(&self) -> Result<TryOnPipeline, Box<dyn std::error::Error>> {
        let stream_id = StreamId(self.next_stream.fetch_add(1, Ordering::Relaxed));
        let locator = FaceLocator::new(stream_id, (self.sessions)(stream_id)?);
        let estimator = HeadPoseEstimator::new(
            self.model.clone(),
            self.table,
            self.solver.clone(),
        );
        Ok(TryOnPipeline::new(
            locator,
            estimator,
            self.lighting.clone(),
            self.intrinsics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::landmark_index_table::FaceAnchor;
    use crate::detection::domain::landmark_set::{LandmarkSource, MeshModel, RelativeBoundingBox};
    use crate::overlay::domain::overlay_asset::AccessoryKind;
    use crate::pose::domain::pose_estimate::PoseSolution;
    use crate::pose::domain::pose_solver::SolverError;
    use crate::shared::frame::ColorSpace;
    use nalgebra::{Point2, Point3, Rotation3, Vector3};
    use std::f64::consts::PI;
    use std::sync::Mutex;

    struct FixedStrategy(Option<LandmarkSet>);

    impl LandmarkStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenStrategy;

    impl LandmarkStrategy for BrokenStrategy {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
            Err("model file missing".into())
        }
    }

    struct NeverConverges;

    impl PoseSolver for NeverConverges {
        fn solve(
            &self,
            _object: &[Point3<f64>],
            _image: &[Point2<f64>],
            _intrinsics: &CameraIntrinsics,
        ) -> Result<PoseSolution, SolverError> {
            Err(SolverError::NotConverged { iterations: 100 })
        }
    }

    struct ColorSpaceProbe(Arc<Mutex<Vec<ColorSpace>>>);

    impl LightingAdapter for ColorSpaceProbe {
        fn adapt(&self, frame: &Frame, overlay: &Frame) -> Frame {
            self.0.lock().unwrap().push(frame.color_space());
            overlay.clone()
        }
    }

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 480;

    fn frame() -> Frame {
        Frame::new(vec![100; (WIDTH * HEIGHT * 3) as usize], WIDTH, HEIGHT, 3, 0)
    }

    fn true_pose() -> PoseEstimate {
        PoseEstimate::valid(
            Rotation3::from_euler_angles(PI + 0.15, 0.2, 0.05).scaled_axis(),
            Vector3::new(20.0, -15.0, 1200.0),
            0.0,
        )
    }

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::approximate(WIDTH, HEIGHT)
    }

    fn synthetic_mesh() -> LandmarkSet {
        let model = Face3DModel::canonical();
        let projected = Projector
            .project(model.points(), &true_pose(), &intrinsics())
            .unwrap();
        let mut points = vec![Point2::new(320.0, 240.0); 468];
        for (anchor, p) in FaceAnchor::ALL.iter().zip(projected) {
            points[FACE_MESH_V1.index_of(*anchor)] = p;
        }
        points[33] = Point2::new(280.0, 200.0);
        points[263] = Point2::new(360.0, 200.0);
        LandmarkSet::mesh(MeshModel::FaceMesh468, points, 0.95).unwrap()
    }

    fn fallback_set() -> LandmarkSet {
        let bbox = RelativeBoundingBox {
            xmin: 0.1,
            ymin: 0.1,
            width: 0.5,
            height: 0.5,
        };
        LandmarkSet::from_bounding_box(&bbox, WIDTH, HEIGHT, 0.8)
    }

    fn asset() -> OverlayAsset {
        let image = Frame::new([100u8, 100, 100, 0, 0, 0].repeat(2), 4, 1, 3, 0);
        OverlayAsset::new("aviator", AccessoryKind::Glasses, image)
    }

    fn pipeline(
        strategies: Vec<Box<dyn LandmarkStrategy>>,
        solver: Arc<dyn PoseSolver>,
        lighting: Option<Arc<dyn LightingAdapter>>,
    ) -> TryOnPipeline {
        let estimator = HeadPoseEstimator::new(Arc::new(Face3DModel::canonical()), FACE_MESH_V1, solver);
        TryOnPipeline::new(FaceLocator::new(StreamId(0), strategies), estimator, lighting, None)
    }

    fn lm() -> Arc<dyn PoseSolver> {
        Arc::new(LevenbergMarquardtSolver::default())
    }

    #[test]
    fn test_renders_overlay_for_mesh_landmarks() {
        let mut p = pipeline(
            vec![Box::new(FixedStrategy(Some(synthetic_mesh())))],
            lm(),
            Some(Arc::new(MeanLuminanceAdapter)),
        );

        let FrameOutcome::Rendered(overlay) = p.process(&frame(), &asset()).unwrap() else {
            panic!("expected a rendered overlay");
        };

        let expected = Projector
            .project(Face3DModel::canonical().points(), &true_pose(), &intrinsics())
            .unwrap();
        for (a, b) in overlay.anchors_2d.iter().zip(&expected) {
            assert!((a - b).norm() < 1.0);
        }
        // overlay mean 50, frame mean 100
        assert_eq!(&overlay.image.data()[..3], &[200, 200, 200]);
        assert_eq!(overlay.source_tier, LandmarkSource::Mesh(MeshModel::FaceMesh468));
        assert!((overlay.confidence - 0.95).abs() < 1e-12);

        let placement = overlay.placement.unwrap();
        assert_eq!(placement.kind, AccessoryKind::Glasses);
        assert!((placement.center - Point2::new(320.0, 200.0)).norm() < 1e-9);
    }

    #[test]
    fn test_asset_anchors_are_projected_instead_of_head_model() {
        let mut p = pipeline(vec![Box::new(FixedStrategy(Some(synthetic_mesh())))], lm(), None);
        let asset = asset().with_anchors(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 100.0, 0.0)]);

        let FrameOutcome::Rendered(overlay) = p.process(&frame(), &asset).unwrap() else {
            panic!("expected a rendered overlay");
        };
        assert_eq!(overlay.anchors_2d.len(), 2);
        assert_eq!(overlay.image, asset.image);
    }

    #[test]
    fn test_no_face_is_not_an_error() {
        let mut p = pipeline(vec![Box::new(FixedStrategy(None))], lm(), None);
        for _ in 0..3 {
            assert_eq!(p.process(&frame(), &asset()).unwrap(), FrameOutcome::NoFace);
        }
    }

    #[test]
    fn test_bounding_box_fallback_is_coarse_only() {
        let mut p = pipeline(
            vec![
                Box::new(FixedStrategy(None)),
                Box::new(FixedStrategy(Some(fallback_set()))),
            ],
            lm(),
            None,
        );
        assert_eq!(
            p.process(&frame(), &asset()).unwrap(),
            FrameOutcome::CoarseOnly(fallback_set())
        );
    }

    #[test]
    fn test_pose_failure_is_surfaced() {
        let mut p = pipeline(
            vec![Box::new(FixedStrategy(Some(synthetic_mesh())))],
            Arc::new(NeverConverges),
            None,
        );
        let err = p.process(&frame(), &asset()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Pose(PoseError::PoseEstimationFailed { .. })
        ));
    }

    #[test]
    fn test_detector_failure_is_surfaced() {
        let mut p = pipeline(vec![Box::new(BrokenStrategy)], lm(), None);
        let err = p.process(&frame(), &asset()).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
        assert!(err.to_string().contains("model file missing"));
    }

    #[test]
    fn test_bgr_frames_reach_lighting_as_rgb() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut p = pipeline(
            vec![Box::new(FixedStrategy(Some(synthetic_mesh())))],
            lm(),
            Some(Arc::new(ColorSpaceProbe(seen.clone()))),
        );
        let bgr = frame().with_color_space(ColorSpace::Bgr);
        p.process(&bgr, &asset()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![ColorSpace::Rgb]);
    }

    #[test]
    fn test_factory_gives_each_stream_its_own_session() {
        let built = Arc::new(Mutex::new(Vec::new()));
        let log = built.clone();
        let factory = PipelineFactory::new(
            Box::new(move |id: StreamId| {
                log.lock().unwrap().push(id);
                Ok(vec![Box::new(FixedStrategy(None)) as Box<dyn LandmarkStrategy>])
            }),
            FACE_MESH_V1,
            lm(),
            None,
            None,
        );

        let a = factory.create().unwrap();
        let b = factory.create().unwrap();

        assert_ne!(a.stream_id(), b.stream_id());
        assert_eq!(*built.lock().unwrap(), vec![StreamId(0), StreamId(1)]);
    }

    fn no_models(
        _stream: StreamId,
    ) -> Result<Vec<Box<dyn LandmarkStrategy>>, Box<dyn std::error::Error>> {
        Err("no models".into())
    }

    #[test]
    fn test_factory_propagates_session_errors() {
        let factory = PipelineFactory::new(
            Box::new(no_models),
            FACE_MESH_V1,
            lm(),
            None,
            None,
        );
        assert!(factory.create().is_err());
    }
}
