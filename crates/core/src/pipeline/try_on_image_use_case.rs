use std::path::Path;

use crate::image_io::domain::image_reader::ImageReader;
use crate::image_io::domain::image_writer::ImageWriter;
use crate::overlay::domain::overlay_asset::OverlayAsset;
use crate::pipeline::try_on_pipeline::{FrameOutcome, TryOnPipeline};

/// Single-image try-on: read → pipeline → write the adjusted overlay.
pub struct TryOnImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    pipeline: TryOnPipeline,
}

impl TryOnImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        pipeline: TryOnPipeline,
    ) -> Self {
        Self {
            reader,
            writer,
            pipeline,
        }
    }

    /// Runs one image through the pipeline. The lighting-matched overlay is
    /// written to `output_path` only when an overlay was rendered.
    pub fn execute(
        &mut self,
        input_path: &Path,
        asset: &OverlayAsset,
        output_path: Option<&Path>,
    ) -> Result<FrameOutcome, Box<dyn std::error::Error>> {
        let frame = self.reader.read(input_path)?;
        let outcome = self.pipeline.process(&frame, asset)?;

        if let (FrameOutcome::Rendered(overlay), Some(path)) = (&outcome, output_path) {
            self.writer.write(path, &overlay.image)?;
            log::info!("Wrote adjusted overlay to {}", path.display());
        }
        self.pipeline.summary();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_locator::{FaceLocator, StreamId};
    use crate::detection::domain::landmark_index_table::{FaceAnchor, FACE_MESH_V1};
    use crate::detection::domain::landmark_set::{LandmarkSet, MeshModel};
    use crate::detection::domain::landmark_strategy::LandmarkStrategy;
    use crate::lighting::infrastructure::mean_luminance_adapter::MeanLuminanceAdapter;
    use crate::overlay::domain::overlay_asset::AccessoryKind;
    use crate::pose::domain::face_3d_model::Face3DModel;
    use crate::pose::domain::head_pose_estimator::HeadPoseEstimator;
    use crate::pose::domain::pose_estimate::PoseEstimate;
    use crate::pose::infrastructure::levenberg_marquardt_solver::LevenbergMarquardtSolver;
    use crate::projection::domain::projector::Projector;
    use crate::shared::camera_intrinsics::CameraIntrinsics;
    use crate::shared::frame::Frame;
    use nalgebra::{Point2, Rotation3, Vector3};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader(Frame);

    impl ImageReader for StubReader {
        fn read(&self, _path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingReader;

    impl ImageReader for FailingReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            Err(format!("cannot decode {}", path.display()).into())
        }
    }

    #[derive(Clone, Default)]
    struct StubWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for StubWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

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

    // --- Helpers ---

    fn face_frame() -> Frame {
        Frame::new(vec![120; 640 * 480 * 3], 640, 480, 3, 0)
    }

    fn face_landmarks() -> LandmarkSet {
        let k = CameraIntrinsics::approximate(640, 480);
        let pose = PoseEstimate::valid(
            Rotation3::from_euler_angles(std::f64::consts::PI, 0.1, 0.0).scaled_axis(),
            Vector3::new(0.0, 0.0, 1000.0),
            0.0,
        );
        let projected = Projector
            .project(Face3DModel::canonical().points(), &pose, &k)
            .unwrap();
        let mut points = vec![Point2::new(320.0, 240.0); 478];
        for (anchor, p) in FaceAnchor::ALL.iter().zip(projected) {
            points[FACE_MESH_V1.index_of(*anchor)] = p;
        }
        LandmarkSet::mesh(MeshModel::FaceMeshIris478, points, 1.0).unwrap()
    }

    fn pipeline(landmarks: Option<LandmarkSet>) -> TryOnPipeline {
        TryOnPipeline::new(
            FaceLocator::new(StreamId(0), vec![Box::new(FixedStrategy(landmarks))]),
            HeadPoseEstimator::new(
                Arc::new(Face3DModel::canonical()),
                FACE_MESH_V1,
                Arc::new(LevenbergMarquardtSolver::default()),
            ),
            Some(Arc::new(MeanLuminanceAdapter::new())),
            None,
        )
    }

    fn asset() -> OverlayAsset {
        OverlayAsset::new(
            "round",
            AccessoryKind::Glasses,
            Frame::new(vec![60; 2 * 2 * 3], 2, 2, 3, 0),
        )
    }

    // --- Tests ---

    #[test]
    fn test_writes_adjusted_overlay_when_rendered() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let mut uc = TryOnImageUseCase::new(
            Box::new(StubReader(face_frame())),
            Box::new(writer),
            pipeline(Some(face_landmarks())),
        );

        let outcome = uc
            .execute(Path::new("in.png"), &asset(), Some(Path::new("out.png")))
            .unwrap();

        assert!(matches!(outcome, FrameOutcome::Rendered(_)));
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out.png"));
        assert!(written[0].1.data().iter().all(|&v| v == 120));
    }

    #[test]
    fn test_no_face_writes_nothing() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let mut uc = TryOnImageUseCase::new(
            Box::new(StubReader(face_frame())),
            Box::new(writer),
            pipeline(None),
        );

        let outcome = uc
            .execute(Path::new("in.png"), &asset(), Some(Path::new("out.png")))
            .unwrap();

        assert_eq!(outcome, FrameOutcome::NoFace);
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_without_output_path_only_reports() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let mut uc = TryOnImageUseCase::new(
            Box::new(StubReader(face_frame())),
            Box::new(writer),
            pipeline(Some(face_landmarks())),
        );
        let outcome = uc.execute(Path::new("in.png"), &asset(), None).unwrap();
        assert!(matches!(outcome, FrameOutcome::Rendered(_)));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reader_error_propagates() {
        let mut uc = TryOnImageUseCase::new(
            Box::new(FailingReader),
            Box::new(StubWriter::default()),
            pipeline(None),
        );
        let err = uc
            .execute(Path::new("broken.png"), &asset(), None)
            .unwrap_err();
        assert!(err.to_string().contains("broken.png"));
    }
}
