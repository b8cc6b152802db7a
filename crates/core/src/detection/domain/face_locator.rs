use std::fmt;

use crate::detection::domain::landmark_set::LandmarkSet;
use crate::detection::domain::landmark_strategy::LandmarkStrategy;
use crate::shared::frame::Frame;

/// Identifies the video stream a detector session belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Detector session for one video stream: an ordered cascade of landmark
/// strategies, first success wins.
///
/// Strategies may keep tracking state between frames, so a locator is
/// owned by exactly one stream. It is `Send` but neither `Clone` nor
/// `Sync`; concurrent streams each build their own.
pub struct FaceLocator {
    stream_id: StreamId,
    strategies: Vec<Box<dyn LandmarkStrategy>>,
    frames_seen: usize,
}

impl FaceLocator {
    pub fn new(stream_id: StreamId, strategies: Vec<Box<dyn LandmarkStrategy>>) -> Self {
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        log::info!("Detector session opened for {stream_id} ({})", names.join(" -> "));
        Self {
            stream_id,
            strategies,
            frames_seen: 0,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    /// Runs the cascade on one frame.
    ///
    /// A failing tier is logged and skipped. An error is returned only when
    /// every tier failed; "no face" is `Ok(None)`.
    pub fn locate(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
        self.frames_seen += 1;
        let mut last_error = None;
        let mut any_succeeded = false;

        for strategy in &mut self.strategies {
            match strategy.detect(frame) {
                Ok(Some(landmarks)) => {
                    log::debug!(
                        "{}: frame {} located by {} ({} points, confidence {:.2})",
                        self.stream_id,
                        frame.index(),
                        strategy.name(),
                        landmarks.len(),
                        landmarks.confidence()
                    );
                    return Ok(Some(landmarks));
                }
                Ok(None) => any_succeeded = true,
                Err(e) => {
                    log::warn!(
                        "{}: {} failed on frame {}: {e}",
                        self.stream_id,
                        strategy.name(),
                        frame.index()
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_succeeded => Err(e),
            _ => Ok(None),
        }
    }
}

impl Drop for FaceLocator {
    fn drop(&mut self) {
        log::info!(
            "Detector session closed for {} after {} frames",
            self.stream_id,
            self.frames_seen
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{BoxBackend, BoxDetection};
    use crate::detection::domain::landmark_set::{
        LandmarkSource, MeshModel, RelativeBoundingBox,
    };
    use crate::detection::domain::landmark_strategy::BoundingBoxStrategy;
    use nalgebra::Point2;
    use std::sync::{Arc, Mutex};

    enum Reply {
        Found(LandmarkSet),
        Nothing,
        Fail,
    }

    struct ScriptedStrategy {
        name: &'static str,
        reply: Reply,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl LandmarkStrategy for ScriptedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push(self.name);
            match &self.reply {
                Reply::Found(set) => Ok(Some(set.clone())),
                Reply::Nothing => Ok(None),
                Reply::Fail => Err("backend unavailable".into()),
            }
        }
    }

    fn scripted(
        name: &'static str,
        reply: Reply,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn LandmarkStrategy> {
        Box::new(ScriptedStrategy {
            name,
            reply,
            calls: calls.clone(),
        })
    }

    fn mesh_set() -> LandmarkSet {
        LandmarkSet::mesh(MeshModel::FaceMesh468, vec![Point2::new(1.0, 1.0); 468], 0.9).unwrap()
    }

    fn fallback_set() -> LandmarkSet {
        let bbox = RelativeBoundingBox {
            xmin: 0.1,
            ymin: 0.1,
            width: 0.5,
            height: 0.5,
        };
        LandmarkSet::from_bounding_box(&bbox, 100, 100, 0.7)
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, 0)
    }

    #[test]
    fn test_mesh_tier_wins_and_fallback_not_called() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Found(mesh_set()), &calls),
                scripted("bbox", Reply::Found(fallback_set()), &calls),
            ],
        );

        let set = locator.locate(&frame()).unwrap().unwrap();

        assert_eq!(set.source(), LandmarkSource::Mesh(MeshModel::FaceMesh468));
        assert_eq!(*calls.lock().unwrap(), vec!["mesh"]);
    }

    #[test]
    fn test_fallback_used_when_mesh_finds_nothing() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Nothing, &calls),
                scripted("bbox", Reply::Found(fallback_set()), &calls),
            ],
        );

        let set = locator.locate(&frame()).unwrap().unwrap();

        assert_eq!(set.source(), LandmarkSource::BoundingBoxFallback);
        assert_eq!(set.len(), 6);
        assert_eq!(*calls.lock().unwrap(), vec!["mesh", "bbox"]);
    }

    #[test]
    fn test_fallback_used_when_mesh_errors() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Fail, &calls),
                scripted("bbox", Reply::Found(fallback_set()), &calls),
            ],
        );
        let set = locator.locate(&frame()).unwrap().unwrap();
        assert_eq!(set.source(), LandmarkSource::BoundingBoxFallback);
    }

    #[test]
    fn test_no_face_is_idempotent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Nothing, &calls),
                scripted("bbox", Reply::Nothing, &calls),
            ],
        );
        let f = frame();
        for _ in 0..3 {
            assert!(locator.locate(&f).unwrap().is_none());
        }
        assert_eq!(locator.frames_seen(), 3);
    }

    #[test]
    fn test_error_only_when_every_tier_fails() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Fail, &calls),
                scripted("bbox", Reply::Fail, &calls),
            ],
        );
        assert!(locator.locate(&frame()).is_err());
    }

    #[test]
    fn test_error_and_miss_is_no_face() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut locator = FaceLocator::new(
            StreamId(1),
            vec![
                scripted("mesh", Reply::Fail, &calls),
                scripted("bbox", Reply::Nothing, &calls),
            ],
        );
        assert!(locator.locate(&frame()).unwrap().is_none());
    }

    #[test]
    fn test_empty_cascade_finds_nothing() {
        let mut locator = FaceLocator::new(StreamId(9), vec![]);
        assert!(locator.locate(&frame()).unwrap().is_none());
    }

    struct NoBox;

    impl BoxBackend for NoBox {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<BoxDetection>, Box<dyn std::error::Error>> {
            Ok(None)
        }
    }

    #[test]
    fn test_real_strategies_report_no_face() {
        let mut locator = FaceLocator::new(
            StreamId(2),
            vec![Box::new(BoundingBoxStrategy::new(Box::new(NoBox), 0.5))],
        );
        assert!(locator.locate(&frame()).unwrap().is_none());
        assert_eq!(locator.stream_id(), StreamId(2));
    }

    #[test]
    fn test_stream_id_display() {
        assert_eq!(StreamId(4).to_string(), "stream-4");
    }
}
