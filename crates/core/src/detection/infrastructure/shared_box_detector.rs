use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::detection::domain::face_detector::{BoxBackend, BoxDetection};
use crate::shared::frame::Frame;

/// One box detector shared by the mesh seed and the bounding-box tier.
///
/// A box found while seeding the mesh crop is kept for the same frame
/// index and replayed to the bounding-box tier, so a frame the mesh
/// rejects does not run the detector a second time.
#[derive(Clone)]
pub struct SharedBoxBackend {
    state: Arc<Mutex<SharedState>>,
}

struct SharedState {
    inner: Box<dyn BoxBackend>,
    kept: Option<(usize, Option<BoxDetection>)>,
}

impl SharedBoxBackend {
    pub fn new(inner: Box<dyn BoxBackend>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SharedState { inner, kept: None })),
        }
    }

    /// Runs the detector and keeps its result for the rest of this frame.
    pub fn detect_and_keep(
        &self,
        frame: &Frame,
    ) -> Result<Option<BoxDetection>, Box<dyn std::error::Error>> {
        let mut state = self.lock();
        let detection = state.inner.detect(frame)?;
        state.kept = Some((frame.index(), detection));
        Ok(detection)
    }

    /// Drops whatever an earlier frame left behind.
    pub fn forget(&self) {
        self.lock().kept = None;
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BoxBackend for SharedBoxBackend {
    fn detect(&mut self, frame: &Frame) -> Result<Option<BoxDetection>, Box<dyn std::error::Error>> {
        let mut state = self.lock();
        match state.kept.take() {
            Some((index, detection)) if index == frame.index() => Ok(detection),
            _ => state.inner.detect(frame),
        }
    }
}
