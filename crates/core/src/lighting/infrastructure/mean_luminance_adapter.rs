use crate::lighting::domain::lighting_adapter::LightingAdapter;
use crate::shared::frame::Frame;

use super::luminance::mean_luminance;

/// Scales every overlay channel by `frame mean / overlay mean`.
///
/// For RGBA overlays only visible pixels (alpha > 0) count towards the
/// overlay mean, and alpha is copied through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanLuminanceAdapter;

impl MeanLuminanceAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Brightness ratio, or `None` when the overlay has no brightness to scale.
    pub fn ratio(&self, frame: &Frame, overlay: &Frame) -> Option<f64> {
        let frame_mean = mean_luminance(frame, |_| true)?;
        let overlay_mean = mean_luminance(overlay, |a| a > 0)?;
        (overlay_mean > 0.0).then(|| frame_mean / overlay_mean)
    }
}

impl LightingAdapter for MeanLuminanceAdapter {
    fn adapt(&self, frame: &Frame, overlay: &Frame) -> Frame {
        let Some(ratio) = self.ratio(frame, overlay) else {
            log::debug!("Overlay has zero mean luminance; skipping lighting match");
            return overlay.clone();
        };

        let mut adjusted = overlay.clone();
        let channels = adjusted.channels() as usize;
        for pixel in adjusted.data_mut().chunks_exact_mut(channels) {
            for value in &mut pixel[..3] {
                *value = (*value as f64 * ratio).round().clamp(0.0, 255.0) as u8;
            }
        }
        adjusted
    }
}
