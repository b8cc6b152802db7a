use crate::shared::frame::Frame;

/// Matches an overlay's brightness to the scene it will be drawn over.
///
/// Returns a new buffer; hue is left alone. An overlay that cannot be
/// scaled (e.g., pure black) is returned unchanged rather than as an error.
pub trait LightingAdapter: Send + Sync {
    fn adapt(&self, frame: &Frame, overlay: &Frame) -> Frame;
}
