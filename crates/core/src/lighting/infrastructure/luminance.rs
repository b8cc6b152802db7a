//! Grayscale reduction with BT.601 weights in 14-bit fixed point.

use crate::shared::frame::Frame;

const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

pub fn gray(r: u8, g: u8, b: u8) -> u8 {
    let y = (r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + (1 << (SHIFT - 1)))
        >> SHIFT;
    y as u8
}

/// Mean gray level over the pixels `include` accepts, or `None` if it
/// accepts none. Channel order comes from the frame's colour space.
pub fn mean_luminance(frame: &Frame, include: impl Fn(u8) -> bool) -> Option<f64> {
    let (sum, count) = frame
        .rgba_pixels()
        .filter(|&(_, _, _, a)| include(a))
        .fold((0u64, 0u64), |(sum, count), (r, g, b, _)| {
            (sum + gray(r, g, b) as u64, count + 1)
        });
    (count > 0).then(|| sum as f64 / count as f64)
}
