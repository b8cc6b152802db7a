use std::borrow::Cow;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

/// Channel ordering of the colour channels in a [`Frame`].
///
/// The pipeline works in RGB; BGR sources are converted once at ingress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Bgr,
}

impl ColorSpace {
    /// Byte offsets of the red, green and blue channels within one pixel.
    pub fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            ColorSpace::Rgb => (0, 1, 2),
            ColorSpace::Bgr => (2, 1, 0),
        }
    }
}

/// A single video/image frame: contiguous 8-bit pixels in row-major order.
///
/// `channels` is 3 (colour only) or 4 (colour followed by alpha). The
/// colour ordering is declared by `color_space`.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    color_space: ColorSpace,
    index: usize,
}

impl Frame {
    /// Creates an RGB(A) frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        debug_assert!(
            channels == 3 || channels == 4,
            "frames carry 3 colour channels and an optional alpha channel"
        );
        Self {
            data,
            width,
            height,
            channels,
            color_space: ColorSpace::Rgb,
            index,
        }
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Iterates pixels as `(r, g, b, alpha)`, honouring the declared colour space.
    ///
    /// Frames without an alpha channel report every pixel as opaque.
    pub fn rgba_pixels(&self) -> impl Iterator<Item = (u8, u8, u8, u8)> + '_ {
        let (ri, gi, bi) = self.color_space.rgb_offsets();
        let has_alpha = self.has_alpha();
        self.data
            .chunks_exact(self.channels as usize)
            .map(move |px| (px[ri], px[gi], px[bi], if has_alpha { px[3] } else { 255 }))
    }

    /// Returns this frame in RGB channel order, borrowing when no swap is needed.
    pub fn to_rgb(&self) -> Cow<'_, Frame> {
        match self.color_space {
            ColorSpace::Rgb => Cow::Borrowed(self),
            ColorSpace::Bgr => {
                let mut data = self.data.clone();
                for px in data.chunks_exact_mut(self.channels as usize) {
                    px.swap(0, 2);
                }
                Cow::Owned(Frame {
                    data,
                    width: self.width,
                    height: self.height,
                    channels: self.channels,
                    color_space: ColorSpace::Rgb,
                    index: self.index,
                })
            }
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.color_space(), ColorSpace::Rgb);
        assert!(!frame.has_alpha());
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_indexes_row_column_channel() {
        let data: Vec<u8> = (0..16).collect();
        let frame = Frame::new(data, 2, 2, 4, 0);
        assert_eq!(frame.as_ndarray()[[0, 1, 3]], 7);
        assert_eq!(frame.as_ndarray()[[1, 0, 0]], 8);
    }

    #[test]
    fn test_to_rgb_borrows_rgb_frames() {
        let frame = Frame::new(vec![1, 2, 3], 1, 1, 3, 0);
        assert!(matches!(frame.to_rgb(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_to_rgb_swaps_bgr_and_keeps_alpha() {
        let frame = Frame::new(vec![10, 20, 30, 40], 1, 1, 4, 7).with_color_space(ColorSpace::Bgr);
        let rgb = frame.to_rgb();
        assert_eq!(rgb.data(), &[30, 20, 10, 40]);
        assert_eq!(rgb.color_space(), ColorSpace::Rgb);
        assert_eq!(rgb.index(), 7);
    }

    #[test]
    fn test_rgba_pixels_respects_color_space() {
        let bgr = Frame::new(vec![10, 20, 30], 1, 1, 3, 0).with_color_space(ColorSpace::Bgr);
        assert_eq!(bgr.rgba_pixels().next(), Some((30, 20, 10, 255)));

        let rgba = Frame::new(vec![10, 20, 30, 0], 1, 1, 4, 0);
        assert_eq!(rgba.rgba_pixels().next(), Some((10, 20, 30, 0)));
    }
}
