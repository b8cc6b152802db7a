use std::path::Path;

use image::DynamicImage;

use crate::image_io::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Reads image files with the `image` crate. Images with an alpha channel
/// decode to RGBA, everything else to RGB.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        Ok(frame_from_image(image::open(path)?))
    }
}

pub fn frame_from_image(img: DynamicImage) -> Frame {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        Frame::new(rgba.into_raw(), w, h, 4, 0)
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        Frame::new(rgb.into_raw(), w, h, 3, 0)
    }
}
