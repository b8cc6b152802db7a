use std::path::Path;

use crate::image_io::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Writes frames with the `image` crate; the format follows the extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let frame = frame.to_rgb();
        let (w, h) = (frame.width(), frame.height());
        let data = frame.data().to_vec();
        if frame.has_alpha() {
            image::RgbaImage::from_raw(w, h, data)
                .ok_or("Frame data does not match its dimensions")?
                .save(path)?;
        } else {
            image::RgbImage::from_raw(w, h, data)
                .ok_or("Frame data does not match its dimensions")?
                .save(path)?;
        }
        Ok(())
    }
}
