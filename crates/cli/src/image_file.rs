use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use redact_core::imaging::domain::image_reader::ImageReader;
use redact_core::imaging::domain::image_writer::ImageWriter;
use redact_core::shared::raster::RasterBuffer;

/// Decodes an image file into a premultiplied RGBA raster using the
/// `image` crate.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&mut self, path: &Path) -> Result<RasterBuffer, Box<dyn std::error::Error>> {
        let img = image::open(path)
            .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        log::info!("Loaded {} ({width}x{height})", path.display());
        Ok(RasterBuffer::from_straight_rgba(img.into_raw(), width, height)?)
    }
}

/// Encodes a raster to an image file, picking the format from the
/// extension. Formats without alpha get the RGB channels only.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &RasterBuffer) -> Result<(), Box<dyn std::error::Error>> {
        let format = ImageFormat::from_path(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let rgba = RgbaImage::from_raw(image.width(), image.height(), image.to_straight_rgba())
            .ok_or("Failed to create image from raster data")?;
        let img = DynamicImage::ImageRgba8(rgba);

        if matches!(format, ImageFormat::Jpeg | ImageFormat::Bmp) {
            DynamicImage::ImageRgb8(img.to_rgb8()).save_with_format(path, format)?;
        } else {
            img.save_with_format(path, format)?;
        }
        Ok(())
    }
}
