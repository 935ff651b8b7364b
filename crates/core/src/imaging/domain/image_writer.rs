use std::path::Path;

use crate::shared::raster::RasterBuffer;

/// Encodes a buffer to an image file.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, image: &RasterBuffer) -> Result<(), Box<dyn std::error::Error>>;
}
