use std::path::Path;

use crate::shared::raster::RasterBuffer;

/// Decodes an image file into a premultiplied RGBA buffer.
///
/// Implementations live outside the core; the pipeline only sees the
/// decoded [`RasterBuffer`].
pub trait ImageReader: Send {
    fn read(&mut self, path: &Path) -> Result<RasterBuffer, Box<dyn std::error::Error>>;
}
