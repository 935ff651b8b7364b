use ndarray::{s, ArrayView3};

use crate::mosaic::domain::coordinate_mapper::{to_pixel_rect, PixelRect};
use crate::mosaic::domain::region::Region;
use crate::shared::error::RedactError;
use crate::shared::raster::RasterBuffer;

/// Derives a pixelated copy of `source` for every active region.
///
/// Regions are applied in order and compound where they overlap: a later
/// region averages pixels an earlier one already flattened. Re-running this
/// on its own output degrades the image further, so callers should always
/// pass the untouched original.
pub fn apply_mosaic(source: &RasterBuffer, regions: &[Region]) -> Result<RasterBuffer, RedactError> {
    if source.is_empty() {
        return Err(RedactError::InvalidBuffer(format!(
            "source image has no pixel data ({}x{})",
            source.width(),
            source.height()
        )));
    }

    let mut output = source.clone();
    for region in regions.iter().filter(|r| r.active) {
        let rect = to_pixel_rect(&region.rect, output.width(), output.height(), output.origin());
        pixelate_rect(&mut output, rect, region.block_size());
    }
    Ok(output)
}

/// Replaces each `block_size` square inside `rect` with its mean color.
///
/// The last row and column of blocks are clipped to the rect. `rect` is
/// clipped to the buffer; empty rects and a zero block size are no-ops.
pub fn pixelate_rect(buffer: &mut RasterBuffer, rect: PixelRect, block_size: u32) {
    let x_end = rect.right().min(buffer.width()) as usize;
    let y_end = rect.bottom().min(buffer.height()) as usize;
    let x_start = rect.x as usize;
    let y_start = rect.y as usize;
    if block_size == 0 || x_start >= x_end || y_start >= y_end {
        return;
    }

    let step = block_size as usize;
    let mut pixels = buffer.as_ndarray_mut();
    for by in (y_start..y_end).step_by(step) {
        let block_y_end = (by + step).min(y_end);
        for bx in (x_start..x_end).step_by(step) {
            let block_x_end = (bx + step).min(x_end);
            let mut block = pixels.slice_mut(s![by..block_y_end, bx..block_x_end, ..]);
            if let Some(color) = block_average(block.view()) {
                for ((_, _, c), v) in block.indexed_iter_mut() {
                    *v = color[c];
                }
            }
        }
    }
}

/// Per-channel mean of a `(rows, cols, 4)` block, rounded half up.
///
/// Premultiplied samples are averaged as-is. Returns `None` for a block
/// with no pixels.
pub fn block_average(block: ArrayView3<'_, u8>) -> Option<[u8; 4]> {
    let count = (block.shape()[0] * block.shape()[1]) as u64;
    if count == 0 {
        return None;
    }
    let mut sums = [0u64; 4];
    for ((_, _, c), &v) in block.indexed_iter() {
        sums[c] += v as u64;
    }
    Some(sums.map(|sum| ((sum + count / 2) / count) as u8))
}
