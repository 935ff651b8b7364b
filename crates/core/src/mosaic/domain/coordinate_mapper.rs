use crate::shared::normalized_rect::NormalizedRect;
use crate::shared::raster::PixelOrigin;

/// Products within this distance of an integer snap to it before flooring,
/// so `0.6 * 100 = 59.999...` lands on pixel 60.
const SNAP_EPSILON: f64 = 1e-6;

/// An axis-aligned pixel rectangle in a buffer's storage coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

/// Maps a top-left normalized rect onto a buffer's pixel grid.
///
/// For `BottomLeft` buffers the vertical axis is flipped
/// (`pixel_y = (1 - y - height) * image_height`); for `TopLeft` buffers
/// `pixel_y = y * image_height`. Either way the region covers the area the
/// user selected.
///
/// Rounding: each edge is floored independently after snapping values
/// within [`SNAP_EPSILON`] of an integer, then clamped to the image. Rects
/// sharing an edge therefore share a pixel boundary.
pub fn to_pixel_rect(
    rect: &NormalizedRect,
    image_width: u32,
    image_height: u32,
    origin: PixelOrigin,
) -> PixelRect {
    let placed = match origin {
        PixelOrigin::TopLeft => *rect,
        PixelOrigin::BottomLeft => rect.flip_vertical(),
    };
    let (x0, x1) = pixel_span(placed.x(), placed.width(), image_width);
    let (y0, y1) = pixel_span(placed.y(), placed.height(), image_height);
    PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    }
}

/// Inverse of [`to_pixel_rect`] for pixel rects inside the image.
///
/// Returns `None` when the rect has no area inside the image.
pub fn to_normalized_rect(
    rect: &PixelRect,
    image_width: u32,
    image_height: u32,
    origin: PixelOrigin,
) -> Option<NormalizedRect> {
    if image_width == 0 || image_height == 0 {
        return None;
    }
    let w = image_width as f64;
    let h = image_height as f64;
    let y = match origin {
        PixelOrigin::TopLeft => rect.y as f64 / h,
        PixelOrigin::BottomLeft => 1.0 - (rect.y as f64 + rect.height as f64) / h,
    };
    NormalizedRect::from_unclamped(
        rect.x as f64 / w,
        y,
        rect.width as f64 / w,
        rect.height as f64 / h,
    )
}

fn pixel_span(start: f64, extent: f64, size: u32) -> (u32, u32) {
    let scale = size as f64;
    let begin = snap_floor(start * scale).clamp(0.0, scale) as u32;
    let end = snap_floor((start + extent) * scale).clamp(0.0, scale) as u32;
    (begin, end.max(begin))
}

fn snap_floor(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        v.floor()
    }
}
