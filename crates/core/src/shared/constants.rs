use std::time::Duration;

/// Minimum normalized width and height for an interactively drawn region.
/// Both must be strictly greater than this value.
pub const MIN_REGION_SIZE: f64 = 0.02;

/// Block edge length in pixels for [`MosaicIntensity::Strong`].
///
/// [`MosaicIntensity::Strong`]: crate::mosaic::domain::region::MosaicIntensity::Strong
pub const STRONG_BLOCK_SIZE: u32 = 20;

/// How long a caller waits on a detection request before abandoning it.
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// IoU above which a detected candidate is considered a duplicate of an
/// existing region.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
