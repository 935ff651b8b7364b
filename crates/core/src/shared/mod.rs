pub mod constants;
pub mod error;
pub mod normalized_rect;
pub mod raster;
