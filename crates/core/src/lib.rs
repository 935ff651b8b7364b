pub mod detection;
pub mod imaging;
pub mod mosaic;
pub mod pipeline;
pub mod shared;
