pub mod coordinate_mapper;
pub mod pixelation;
pub mod region;
pub mod region_store;
