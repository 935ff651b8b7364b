pub mod cached_text_detector;
pub mod detection_adapter;
