pub mod candidate_filter;
pub mod text_detector;
