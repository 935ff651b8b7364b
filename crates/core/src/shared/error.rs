use thiserror::Error;

/// Failures surfaced by the redaction core.
///
/// Out-of-range indices and detection failures are deliberately absent:
/// the region store ignores stale indices and the detection adapter
/// resolves failures to an empty candidate set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedactError {
    #[error("invalid raster buffer: {0}")]
    InvalidBuffer(String),
    #[error("normalized rect field `{field}` must be finite and within [0, 1], got {value}")]
    InvalidRect { field: &'static str, value: f64 },
    #[error("region {width:.4}x{height:.4} is too small (both sides must exceed {min})")]
    DegenerateRegion { width: f64, height: f64, min: f64 },
}
