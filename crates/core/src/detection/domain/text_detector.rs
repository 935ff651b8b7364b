use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::raster::RasterBuffer;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("image rejected by text detector: {0}")]
    InvalidImage(String),
    #[error("text detection failed: {0}")]
    Backend(String),
}

/// Speed/accuracy trade-off requested from the detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecognitionLevel {
    #[default]
    Fast,
    Accurate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionOptions {
    pub level: RecognitionLevel,
    pub language_correction: bool,
}

impl Default for DetectionOptions {
    /// Plain geometric localization: fast, no language-model correction.
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Fast,
            language_correction: false,
        }
    }
}

/// Vertical convention of the normalized boxes a detector returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxConvention {
    #[default]
    TopLeft,
    BottomLeft,
}

/// A text bounding box in the detector's native normalized convention.
///
/// Values are not validated; detectors may report boxes that spill past
/// the image edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub confidence: f32,
}

/// Domain interface for an external text-localization capability.
///
/// Only box geometry is consumed; the recognized text is never needed.
pub trait TextDetector: Send {
    fn convention(&self) -> BoxConvention;

    fn detect(
        &mut self,
        image: &RasterBuffer,
        options: &DetectionOptions,
    ) -> Result<Vec<TextObservation>, DetectorError>;
}
