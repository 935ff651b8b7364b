use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::detection::domain::text_detector::{
    BoxConvention, DetectionOptions, DetectorError, TextDetector, TextObservation,
};
use crate::shared::raster::RasterBuffer;

/// On-disk form of precomputed detection results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBoxSidecar {
    #[serde(default)]
    pub convention: BoxConvention,
    pub observations: Vec<TextObservation>,
}

/// Replays text boxes produced ahead of time by an external OCR tool.
///
/// Lets the detection pipeline run without a recognition backend linked
/// into the process: the boxes are reported in whatever convention the
/// producing tool used, and the adapter takes care of flipping them.
pub struct CachedTextDetector {
    sidecar: TextBoxSidecar,
}

impl CachedTextDetector {
    pub fn new(sidecar: TextBoxSidecar) -> Self {
        Self { sidecar }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_reader(reader)?))
    }
}

impl TextDetector for CachedTextDetector {
    fn convention(&self) -> BoxConvention {
        self.sidecar.convention
    }

    fn detect(
        &mut self,
        image: &RasterBuffer,
        _options: &DetectionOptions,
    ) -> Result<Vec<TextObservation>, DetectorError> {
        if image.is_empty() {
            return Err(DetectorError::InvalidImage(format!(
                "{}x{} image has no pixels",
                image.width(),
                image.height()
            )));
        }
        Ok(self.sidecar.observations.clone())
    }
}
