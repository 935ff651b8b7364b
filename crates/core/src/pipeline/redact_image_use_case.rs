use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::candidate_filter::{CandidateFilter, KeepAllFilter};
use crate::detection::domain::text_detector::TextDetector;
use crate::detection::infrastructure::detection_adapter::DetectionAdapter;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::mosaic::domain::coordinate_mapper::{to_normalized_rect, PixelRect};
use crate::mosaic::domain::region::{MosaicIntensity, Region};
use crate::pipeline::editor_session::EditorSession;
use crate::shared::constants::DEFAULT_DETECTION_TIMEOUT;
use crate::shared::raster::PixelOrigin;

/// What to apply to one image.
#[derive(Clone, Debug, Default)]
pub struct RedactRequest {
    /// Regions added before detection, in order.
    pub regions: Vec<Region>,
    /// Top-left pixel rects, converted once the image size is known and
    /// added at the configured intensity after `regions`.
    pub pixel_regions: Vec<PixelRect>,
    /// Run the text detector and append its candidates.
    pub auto_detect: bool,
    /// Store indices to switch off after all regions are in place.
    /// Regions that are already inactive stay inactive.
    pub disabled: Vec<usize>,
}

/// Counts reported after a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedactSummary {
    pub regions: usize,
    pub active: usize,
    pub detected: usize,
}

/// Single-image redaction pipeline: read → add regions → detect → derive → write.
pub struct RedactImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    adapter: Option<DetectionAdapter>,
    filter: Arc<dyn CandidateFilter>,
    intensity: MosaicIntensity,
    detection_timeout: Duration,
}

impl RedactImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        detector: Option<Box<dyn TextDetector>>,
    ) -> Self {
        Self {
            reader,
            writer,
            adapter: detector.map(DetectionAdapter::new),
            filter: Arc::new(KeepAllFilter),
            intensity: MosaicIntensity::default(),
            detection_timeout: DEFAULT_DETECTION_TIMEOUT,
        }
    }

    pub fn with_candidate_filter(mut self, filter: Box<dyn CandidateFilter>) -> Self {
        self.filter = Arc::from(filter);
        self
    }

    pub fn with_intensity(mut self, intensity: MosaicIntensity) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }

    /// Runs the pipeline on one image. The detector and filter are shared
    /// with each run's session, so the use case can be executed repeatedly.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        request: &RedactRequest,
    ) -> Result<RedactSummary, Box<dyn std::error::Error>> {
        let image = self.reader.read(input_path)?;
        let mut session = EditorSession::new(image)
            .with_candidate_filter(Box::new(Arc::clone(&self.filter)))
            .with_detection_timeout(self.detection_timeout);
        session.set_intensity(self.intensity);

        for region in &request.regions {
            session.add_region(*region)?;
        }
        let (width, height) = (session.original().width(), session.original().height());
        for pixel in &request.pixel_regions {
            match to_normalized_rect(pixel, width, height, PixelOrigin::TopLeft) {
                Some(rect) => {
                    session.add_selection(rect)?;
                }
                None => log::warn!("Skipping pixel region {pixel:?}: outside the {width}x{height} image"),
            }
        }

        let mut detected = 0;
        if request.auto_detect {
            match &self.adapter {
                Some(adapter) => {
                    session = session.with_detection_adapter(adapter.clone());
                    session.start_auto_detect();
                    detected = session.wait_for_detection().len();
                    log::info!("Added {detected} detected text regions");
                }
                None => log::warn!("Auto-detect requested but no text detector is configured"),
            }
        }

        let mut disabled = request.disabled.clone();
        disabled.sort_unstable();
        disabled.dedup();
        for index in disabled {
            if !session.set_active(index, false) {
                log::warn!("Ignoring disabled index {index}: no such region");
            }
        }

        self.writer.write(output_path, session.display_image())?;

        Ok(RedactSummary {
            regions: session.regions().len(),
            active: session.store().active_regions().count(),
            detected,
        })
    }
}
