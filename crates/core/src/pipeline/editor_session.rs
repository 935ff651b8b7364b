use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::candidate_filter::{CandidateFilter, KeepAllFilter};
use crate::detection::domain::text_detector::TextDetector;
use crate::detection::infrastructure::detection_adapter::{DetectionAdapter, PendingDetection};
use crate::mosaic::domain::pixelation::apply_mosaic;
use crate::mosaic::domain::region::{MosaicIntensity, Region};
use crate::mosaic::domain::region_store::{RegionId, RegionStore};
use crate::shared::constants::DEFAULT_DETECTION_TIMEOUT;
use crate::shared::error::RedactError;
use crate::shared::normalized_rect::NormalizedRect;
use crate::shared::raster::RasterBuffer;

/// Editing state for one image: the untouched original, its regions, and
/// the derived pixelated image.
///
/// All store mutations go through the session, which re-derives from the
/// original right after each one. Detection results arrive over the
/// adapter's channel and are applied here, on the owning thread, so they
/// serialize with interactive edits.
pub struct EditorSession {
    original: Arc<RasterBuffer>,
    store: RegionStore,
    derived: Option<RasterBuffer>,
    derived_revision: u64,
    adapter: Option<DetectionAdapter>,
    filter: Box<dyn CandidateFilter>,
    pending: Option<PendingDetection>,
    detection_timeout: Duration,
}

impl EditorSession {
    pub fn new(original: RasterBuffer) -> Self {
        Self {
            original: Arc::new(original),
            store: RegionStore::new(),
            derived: None,
            derived_revision: 0,
            adapter: None,
            filter: Box::new(KeepAllFilter),
            pending: None,
            detection_timeout: DEFAULT_DETECTION_TIMEOUT,
        }
    }

    pub fn with_detector(self, detector: Box<dyn TextDetector>) -> Self {
        self.with_detection_adapter(DetectionAdapter::new(detector))
    }

    /// Uses an existing adapter, sharing its detector and in-flight slot
    /// with every other holder of a clone.
    pub fn with_detection_adapter(mut self, adapter: DetectionAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_candidate_filter(mut self, filter: Box<dyn CandidateFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }

    pub fn original(&self) -> &RasterBuffer {
        &self.original
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    pub fn regions(&self) -> &[Region] {
        self.store.regions()
    }

    /// The image to show: the derived image, or the original when there is
    /// nothing to apply or derivation failed.
    pub fn display_image(&self) -> &RasterBuffer {
        self.derived.as_ref().unwrap_or(&self.original)
    }

    pub fn intensity(&self) -> MosaicIntensity {
        self.store.current_intensity()
    }

    /// Changes the intensity used for new regions and refreshes the output.
    pub fn set_intensity(&mut self, intensity: MosaicIntensity) {
        self.store.set_current_intensity(intensity);
        self.refresh();
    }

    /// Adds a user-drawn region at the current intensity.
    pub fn add_selection(&mut self, rect: NormalizedRect) -> Result<RegionId, RedactError> {
        let id = self.store.add_selection(rect, self.store.current_intensity())?;
        self.rederive();
        Ok(id)
    }

    /// Adds a fully specified region, applying the same size guard as a
    /// drawn selection.
    pub fn add_region(&mut self, region: Region) -> Result<RegionId, RedactError> {
        Region::validate_selection(&region.rect)?;
        let id = self.store.insert(region);
        self.rederive();
        Ok(id)
    }

    /// Filters candidates against the current store and appends the
    /// survivors at the current intensity.
    pub fn add_candidates(&mut self, candidates: Vec<NormalizedRect>) -> Vec<RegionId> {
        let kept = self.filter.filter(candidates, self.store.regions());
        let intensity = self.store.current_intensity();
        let ids: Vec<RegionId> = kept
            .into_iter()
            .map(|rect| self.store.add(rect, intensity))
            .collect();
        self.rederive();
        ids
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        let changed = self.store.toggle(index);
        self.rederive();
        changed
    }

    /// Turns the region at `index` on or off regardless of its current
    /// state. Out-of-range indices are ignored.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        let found = self.store.set_active(index, active);
        self.rederive();
        found
    }

    pub fn remove(&mut self, index: usize) -> Option<Region> {
        let removed = self.store.remove(index);
        self.rederive();
        removed
    }

    pub fn toggle_by_id(&mut self, id: RegionId) -> bool {
        let changed = self.store.toggle_by_id(id);
        self.rederive();
        changed
    }

    pub fn remove_by_id(&mut self, id: RegionId) -> Option<Region> {
        let removed = self.store.remove_by_id(id);
        self.rederive();
        removed
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.rederive();
    }

    pub fn is_detecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts automatic text-region detection on the original image.
    ///
    /// Returns `false` when no detector is configured or a request is
    /// already running.
    pub fn start_auto_detect(&mut self) -> bool {
        if self.pending.is_some() {
            log::info!("Auto-detect already running; ignoring request");
            return false;
        }
        let Some(adapter) = &self.adapter else {
            log::info!("No text detector configured; auto-detect unavailable");
            return false;
        };
        self.pending = adapter.detect_candidate_regions(Arc::clone(&self.original));
        self.pending.is_some()
    }

    /// Applies detection results if they have arrived.
    ///
    /// Returns the ids of added regions once the request completes, `None`
    /// while it is still running or when none was started.
    pub fn poll_detection(&mut self) -> Option<Vec<RegionId>> {
        let candidates = self.pending.as_ref()?.try_take()?;
        self.pending = None;
        Some(self.add_candidates(candidates))
    }

    /// Blocks until the running request completes or the detection timeout
    /// elapses, then applies whatever arrived.
    pub fn wait_for_detection(&mut self) -> Vec<RegionId> {
        match self.pending.take() {
            Some(pending) => {
                let candidates = pending.wait(self.detection_timeout);
                self.add_candidates(candidates)
            }
            None => Vec::new(),
        }
    }

    fn rederive(&mut self) {
        if self.store.revision() != self.derived_revision {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        self.derived_revision = self.store.revision();
        if self.store.is_empty() {
            self.derived = None;
            return;
        }
        self.derived = match apply_mosaic(&self.original, self.store.regions()) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Showing original image: {e}");
                None
            }
        };
        log::debug!(
            "Re-derived image from {} regions ({} active)",
            self.store.len(),
            self.store.active_regions().count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::candidate_filter::OverlapFilter;
    use crate::detection::domain::text_detector::{
        BoxConvention, DetectionOptions, DetectorError, TextObservation,
    };
    use crossbeam_channel::{Receiver, Sender};

    const WAIT: Duration = Duration::from_secs(5);

    fn rect(x: f64, y: f64, w: f64, h: f64) -> NormalizedRect {
        NormalizedRect::new(x, y, w, h).unwrap()
    }

    fn checkerboard(size: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RasterBuffer::new(data, size, size).unwrap()
    }

    struct StubDetector {
        boxes: Vec<TextObservation>,
    }

    impl TextDetector for StubDetector {
        fn convention(&self) -> BoxConvention {
            BoxConvention::BottomLeft
        }

        fn detect(
            &mut self,
            _image: &RasterBuffer,
            _options: &DetectionOptions,
        ) -> Result<Vec<TextObservation>, DetectorError> {
            Ok(self.boxes.clone())
        }
    }

    struct FailingDetector;

    impl TextDetector for FailingDetector {
        fn convention(&self) -> BoxConvention {
            BoxConvention::TopLeft
        }

        fn detect(
            &mut self,
            _image: &RasterBuffer,
            _options: &DetectionOptions,
        ) -> Result<Vec<TextObservation>, DetectorError> {
            Err(DetectorError::Backend("capability unavailable".into()))
        }
    }

    struct GatedDetector {
        gate: Receiver<()>,
    }

    impl TextDetector for GatedDetector {
        fn convention(&self) -> BoxConvention {
            BoxConvention::TopLeft
        }

        fn detect(
            &mut self,
            _image: &RasterBuffer,
            _options: &DetectionOptions,
        ) -> Result<Vec<TextObservation>, DetectorError> {
            let _ = self.gate.recv();
            Ok(vec![TextObservation {
                x: 0.5,
                y: 0.5,
                width: 0.25,
                height: 0.25,
                confidence: 1.0,
            }])
        }
    }

    fn gated_session() -> (EditorSession, Sender<()>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let session = EditorSession::new(checkerboard(40))
            .with_detector(Box::new(GatedDetector { gate: rx }))
            .with_detection_timeout(WAIT);
        (session, tx)
    }

    #[test]
    fn test_new_session_shows_original() {
        let session = EditorSession::new(checkerboard(40));
        assert_eq!(session.display_image(), session.original());
        assert!(session.regions().is_empty());
    }

    #[test]
    fn test_add_selection_pixelates_display_image() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        assert_ne!(session.display_image(), session.original());
        // 20x20 checkerboard block averages to mid grey
        assert_eq!(session.display_image().pixel(0, 0), Some([128, 128, 128, 255]));
        assert_eq!(session.display_image().pixel(30, 30), session.original().pixel(30, 30));
    }

    #[test]
    fn test_degenerate_selection_leaves_session_untouched() {
        let mut session = EditorSession::new(checkerboard(40));
        let err = session.add_selection(rect(0.2, 0.2, 0.01, 0.5)).unwrap_err();
        assert!(matches!(err, RedactError::DegenerateRegion { .. }));
        assert!(session.regions().is_empty());
        assert_eq!(session.display_image(), session.original());
    }

    #[test]
    fn test_toggle_off_restores_original_pixels() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        assert!(session.toggle(0));
        assert_eq!(session.display_image(), session.original());
        assert!(session.toggle(0));
        assert_ne!(session.display_image(), session.original());
    }

    #[test]
    fn test_set_active_false_never_reenables() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        assert!(session.set_active(0, false));
        assert!(session.set_active(0, false));
        assert!(!session.regions()[0].active);
        assert_eq!(session.display_image(), session.original());
        assert!(!session.set_active(3, false));
    }

    #[test]
    fn test_rederive_always_starts_from_original() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        session.add_selection(rect(0.5, 0.5, 0.5, 0.5)).unwrap();
        session.remove(1);
        let expected = apply_mosaic(session.original(), session.regions()).unwrap();
        assert_eq!(session.display_image(), &expected);
    }

    #[test]
    fn test_out_of_range_edits_are_silent() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        let before = session.display_image().clone();
        assert!(!session.toggle(7));
        assert!(session.remove(7).is_none());
        assert_eq!(session.display_image(), &before);
    }

    #[test]
    fn test_clear_all_shows_original() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        session.clear_all();
        assert!(session.regions().is_empty());
        assert_eq!(session.display_image(), session.original());
    }

    #[test]
    fn test_invalid_original_falls_back_to_original() {
        let empty = RasterBuffer::new(Vec::new(), 0, 0).unwrap();
        let mut session = EditorSession::new(empty.clone());
        session.add_candidates(vec![rect(0.0, 0.0, 0.5, 0.5)]);
        assert_eq!(session.regions().len(), 1);
        assert_eq!(session.display_image(), &empty);
    }

    #[test]
    fn test_add_region_keeps_inactive_flag() {
        let mut session = EditorSession::new(checkerboard(40));
        let mut region = Region::new(rect(0.0, 0.0, 0.5, 0.5), MosaicIntensity::Strong);
        region.active = false;
        session.add_region(region).unwrap();
        assert_eq!(session.display_image(), session.original());
    }

    #[test]
    fn test_ids_survive_removal_of_earlier_regions() {
        let mut session = EditorSession::new(checkerboard(40));
        session.add_selection(rect(0.0, 0.0, 0.25, 0.25)).unwrap();
        let id = session.add_selection(rect(0.5, 0.5, 0.5, 0.5)).unwrap();
        session.remove(0);
        assert!(session.toggle_by_id(id));
        assert_eq!(session.display_image(), session.original());
        assert!(session.remove_by_id(id).is_some());
        assert!(session.regions().is_empty());
    }

    #[test]
    fn test_set_intensity_updates_current_intensity() {
        let mut session = EditorSession::new(checkerboard(40));
        session.set_intensity(MosaicIntensity::Strong);
        assert_eq!(session.intensity(), MosaicIntensity::Strong);
    }

    #[test]
    fn test_auto_detect_without_detector_is_unavailable() {
        let mut session = EditorSession::new(checkerboard(40));
        assert!(!session.start_auto_detect());
        assert!(session.poll_detection().is_none());
        assert!(session.wait_for_detection().is_empty());
    }

    #[test]
    fn test_auto_detect_adds_flipped_candidates() {
        let mut session = EditorSession::new(checkerboard(40)).with_detector(Box::new(StubDetector {
            boxes: vec![TextObservation {
                x: 0.0,
                y: 0.5,
                width: 0.5,
                height: 0.5,
                confidence: 0.8,
            }],
        }));
        assert!(session.start_auto_detect());
        let ids = session.wait_for_detection();
        assert_eq!(ids.len(), 1);
        // Bottom-left y=0.5,h=0.5 is the top half of the image
        assert_eq!(session.regions()[0].rect, rect(0.0, 0.0, 0.5, 0.5));
        assert_eq!(session.display_image().pixel(0, 0), Some([128, 128, 128, 255]));
        assert!(!session.is_detecting());
    }

    #[test]
    fn test_detection_failure_adds_nothing() {
        let mut session = EditorSession::new(checkerboard(40)).with_detector(Box::new(FailingDetector));
        assert!(session.start_auto_detect());
        assert!(session.wait_for_detection().is_empty());
        assert!(session.regions().is_empty());
        assert_eq!(session.display_image(), session.original());
    }

    #[test]
    fn test_second_auto_detect_is_rejected_while_running() {
        let (mut session, gate) = gated_session();
        assert!(session.start_auto_detect());
        assert!(session.is_detecting());
        assert!(!session.start_auto_detect());
        assert!(session.poll_detection().is_none());

        gate.send(()).unwrap();
        assert_eq!(session.wait_for_detection().len(), 1);
        assert_eq!(session.regions().len(), 1);
    }

    #[test]
    fn test_interactive_edits_interleave_with_pending_detection() {
        let (mut session, gate) = gated_session();
        assert!(session.start_auto_detect());
        session.add_selection(rect(0.0, 0.0, 0.25, 0.25)).unwrap();
        gate.send(()).unwrap();
        session.wait_for_detection();
        let xs: Vec<f64> = session.regions().iter().map(|r| r.rect.x()).collect();
        assert_eq!(xs, vec![0.0, 0.5]);
    }

    #[test]
    fn test_overlap_filter_skips_already_marked_text() {
        let mut session = EditorSession::new(checkerboard(40))
            .with_detector(Box::new(StubDetector {
                boxes: vec![TextObservation {
                    x: 0.0,
                    y: 0.5,
                    width: 0.5,
                    height: 0.5,
                    confidence: 0.8,
                }],
            }))
            .with_candidate_filter(Box::new(OverlapFilter::default()));
        session.add_selection(rect(0.0, 0.0, 0.5, 0.5)).unwrap();
        session.start_auto_detect();
        assert!(session.wait_for_detection().is_empty());
        assert_eq!(session.regions().len(), 1);
    }
}
