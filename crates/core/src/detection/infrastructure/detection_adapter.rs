use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::detection::domain::text_detector::{
    BoxConvention, DetectionOptions, TextDetector, TextObservation,
};
use crate::shared::normalized_rect::NormalizedRect;
use crate::shared::raster::RasterBuffer;

type InFlight = Arc<Mutex<Option<u64>>>;

/// Runs a [`TextDetector`] on a background thread and turns its boxes into
/// top-left normalized candidate rects.
///
/// One adapter serves one image: while a request is outstanding, further
/// requests are rejected. Failures inside the detector (errors or panics)
/// resolve to an empty candidate set. Clones share the detector and the
/// in-flight slot.
#[derive(Clone)]
pub struct DetectionAdapter {
    detector: Arc<Mutex<Box<dyn TextDetector>>>,
    options: DetectionOptions,
    in_flight: InFlight,
    next_request: Arc<AtomicU64>,
}

impl DetectionAdapter {
    pub fn new(detector: Box<dyn TextDetector>) -> Self {
        Self::with_options(detector, DetectionOptions::default())
    }

    pub fn with_options(detector: Box<dyn TextDetector>, options: DetectionOptions) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
            options,
            in_flight: Arc::new(Mutex::new(None)),
            next_request: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Starts detection on a worker thread.
    ///
    /// Returns `None` if a previous request has not completed or been
    /// abandoned yet.
    pub fn detect_candidate_regions(&self, image: Arc<RasterBuffer>) -> Option<PendingDetection> {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = lock(&self.in_flight);
            if let Some(active) = *slot {
                log::info!("Text detection request {active} still running; ignoring new request");
                return None;
            }
            *slot = Some(request_id);
        }

        let (tx, rx) = crossbeam_channel::bounded::<Vec<NormalizedRect>>(1);
        let detector = Arc::clone(&self.detector);
        let in_flight = Arc::clone(&self.in_flight);
        let options = self.options;

        let spawned = thread::Builder::new()
            .name("text-detection".into())
            .spawn(move || {
                let candidates = run_detection(&detector, &image, &options);
                release(&in_flight, request_id);
                let _ = tx.send(candidates);
            });

        if let Err(e) = spawned {
            log::warn!("Failed to spawn text detection worker: {e}");
            release(&self.in_flight, request_id);
        }

        log::debug!("Started text detection request {request_id}");
        Some(PendingDetection {
            request_id,
            rx,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

/// A detection request whose candidate set is delivered exactly once.
pub struct PendingDetection {
    request_id: u64,
    rx: Receiver<Vec<NormalizedRect>>,
    in_flight: InFlight,
}

impl PendingDetection {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Non-blocking poll. A worker that died without answering yields an
    /// empty set.
    pub fn try_take(&self) -> Option<Vec<NormalizedRect>> {
        match self.rx.try_recv() {
            Ok(candidates) => Some(candidates),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Vec::new()),
        }
    }

    /// Blocks for at most `timeout`. On timeout the request is abandoned:
    /// the adapter accepts new requests and any late result is dropped.
    pub fn wait(self, timeout: Duration) -> Vec<NormalizedRect> {
        match self.rx.recv_timeout(timeout) {
            Ok(candidates) => candidates,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Text detection request {} timed out after {:?}; abandoning",
                    self.request_id,
                    timeout
                );
                release(&self.in_flight, self.request_id);
                Vec::new()
            }
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }
}

/// Converts detector boxes to clamped, top-left normalized rects.
///
/// Bottom-left boxes are flipped; boxes with no area inside the image are
/// dropped.
pub fn normalize_observations(
    observations: &[TextObservation],
    convention: BoxConvention,
) -> Vec<NormalizedRect> {
    observations
        .iter()
        .filter_map(|o| {
            let rect = NormalizedRect::from_unclamped(o.x, o.y, o.width, o.height)?;
            Some(match convention {
                BoxConvention::TopLeft => rect,
                BoxConvention::BottomLeft => rect.flip_vertical(),
            })
        })
        .collect()
}

fn run_detection(
    detector: &Mutex<Box<dyn TextDetector>>,
    image: &RasterBuffer,
    options: &DetectionOptions,
) -> Vec<NormalizedRect> {
    let mut detector = lock(detector);
    let convention = detector.convention();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(image, options)));
    match outcome {
        Ok(Ok(observations)) => {
            let candidates = normalize_observations(&observations, convention);
            log::info!(
                "Text detection found {} candidate regions ({} boxes)",
                candidates.len(),
                observations.len()
            );
            candidates
        }
        Ok(Err(e)) => {
            log::warn!("{e}; no automatic candidates");
            Vec::new()
        }
        Err(_) => {
            log::warn!("Text detector panicked; no automatic candidates");
            Vec::new()
        }
    }
}

fn release(in_flight: &Mutex<Option<u64>>, request_id: u64) {
    let mut slot = lock(in_flight);
    if *slot == Some(request_id) {
        *slot = None;
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
