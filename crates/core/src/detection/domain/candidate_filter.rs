use std::sync::Arc;

use crate::mosaic::domain::region::Region;
use crate::shared::constants::DEFAULT_OVERLAP_THRESHOLD;
use crate::shared::normalized_rect::NormalizedRect;

/// Narrows detected candidates before they become regions.
///
/// Runs on the thread that owns the region store, so `existing` reflects
/// the store at the moment the candidates are applied.
pub trait CandidateFilter: Send + Sync {
    fn filter(&self, candidates: Vec<NormalizedRect>, existing: &[Region]) -> Vec<NormalizedRect>;
}

impl<F: CandidateFilter + ?Sized> CandidateFilter for Arc<F> {
    fn filter(&self, candidates: Vec<NormalizedRect>, existing: &[Region]) -> Vec<NormalizedRect> {
        (**self).filter(candidates, existing)
    }
}

/// Passes every candidate through.
pub struct KeepAllFilter;

impl CandidateFilter for KeepAllFilter {
    fn filter(&self, candidates: Vec<NormalizedRect>, _existing: &[Region]) -> Vec<NormalizedRect> {
        candidates
    }
}

/// Greedy overlap suppression: keeps a candidate only if its IoU with every
/// stored region and every previously kept candidate is at or below the
/// threshold.
pub struct OverlapFilter {
    iou_threshold: f64,
}

impl OverlapFilter {
    pub fn new(iou_threshold: f64) -> Self {
        Self { iou_threshold }
    }
}

impl Default for OverlapFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_THRESHOLD)
    }
}

impl CandidateFilter for OverlapFilter {
    fn filter(&self, candidates: Vec<NormalizedRect>, existing: &[Region]) -> Vec<NormalizedRect> {
        let mut seen: Vec<NormalizedRect> = existing.iter().map(|r| r.rect).collect();
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let dominated = seen.iter().any(|s| candidate.iou(s) > self.iou_threshold);
            if !dominated {
                seen.push(candidate);
                kept.push(candidate);
            }
        }
        kept
    }
}
