use std::collections::HashMap;

use crate::mosaic::domain::region::{MosaicIntensity, Region};
use crate::shared::error::RedactError;
use crate::shared::normalized_rect::NormalizedRect;

/// Stable handle for a stored region. Never reused within one store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl RegionId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Ordered, insertion-order collection of regions.
///
/// Positional indices are the primary identity: `toggle` and `remove` take
/// an index and silently ignore stale ones. Each region also gets a
/// [`RegionId`] so holders of long-lived references can survive removals.
///
/// Every effective mutation bumps [`revision`](RegionStore::revision);
/// callers compare revisions to decide whether to re-derive. The store has
/// no internal locking.
#[derive(Clone, Debug, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
    ids: Vec<RegionId>,
    next_id: u64,
    revision: u64,
    current_intensity: MosaicIntensity,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an active region. No deduplication or merging.
    pub fn add(&mut self, rect: NormalizedRect, intensity: MosaicIntensity) -> RegionId {
        self.insert(Region::new(rect, intensity))
    }

    /// Appends a region drawn by the user, rejecting ones at or below the
    /// minimum size.
    pub fn add_selection(
        &mut self,
        rect: NormalizedRect,
        intensity: MosaicIntensity,
    ) -> Result<RegionId, RedactError> {
        Region::validate_selection(&rect)?;
        Ok(self.add(rect, intensity))
    }

    /// Appends a region as-is, keeping its `active` flag.
    pub fn insert(&mut self, region: Region) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        self.regions.push(region);
        self.ids.push(id);
        self.revision += 1;
        id
    }

    /// Sets `active` at `index`. Returns `false` for an out-of-range index.
    /// The revision only moves when the flag actually changes.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.regions.get_mut(index) {
            Some(region) => {
                if region.active != active {
                    region.active = active;
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Flips `active` at `index`. Returns `false` for an out-of-range index.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.regions.get_mut(index) {
            Some(region) => {
                region.active = !region.active;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Removes the region at `index`, shifting later regions down by one.
    /// Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<Region> {
        if index >= self.regions.len() {
            return None;
        }
        self.ids.remove(index);
        self.revision += 1;
        Some(self.regions.remove(index))
    }

    /// Removes several regions addressed by their indices before any
    /// removal, highest index first. Returns how many were removed.
    pub fn remove_indices(&mut self, indices: &[usize]) -> usize {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted
            .into_iter()
            .filter(|&index| self.remove(index).is_some())
            .count()
    }

    pub fn clear_all(&mut self) {
        self.regions.clear();
        self.ids.clear();
        self.revision += 1;
    }

    pub fn toggle_by_id(&mut self, id: RegionId) -> bool {
        self.index_of(id).is_some_and(|index| self.toggle(index))
    }

    pub fn remove_by_id(&mut self, id: RegionId) -> Option<Region> {
        self.index_of(id).and_then(|index| self.remove(index))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn active_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.active)
    }

    pub fn id_at(&self, index: usize) -> Option<RegionId> {
        self.ids.get(index).copied()
    }

    pub fn index_of(&self, id: RegionId) -> Option<usize> {
        self.ids.iter().position(|&candidate| candidate == id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Intensity the UI applies to newly drawn or detected regions.
    pub fn current_intensity(&self) -> MosaicIntensity {
        self.current_intensity
    }

    pub fn set_current_intensity(&mut self, intensity: MosaicIntensity) {
        self.current_intensity = intensity;
    }
}

/// Re-keys an index-keyed map after the entry at `removed` was deleted from
/// the store: lower keys stay, higher keys shift down by one, and the
/// removed key is dropped.
pub fn reindex_after_removal<V>(map: HashMap<usize, V>, removed: usize) -> HashMap<usize, V> {
    map.into_iter()
        .filter(|(index, _)| *index != removed)
        .map(|(index, value)| {
            if index > removed {
                (index - 1, value)
            } else {
                (index, value)
            }
        })
        .collect()
}
