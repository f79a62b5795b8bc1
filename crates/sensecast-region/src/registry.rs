//! The region registry: buffered mutation and the refresh lifecycle.

use crate::region::{Region, RegionData};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by the registry.
#[derive(Error, Debug)]
pub enum RegionError {
    /// A region was created under an id that already exists. This is a
    /// caller bug — the caller lost track of its own registry.
    #[error("Region id already exists: {0}")]
    DuplicateId(String),
}

/// One registry slot: the materialized region plus buffered changes.
#[derive(Debug)]
struct Slot {
    region: Region,
    /// Data waiting to be materialized at the next refresh.
    pending: Option<RegionData>,
    /// Soft-deleted; reaped at the next refresh.
    destroyed: bool,
}

/// Owns all regions, tracks dirtiness, and on [`refresh`](Self::refresh)
/// produces a priority-sorted list of active regions.
///
/// Mutations are buffered: derived fields (shapes, bounds, skip flags) and
/// the active list change only inside `refresh`, so an in-flight active
/// list stays valid between refreshes.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    slots: HashMap<String, Slot>,
    /// Active region ids, priority-sorted, rebuilt on refresh.
    active: Vec<String>,
    dirty: bool,
}

impl RegionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a region. Fails loudly on a duplicate id.
    pub fn create_region(&mut self, id: &str, data: RegionData) -> Result<(), RegionError> {
        match self.slots.get_mut(id) {
            Some(slot) if !slot.destroyed => {
                return Err(RegionError::DuplicateId(id.to_string()));
            }
            Some(slot) => {
                // Revive a destroyed-but-unreaped slot in place: the old
                // materialized region must stay visible to the in-flight
                // active list until the next refresh.
                slot.pending = Some(data);
                slot.destroyed = false;
            }
            None => {
                self.slots.insert(
                    id.to_string(),
                    Slot {
                        region: Region::materialize(id.to_string(), RegionData::default()),
                        pending: Some(data),
                        destroyed: false,
                    },
                );
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace a region's data; buffered until the next refresh.
    ///
    /// Returns whether anything actually changed.
    pub fn update_region(&mut self, id: &str, data: RegionData) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        if slot.destroyed {
            return false;
        }
        let current = slot.pending.as_ref().unwrap_or_else(|| slot.region.data());
        if *current == data {
            return false;
        }
        slot.pending = Some(data);
        self.dirty = true;
        true
    }

    /// Soft-delete a region; fully removed at the next refresh.
    ///
    /// Returns whether the region existed.
    pub fn destroy_region(&mut self, id: &str) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        if slot.destroyed {
            return false;
        }
        slot.destroyed = true;
        self.dirty = true;
        true
    }

    /// Is there a live region under `id`?
    pub fn has_region(&self, id: &str) -> bool {
        self.slots.get(id).is_some_and(|s| !s.destroyed)
    }

    /// The materialized region under `id`, if live.
    ///
    /// Buffered updates are not visible until the next refresh.
    pub fn get_region(&self, id: &str) -> Option<&Region> {
        self.slots
            .get(id)
            .filter(|s| !s.destroyed)
            .map(|s| &s.region)
    }

    /// The active regions in priority order, as of the last refresh.
    pub fn active_regions(&self) -> Vec<&Region> {
        self.active
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|s| &s.region)
            .collect()
    }

    /// Materialize buffered changes and rebuild the active list.
    ///
    /// A no-op returning `false` unless something is dirty. When it returns
    /// `true` the set or shape of active regions may have changed, and any
    /// ray-caster memoization keyed on it must be invalidated.
    pub fn refresh(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        self.slots.retain(|_, slot| !slot.destroyed);

        for slot in self.slots.values_mut() {
            if let Some(data) = slot.pending.take() {
                slot.region = Region::materialize(slot.region.id().to_string(), data);
            }
        }

        let mut active: Vec<&Region> = self
            .slots
            .values()
            .map(|s| &s.region)
            .filter(|r| r.data().active && !r.skip())
            .collect();
        active.sort_by(|a, b| {
            compare_priority(&a.data().priority, &b.data().priority).then_with(|| a.id().cmp(b.id()))
        });
        self.active = active.iter().map(|r| r.id().to_string()).collect();

        true
    }
}

/// Lexicographic priority comparison; a shorter tuple sorts before a longer
/// one on a common-prefix tie.
fn compare_priority(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.total_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
