//! Ray-caster volumes: window-filtered region snapshots.

use crate::sense::Sense;
use sensecast_math::{Aabb2, ZBand};
use sensecast_region::{CombineMode, Region};
use sensecast_shapes::Shape;

/// A read-only snapshot of one region as seen by one ray caster: the subset
/// of its shapes that overlap the caster's window, its combination mode, a
/// dense per-sense cost vector (`1 / limit`, `1/∞ = 0`), and its vertical
/// interval.
#[derive(Debug, Clone)]
pub struct Volume {
    shapes: Vec<Shape>,
    mode: CombineMode,
    costs: Vec<f64>,
    z: ZBand,
}

impl Volume {
    /// Build the snapshot of `region` for a caster over `bounds` with the
    /// given (already normalized) sense list.
    ///
    /// Returns `None` when the region misses the window entirely or no
    /// shape survives the window filter.
    pub(crate) fn build(
        region: &Region,
        senses: &[Sense],
        bounds: &Aabb2,
        z: &ZBand,
    ) -> Option<Self> {
        if region.skip() || !region.data().active {
            return None;
        }
        if !region.bounds().overlaps(bounds) || !region.z_band().overlaps(z) {
            return None;
        }

        let shapes: Vec<Shape> = region
            .shapes()
            .iter()
            .filter(|s| s.bounding_box().overlaps(bounds))
            .cloned()
            .collect();
        if shapes.is_empty() {
            return None;
        }

        let costs = senses.iter().map(|s| region.cost_for(&s.name)).collect();

        Some(Self {
            shapes,
            mode: region.data().mode,
            costs,
            z: *region.z_band(),
        })
    }

    /// The window-surviving shapes.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Combination mode.
    pub fn mode(&self) -> CombineMode {
        self.mode
    }

    /// Per-sense costs, indexed like the caster's sense list.
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Vertical interval.
    pub fn z_band(&self) -> &ZBand {
        &self.z
    }

    /// Minimum cost over the first `active` senses.
    pub(crate) fn cost_for_active(&self, active: usize) -> f64 {
        self.costs[..active.min(self.costs.len())]
            .iter()
            .fold(f64::INFINITY, |m, &c| m.min(c))
    }

    /// Does this volume enclose every point of `bounds` with a uniform
    /// inside state?
    ///
    /// True when each surviving shape fully contains the box and the XOR of
    /// their masks is non-zero; parity is then constant across the window.
    pub(crate) fn covers_bounds(&self, bounds: &Aabb2) -> bool {
        let mut parity = 0i32;
        for shape in &self.shapes {
            if !shape.contains_bounds(bounds) {
                return false;
            }
            parity ^= shape.mask();
        }
        parity != 0
    }

    /// A coverer that resets accumulated cost to zero: dropping it (and
    /// everything masked beneath it) cannot change any cast.
    pub(crate) fn is_inert_coverer(&self) -> bool {
        matches!(self.mode, CombineMode::Set | CombineMode::Max)
            && self.costs.iter().all(|&c| c == 0.0)
    }

    /// A coverer no ray can escape: every sense's cost is infinite under a
    /// mode that cannot be undone from beneath.
    pub(crate) fn is_blocking_coverer(&self) -> bool {
        matches!(
            self.mode,
            CombineMode::Sum | CombineMode::Set | CombineMode::Min
        ) && !self.costs.is_empty()
            && self.costs.iter().all(|c| c.is_infinite())
    }

    /// Worst-case (maximum) per-sense cost of this volume.
    pub(crate) fn max_cost(&self) -> f64 {
        self.costs.iter().fold(0.0f64, |m, &c| m.max(c))
    }

    /// Best-case (minimum) per-sense cost of this volume.
    pub(crate) fn min_cost(&self) -> f64 {
        self.costs.iter().fold(f64::INFINITY, |m, &c| m.min(c))
    }
}

/// Drop volumes made redundant by the last window-covering inert or
/// blocking volume.
///
/// Scans in priority order: an inert coverer (uniform `Set`/`Max`, cost
/// zero) masks everything before it and contributes nothing itself; a
/// blocking coverer makes the entire window unreachable, reported through
/// the returned flag. Must never change cast results — verified by the
/// enabled-vs-disabled property test.
pub(crate) fn prune_volumes(
    mut volumes: Vec<Volume>,
    bounds: &Aabb2,
    z: &ZBand,
) -> (Vec<Volume>, bool) {
    let mut cut = None;
    let mut blocked = false;

    for (i, volume) in volumes.iter().enumerate() {
        // Coverage must hold across the whole window, vertically included.
        if !volume.z.contains_band(z) || !volume.covers_bounds(bounds) {
            continue;
        }
        if volume.is_inert_coverer() {
            cut = Some(i);
            blocked = false;
        } else if volume.is_blocking_coverer() {
            // Only counts as a true block when no later volume could lower
            // the accumulated cost back down (Set replaces, Max clears).
            let escapable = volumes[i + 1..].iter().any(|v| {
                matches!(v.mode, CombineMode::Set | CombineMode::Max)
            });
            if !escapable {
                cut = Some(i);
                blocked = true;
            }
        }
    }

    if let Some(i) = cut {
        volumes.drain(..=i);
    }
    (volumes, blocked)
}
