#![warn(missing_docs)]

//! Multi-sense, energy-budgeted ray casting over volumetric regions.
//!
//! Provides the [`RayCastingSystem`] type — the primary interface tying the
//! region registry to memoized ray casters.
//!
//! # Example
//!
//! ```
//! use sensecast::{Point3, RayCastingSystem, Sense, Window};
//!
//! let mut system = RayCastingSystem::new();
//! system.refresh();
//! let caster = system.create_ray_caster(&[Sense::new("sight", 100.0)], Window::unbounded(), 1e9);
//! assert!(caster.reaches(&Point3::new(0.0, 0.0, 0.0), &Point3::new(50.0, 0.0, 0.0)));
//! ```

pub use sensecast_caster;
pub use sensecast_field;
pub use sensecast_math;
pub use sensecast_region;
pub use sensecast_shapes;

pub use sensecast_caster::{RayCaster, Sense, Window, SENSE_EXHAUSTED};
pub use sensecast_math::{Aabb2, Point2, Point3, ZBand};
pub use sensecast_region::{CombineMode, Region, RegionData, RegionError, RegionRegistry};
pub use sensecast_shapes::{ShapeDescriptor, TileMask};

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// The region registry plus a cache of ray casters keyed on their
/// construction parameters.
///
/// Caster construction is the expensive step (window filtering, pruning,
/// bounds estimation), so casters are shared: two requests with equivalent
/// sense lists and windows get the same [`Arc`]. Any
/// [`refresh`](Self::refresh) that changes the active region set clears the
/// cache; handles held by callers stay valid as frozen snapshots.
#[derive(Debug, Default)]
pub struct RayCastingSystem {
    registry: RegionRegistry,
    casters: HashMap<String, Arc<RayCaster>>,
}

impl RayCastingSystem {
    /// Create an empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a region; buffered until the next [`refresh`](Self::refresh).
    pub fn create_region(&mut self, id: &str, data: RegionData) -> Result<(), RegionError> {
        self.registry.create_region(id, data)
    }

    /// Replace a region's data; buffered until the next refresh.
    pub fn update_region(&mut self, id: &str, data: RegionData) -> bool {
        self.registry.update_region(id, data)
    }

    /// Soft-delete a region; reaped at the next refresh.
    pub fn destroy_region(&mut self, id: &str) -> bool {
        self.registry.destroy_region(id)
    }

    /// Is there a live region under `id`?
    pub fn has_region(&self, id: &str) -> bool {
        self.registry.has_region(id)
    }

    /// The materialized region under `id`, if live.
    pub fn get_region(&self, id: &str) -> Option<&Region> {
        self.registry.get_region(id)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Materialize buffered region changes; invalidates all cached casters
    /// when anything changed.
    pub fn refresh(&mut self) -> bool {
        let changed = self.registry.refresh();
        if changed {
            self.casters.clear();
        }
        changed
    }

    /// A caster for the given senses, window, and range cap, built against
    /// the active regions as of the last refresh.
    ///
    /// Memoized: equivalent parameters (sense order does not matter) return
    /// the same shared caster until the next effective refresh.
    pub fn create_ray_caster(&mut self, senses: &[Sense], window: Window, max_range: f64) -> Arc<RayCaster> {
        let key = caster_key(senses, &window, max_range);
        if let Some(caster) = self.casters.get(&key) {
            return Arc::clone(caster);
        }
        let caster = {
            let active = self.registry.active_regions();
            Arc::new(RayCaster::new(&active, senses, window, max_range))
        };
        self.casters.insert(key, Arc::clone(&caster));
        caster
    }
}

/// Canonical cache key: normalized sense list plus exact window and range
/// bits, so equivalent requests collide and nothing else does.
fn caster_key(senses: &[Sense], window: &Window, max_range: f64) -> String {
    let mut ordered: Vec<&Sense> = senses.iter().filter(|s| s.range > 0.0).collect();
    ordered.sort_by(|a, b| b.range.total_cmp(&a.range).then_with(|| a.name.cmp(&b.name)));

    let mut key = String::new();
    for sense in ordered {
        let _ = write!(key, "{}:{:x};", sense.name, sense.range.to_bits());
    }
    let _ = write!(
        key,
        "|{:x},{:x},{:x},{:x}|{:x},{:x}|{:x}",
        window.bounds.min.x.to_bits(),
        window.bounds.min.y.to_bits(),
        window.bounds.max.x.to_bits(),
        window.bounds.max.y.to_bits(),
        window.z.bottom.to_bits(),
        window.z.top.to_bits(),
        max_range.to_bits()
    );
    key
}
