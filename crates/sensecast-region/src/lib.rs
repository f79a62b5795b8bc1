#![warn(missing_docs)]

//! Volumetric regions and the region registry.
//!
//! A region is a named, versioned record: an active flag, a list of shapes,
//! per-sense attenuation limits, a combination mode, a vertical interval,
//! and a sort priority. The registry owns all regions, buffers mutations,
//! and on [`RegionRegistry::refresh`] materializes derived data (shapes,
//! bounding boxes, skip flags) and rebuilds the priority-sorted active list.

mod region;
mod registry;

pub use region::{CombineMode, Region, RegionData};
pub use registry::{RegionError, RegionRegistry};
