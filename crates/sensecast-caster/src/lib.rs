#![warn(missing_docs)]

//! Event-driven, energy-budgeted ray casting over volumetric regions.
//!
//! A [`RayCaster`] is built from a snapshot of active regions restricted to
//! a spatial window and a fixed sense list. Construction filters regions and
//! shapes against the window, prunes volumes made redundant by a
//! window-covering volume, and precomputes conservative travel bounds
//! (`min_distance`/`max_distance`). Each cast then answers one origin/target
//! query by sweeping shape-boundary and sense-exhaustion events in time
//! order while draining a unit energy budget at the combined per-distance
//! cost of the volumes currently enclosing the ray.

mod caster;
mod sense;
mod volume;

pub use caster::{RayCaster, Window};
pub use sense::Sense;
pub use volume::Volume;

/// Sentinel volume index marking a sense-exhaustion event; the event's mask
/// then carries the sense index.
pub const SENSE_EXHAUSTED: i32 = -1;
