//! Region records and their derived data.

use sensecast_math::{Aabb2, ZBand};
use sensecast_shapes::{Shape, ShapeDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a region's per-sense cost combines with other regions simultaneously
/// occupied by a ray.
///
/// The reducer semantics are literal: `Min` yields an upper envelope of
/// cost and `Max` a lower envelope, so a `Max`-mode "clearing" can reduce
/// accumulated cost below what `Sum` would give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CombineMode {
    /// Add this region's cost to the accumulator.
    Sum = 0,
    /// Replace the accumulator with this region's cost.
    Set = 1,
    /// Take the larger of accumulator and cost (upper envelope).
    Min = 2,
    /// Take the smaller of accumulator and cost (lower envelope).
    Max = 3,
}

impl CombineMode {
    /// Stable integer code of the mode.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Raw region data as supplied by the host integration layer.
///
/// `limits` maps a sense name to its cost-defining range: a finite positive
/// number, `0.0` (impassable for that sense), or `f64::INFINITY` /
/// an omitted entry for "unlimited". `height` of `None` extends the region
/// upward without bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionData {
    /// Inactive regions are excluded from every ray caster.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Cost combination mode.
    pub mode: CombineMode,
    /// Per-sense attenuation limits.
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,
    /// Shape descriptors; masks let shapes act as holes.
    #[serde(default)]
    pub shapes: Vec<ShapeDescriptor>,
    /// Bottom elevation of the region.
    #[serde(default)]
    pub elevation: f64,
    /// Vertical extent above `elevation`; `None` is unbounded.
    #[serde(default)]
    pub height: Option<f64>,
    /// Sort priority: compared lexicographically, shorter tuples first on a
    /// common-prefix tie. Used only for deterministic ordering.
    #[serde(default)]
    pub priority: Vec<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for RegionData {
    fn default() -> Self {
        Self {
            active: true,
            mode: CombineMode::Sum,
            limits: BTreeMap::new(),
            shapes: Vec::new(),
            elevation: 0.0,
            height: None,
            priority: Vec::new(),
        }
    }
}

/// A materialized region: raw data plus the derived fields recomputed at
/// every registry refresh.
#[derive(Debug, Clone)]
pub struct Region {
    id: String,
    data: RegionData,
    shapes: Vec<Shape>,
    bounds: Aabb2,
    z: ZBand,
    skip: bool,
}

impl Region {
    /// Materialize a region from its raw data.
    pub(crate) fn materialize(id: String, data: RegionData) -> Self {
        let shapes: Vec<Shape> = data.shapes.iter().filter_map(Shape::build).collect();

        let mut bounds = Aabb2::empty();
        for shape in &shapes {
            bounds.include_box(&shape.bounding_box());
        }

        let z = ZBand::from_elevation(data.elevation, data.height.unwrap_or(f64::INFINITY));

        let degenerate = shapes.is_empty() || bounds.is_degenerate() || z.is_degenerate();
        let skip = degenerate || Self::inert(&data);

        Self {
            id,
            data,
            shapes,
            bounds,
            z,
            skip,
        }
    }

    /// A region is inert when, given its mode and limits, it cannot alter
    /// any combined cost: `Sum`/`Min` with every limit unlimited, or `Max`
    /// with every limit zero. `Set` always has an effect.
    fn inert(data: &RegionData) -> bool {
        match data.mode {
            CombineMode::Sum | CombineMode::Min => {
                data.limits.values().all(|l| l.is_infinite())
            }
            CombineMode::Max => data.limits.values().all(|&l| l == 0.0),
            CombineMode::Set => false,
        }
    }

    /// The externally assigned identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw region data.
    pub fn data(&self) -> &RegionData {
        &self.data
    }

    /// The built shapes (degenerate descriptors were dropped).
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Union of the shapes' bounding boxes.
    pub fn bounds(&self) -> &Aabb2 {
        &self.bounds
    }

    /// The vertical interval the region occupies.
    pub fn z_band(&self) -> &ZBand {
        &self.z
    }

    /// True when the region can contribute nothing to any ray caster.
    pub fn skip(&self) -> bool {
        self.skip
    }

    /// Per-unit-distance cost this region imposes on `sense`.
    ///
    /// `1 / limit`, with `1/∞ = 0`. A sense absent from `limits` is
    /// unaffected, which for `Sum`/`Set`/`Min` is cost 0 and for `Max`
    /// (a clearing that can only lower cost) is the neutral `∞`.
    pub fn cost_for(&self, sense: &str) -> f64 {
        match self.data.limits.get(sense) {
            Some(&limit) => {
                if limit.is_infinite() {
                    0.0
                } else if limit <= 0.0 {
                    f64::INFINITY
                } else {
                    1.0 / limit
                }
            }
            None => match self.data.mode {
                CombineMode::Max => f64::INFINITY,
                _ => 0.0,
            },
        }
    }
}
