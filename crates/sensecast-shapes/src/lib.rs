#![warn(missing_docs)]

//! Shape primitives for the sensecast ray-casting kernel.
//!
//! Four shape kinds share one contract: a bounding box, a "does this shape
//! fully cover a box" test used for pruning, and ray/boundary crossing
//! computation. Shapes are immutable once built, carry precomputed transform
//! data, and tag every crossing with a 31-bit mask so that XOR parity over
//! the shapes containing a point decides region membership (holes use
//! distinguishing mask bits).
//!
//! - [`RectShape`] — rotated rectangle, slab intersection in unit-square space
//! - [`EllipseShape`] — quadratic intersection in unit-circle space
//! - [`PolygonShape`] — even-odd containment, per-edge segment intersection
//! - [`TileShape`] — texture-masked rectangle, sphere-traced distance field

mod ellipse;
mod polygon;
mod rect;
mod tile;

pub use ellipse::EllipseShape;
pub use polygon::PolygonShape;
pub use rect::RectShape;
pub use tile::TileShape;

use sensecast_math::Aabb2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One event inside a single cast: a shape-boundary crossing, or (in the
/// caster) a sense exhaustion.
///
/// Ordered by time with a `(volume, mask)` tie-break so that equal-time
/// events pop from a heap in a defined order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the event, in `[0, 1)`.
    pub time: f64,
    /// Index of the volume the event belongs to; negative values are
    /// reserved for non-shape events.
    pub volume: i32,
    /// Mask bits of the crossed shape, or a sentinel payload.
    pub mask: i32,
}

impl Eq for RayHit {}

impl Ord for RayHit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.volume.cmp(&other.volume))
            .then(self.mask.cmp(&other.mask))
    }
}

impl PartialOrd for RayHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pixel mask payload for a [`TileShape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMask {
    /// Mask width in pixels.
    pub width: usize,
    /// Mask height in pixels.
    pub height: usize,
    /// Row-major pixel values, `width * height` entries.
    pub pixels: Vec<u8>,
    /// A pixel is opaque when its value is strictly greater than this.
    #[serde(default)]
    pub threshold: u8,
}

/// Declarative shape description supplied by the host integration layer.
///
/// Geometry is given in scene units; rotations are degrees about the shape
/// center. `mask_bit` selects which of the 31 mask bits the shape toggles
/// (bit 0 when omitted), letting shapes punch holes in one another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeDescriptor {
    /// Rotated rectangle.
    Rect {
        /// Left edge before rotation.
        x: f64,
        /// Top edge before rotation.
        y: f64,
        /// Width (must be positive).
        width: f64,
        /// Height (must be positive).
        height: f64,
        /// Rotation in degrees about the center.
        #[serde(default)]
        rotation: f64,
        /// Mask bit index in `0..=30`.
        #[serde(default)]
        mask_bit: Option<u8>,
    },
    /// Rotated ellipse.
    Ellipse {
        /// Center x.
        x: f64,
        /// Center y.
        y: f64,
        /// Semi-axis along local x (must be positive).
        radius_x: f64,
        /// Semi-axis along local y (must be positive).
        radius_y: f64,
        /// Rotation in degrees about the center.
        #[serde(default)]
        rotation: f64,
        /// Mask bit index in `0..=30`.
        #[serde(default)]
        mask_bit: Option<u8>,
    },
    /// Simple polygon (at least 3 vertices).
    Polygon {
        /// Vertices in order; the boundary closes implicitly.
        points: Vec<[f64; 2]>,
        /// Mask bit index in `0..=30`.
        #[serde(default)]
        mask_bit: Option<u8>,
    },
    /// Texture-masked rectangle.
    Tile {
        /// Left edge before rotation.
        x: f64,
        /// Top edge before rotation.
        y: f64,
        /// Width (must be positive).
        width: f64,
        /// Height (must be positive).
        height: f64,
        /// Rotation in degrees about the center.
        #[serde(default)]
        rotation: f64,
        /// Pixel mask defining the opaque area.
        mask: TileMask,
        /// Mask bit index in `0..=30`.
        #[serde(default)]
        mask_bit: Option<u8>,
    },
}

/// A built shape primitive.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Rotated rectangle.
    Rect(RectShape),
    /// Rotated ellipse.
    Ellipse(EllipseShape),
    /// Simple polygon.
    Polygon(PolygonShape),
    /// Texture-masked rectangle.
    Tile(TileShape),
}

impl Shape {
    /// Build a shape from its descriptor.
    ///
    /// Degenerate input (non-positive extents, fewer than 3 polygon
    /// vertices, an empty or mismatched tile mask, a mask bit above 30) is
    /// rejected by returning `None` — a missing shape is always a valid
    /// outcome.
    pub fn build(descriptor: &ShapeDescriptor) -> Option<Shape> {
        match descriptor {
            ShapeDescriptor::Rect {
                x,
                y,
                width,
                height,
                rotation,
                mask_bit,
            } => {
                let mask = mask_from_bit(*mask_bit)?;
                RectShape::build(*x, *y, *width, *height, *rotation, mask).map(Shape::Rect)
            }
            ShapeDescriptor::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
                rotation,
                mask_bit,
            } => {
                let mask = mask_from_bit(*mask_bit)?;
                EllipseShape::build(*x, *y, *radius_x, *radius_y, *rotation, mask)
                    .map(Shape::Ellipse)
            }
            ShapeDescriptor::Polygon { points, mask_bit } => {
                let mask = mask_from_bit(*mask_bit)?;
                PolygonShape::build(points, mask).map(Shape::Polygon)
            }
            ShapeDescriptor::Tile {
                x,
                y,
                width,
                height,
                rotation,
                mask,
                mask_bit,
            } => {
                let bit_mask = mask_from_bit(*mask_bit)?;
                TileShape::build(*x, *y, *width, *height, *rotation, mask, bit_mask)
                    .map(Shape::Tile)
            }
        }
    }

    /// The 31-bit mask this shape toggles.
    pub fn mask(&self) -> i32 {
        match self {
            Shape::Rect(s) => s.mask(),
            Shape::Ellipse(s) => s.mask(),
            Shape::Polygon(s) => s.mask(),
            Shape::Tile(s) => s.mask(),
        }
    }

    /// Axis-aligned bounding box of the shape.
    pub fn bounding_box(&self) -> Aabb2 {
        match self {
            Shape::Rect(s) => s.bounding_box(),
            Shape::Ellipse(s) => s.bounding_box(),
            Shape::Polygon(s) => s.bounding_box(),
            Shape::Tile(s) => s.bounding_box(),
        }
    }

    /// True only if the shape fully covers `bounds`.
    ///
    /// Used for volume pruning, not hit testing; a conservative `false` is
    /// always safe.
    pub fn contains_bounds(&self, bounds: &Aabb2) -> bool {
        match self {
            Shape::Rect(s) => s.contains_bounds(bounds),
            Shape::Ellipse(s) => s.contains_bounds(bounds),
            Shape::Polygon(s) => s.contains_bounds(bounds),
            Shape::Tile(s) => s.contains_bounds(bounds),
        }
    }

    /// Evaluate the ray segment `origin + t * velocity`, `t` in `[0, 1]`.
    ///
    /// Returns the shape's mask if the origin lies inside, else 0. When a
    /// queue is supplied, appends one [`RayHit`] per boundary crossing with
    /// time strictly inside `(0, 1)`, tagged `volume`.
    pub fn compute_hits(
        &self,
        ox: f64,
        oy: f64,
        vx: f64,
        vy: f64,
        queue: Option<&mut Vec<RayHit>>,
        volume: i32,
    ) -> i32 {
        match self {
            Shape::Rect(s) => s.compute_hits(ox, oy, vx, vy, queue, volume),
            Shape::Ellipse(s) => s.compute_hits(ox, oy, vx, vy, queue, volume),
            Shape::Polygon(s) => s.compute_hits(ox, oy, vx, vy, queue, volume),
            Shape::Tile(s) => s.compute_hits(ox, oy, vx, vy, queue, volume),
        }
    }
}

fn mask_from_bit(bit: Option<u8>) -> Option<i32> {
    let bit = bit.unwrap_or(0);
    if bit > 30 {
        return None;
    }
    Some(1 << bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_roundtrip() {
        let desc = ShapeDescriptor::Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
            rotation: 45.0,
            mask_bit: Some(2),
        };
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("\"type\":\"Rect\""));
        let back: ShapeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_descriptor_defaults() {
        let desc: ShapeDescriptor =
            serde_json::from_str(r#"{"type":"Ellipse","x":0,"y":0,"radius_x":2,"radius_y":1}"#)
                .unwrap();
        let shape = Shape::build(&desc).unwrap();
        assert_eq!(shape.mask(), 1);
    }

    #[test]
    fn test_build_rejects_degenerate() {
        let zero_width = ShapeDescriptor::Rect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 5.0,
            rotation: 0.0,
            mask_bit: None,
        };
        assert!(Shape::build(&zero_width).is_none());

        let two_points = ShapeDescriptor::Polygon {
            points: vec![[0.0, 0.0], [1.0, 1.0]],
            mask_bit: None,
        };
        assert!(Shape::build(&two_points).is_none());

        let bad_bit = ShapeDescriptor::Ellipse {
            x: 0.0,
            y: 0.0,
            radius_x: 1.0,
            radius_y: 1.0,
            rotation: 0.0,
            mask_bit: Some(31),
        };
        assert!(Shape::build(&bad_bit).is_none());
    }

    #[test]
    fn test_ray_hit_ordering() {
        let a = RayHit {
            time: 0.25,
            volume: 3,
            mask: 1,
        };
        let b = RayHit {
            time: 0.25,
            volume: 1,
            mask: 1,
        };
        let c = RayHit {
            time: 0.1,
            volume: 9,
            mask: 1,
        };
        let mut hits = vec![a, b, c];
        hits.sort();
        assert_eq!(hits[0], c);
        assert_eq!(hits[1], b);
        assert_eq!(hits[2], a);
    }
}
