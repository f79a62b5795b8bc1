//! Rotated rectangle: slab intersection in unit-square space.

use crate::RayHit;
use sensecast_math::{quantize, Aabb2, Affine2, Point2, Vec2, ALMOST_ZERO};

/// A rectangle with arbitrary position, size, and rotation.
///
/// Rays are inverse-affine-transformed into the rectangle's unit square and
/// intersected with two axis-aligned slabs.
#[derive(Debug, Clone)]
pub struct RectShape {
    mask: i32,
    bounds: Aabb2,
    /// World space to the unit square `[0,1] x [0,1]`.
    to_unit: Affine2,
}

impl RectShape {
    /// Build a rectangle; `rotation` is degrees about the center.
    ///
    /// Returns `None` when width or height is not positive.
    pub fn build(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation: f64,
        mask: i32,
    ) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let x = quantize(x);
        let y = quantize(y);
        let width = quantize(width);
        let height = quantize(height);
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let angle = rotation.to_radians();
        let cx = x + width / 2.0;
        let cy = y + height / 2.0;

        // Unit square -> world: scale up, center, rotate, translate.
        let from_unit = Affine2::scale(width, height)
            .then(&Affine2::translation(-width / 2.0, -height / 2.0))
            .then(&Affine2::rotation(angle))
            .then(&Affine2::translation(cx, cy));
        let to_unit = from_unit.inverse()?;

        let mut bounds = Aabb2::empty();
        for corner in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            bounds.include_point(&from_unit.apply_point(&Point2::new(corner.0, corner.1)));
        }

        Some(Self {
            mask,
            bounds,
            to_unit,
        })
    }

    /// The 31-bit mask this shape toggles.
    pub fn mask(&self) -> i32 {
        self.mask
    }

    /// Axis-aligned bounding box.
    pub fn bounding_box(&self) -> Aabb2 {
        self.bounds
    }

    /// True only if the rectangle fully covers `bounds`.
    pub fn contains_bounds(&self, bounds: &Aabb2) -> bool {
        // The rectangle is convex: covering all four corners covers the box.
        [
            (bounds.min.x, bounds.min.y),
            (bounds.max.x, bounds.min.y),
            (bounds.max.x, bounds.max.y),
            (bounds.min.x, bounds.max.y),
        ]
        .iter()
        .all(|&(px, py)| {
            let p = self.to_unit.apply_point(&Point2::new(px, py));
            (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)
        })
    }

    /// Origin containment and boundary crossings; see [`crate::Shape::compute_hits`].
    pub fn compute_hits(
        &self,
        ox: f64,
        oy: f64,
        vx: f64,
        vy: f64,
        queue: Option<&mut Vec<RayHit>>,
        volume: i32,
    ) -> i32 {
        let o = self.to_unit.apply_point(&Point2::new(ox, oy));
        let v = self.to_unit.apply_vec(&Vec2::new(vx, vy));

        let Some((t0, t1)) = unit_slab_interval(o, v) else {
            return 0;
        };

        let inside = t0 <= 0.0 && t1 >= 0.0;
        if let Some(queue) = queue {
            for t in [t0, t1] {
                if t > 0.0 && t < 1.0 {
                    queue.push(RayHit {
                        time: t,
                        volume,
                        mask: self.mask,
                    });
                }
            }
        }
        if inside {
            self.mask
        } else {
            0
        }
    }
}

/// Intersect the line `o + t * v` with the unit square via two slabs.
///
/// Returns the entry/exit parameters over the full line, or `None` when the
/// line misses the square entirely (including zero-velocity rays whose
/// origin lies outside).
pub(crate) fn unit_slab_interval(o: Point2, v: Vec2) -> Option<(f64, f64)> {
    let mut t0 = f64::NEG_INFINITY;
    let mut t1 = f64::INFINITY;

    for (p, d) in [(o.x, v.x), (o.y, v.y)] {
        if d.abs() < ALMOST_ZERO {
            if !(0.0..=1.0).contains(&p) {
                return None;
            }
            continue;
        }
        let a = -p / d;
        let b = (1.0 - p) / d;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }

    if t0 > t1 {
        return None;
    }
    Some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_rect() -> RectShape {
        RectShape::build(0.0, 0.0, 10.0, 10.0, 0.0, 1).unwrap()
    }

    #[test]
    fn test_origin_inside() {
        let rect = axis_rect();
        let state = rect.compute_hits(5.0, 5.0, 0.0, 0.0, None, 0);
        assert_eq!(state, 1);
        let state = rect.compute_hits(15.0, 5.0, 0.0, 0.0, None, 0);
        assert_eq!(state, 0);
    }

    #[test]
    fn test_crossing_through() {
        let rect = axis_rect();
        let mut hits = Vec::new();
        // From (-5, 5) to (15, 5): enters at t=0.25, exits at t=0.75
        let state = rect.compute_hits(-5.0, 5.0, 20.0, 0.0, Some(&mut hits), 7);
        assert_eq!(state, 0);
        assert_eq!(hits.len(), 2);
        hits.sort();
        assert!((hits[0].time - 0.25).abs() < 1e-12);
        assert!((hits[1].time - 0.75).abs() < 1e-12);
        assert_eq!(hits[0].volume, 7);
        assert_eq!(hits[0].mask, 1);
    }

    #[test]
    fn test_exit_only_from_inside() {
        let rect = axis_rect();
        let mut hits = Vec::new();
        // From center to well outside: one exit crossing
        let state = rect.compute_hits(5.0, 5.0, 10.0, 0.0, Some(&mut hits), 0);
        assert_eq!(state, 1);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_segment_fully_inside() {
        let rect = axis_rect();
        let mut hits = Vec::new();
        let state = rect.compute_hits(2.0, 2.0, 4.0, 4.0, Some(&mut hits), 0);
        assert_eq!(state, 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_miss() {
        let rect = axis_rect();
        let mut hits = Vec::new();
        let state = rect.compute_hits(-5.0, 20.0, 20.0, 0.0, Some(&mut hits), 0);
        assert_eq!(state, 0);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_rotated_rect_bounds() {
        // 10x10 rect rotated 45 degrees: bounds grow to ~14.14 across
        let rect = RectShape::build(0.0, 0.0, 10.0, 10.0, 45.0, 1).unwrap();
        let b = rect.bounding_box();
        let half = 5.0 * std::f64::consts::SQRT_2;
        assert!((b.min.x - (5.0 - half)).abs() < 1e-9);
        assert!((b.max.x - (5.0 + half)).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_rect_containment() {
        let rect = RectShape::build(0.0, 0.0, 10.0, 10.0, 45.0, 1).unwrap();
        // Center is inside regardless of rotation
        assert_eq!(rect.compute_hits(5.0, 5.0, 0.0, 0.0, None, 0), 1);
        // The original corner is outside once rotated
        assert_eq!(rect.compute_hits(0.1, 0.1, 0.0, 0.0, None, 0), 0);
    }

    #[test]
    fn test_contains_bounds() {
        let rect = axis_rect();
        let inner = Aabb2::new(Point2::new(2.0, 2.0), Point2::new(8.0, 8.0));
        assert!(rect.contains_bounds(&inner));
        let crossing = Aabb2::new(Point2::new(5.0, 5.0), Point2::new(15.0, 8.0));
        assert!(!rect.contains_bounds(&crossing));
    }

    #[test]
    fn test_parallel_ray_outside_slab() {
        let rect = axis_rect();
        let mut hits = Vec::new();
        // Horizontal ray above the rect: y slab rejects it
        let state = rect.compute_hits(-5.0, 12.0, 20.0, 0.0, Some(&mut hits), 0);
        assert_eq!(state, 0);
        assert!(hits.is_empty());
    }
}
