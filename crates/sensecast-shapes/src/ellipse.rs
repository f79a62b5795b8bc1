//! Rotated ellipse: quadratic intersection in unit-circle space.

use crate::RayHit;
use sensecast_math::{quantize, Aabb2, Affine2, Point2, Vec2, ALMOST_ZERO};

/// An ellipse with arbitrary center, semi-axes, and rotation.
///
/// Rays are inverse-affine-transformed into the ellipse's unit circle where
/// the intersection is a degree-2 solve.
#[derive(Debug, Clone)]
pub struct EllipseShape {
    mask: i32,
    bounds: Aabb2,
    /// World space to the unit circle.
    to_unit: Affine2,
}

impl EllipseShape {
    /// Build an ellipse; `rotation` is degrees about the center.
    ///
    /// Returns `None` when either radius is not positive.
    pub fn build(
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        mask: i32,
    ) -> Option<Self> {
        if radius_x <= 0.0 || radius_y <= 0.0 {
            return None;
        }
        let cx = quantize(x);
        let cy = quantize(y);
        let rx = quantize(radius_x);
        let ry = quantize(radius_y);
        if rx <= 0.0 || ry <= 0.0 {
            return None;
        }
        let angle = rotation.to_radians();

        let from_unit = Affine2::scale(rx, ry)
            .then(&Affine2::rotation(angle))
            .then(&Affine2::translation(cx, cy));
        let to_unit = from_unit.inverse()?;

        // Extents of a rotated ellipse along each world axis.
        let (s, c) = angle.sin_cos();
        let ex = ((rx * c) * (rx * c) + (ry * s) * (ry * s)).sqrt();
        let ey = ((rx * s) * (rx * s) + (ry * c) * (ry * c)).sqrt();
        let bounds = Aabb2::new(Point2::new(cx - ex, cy - ey), Point2::new(cx + ex, cy + ey));

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

    /// True only if the ellipse fully covers `bounds`.
    pub fn contains_bounds(&self, bounds: &Aabb2) -> bool {
        // Convexity: all four corners inside the unit circle suffices.
        [
            (bounds.min.x, bounds.min.y),
            (bounds.max.x, bounds.min.y),
            (bounds.max.x, bounds.max.y),
            (bounds.min.x, bounds.max.y),
        ]
        .iter()
        .all(|&(px, py)| {
            let p = self.to_unit.apply_point(&Point2::new(px, py));
            p.x * p.x + p.y * p.y <= 1.0
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

        // Quadratic: |o + t*v|^2 = 1
        let a = v.x * v.x + v.y * v.y;
        let b = o.x * v.x + o.y * v.y;
        let c = o.x * o.x + o.y * o.y - 1.0;

        let inside_state = if c <= 0.0 { self.mask } else { 0 };

        if a < ALMOST_ZERO {
            // Zero-velocity ray in local space: pure containment.
            return inside_state;
        }

        // Half-coefficient discriminant; tangent rays (b^2 ~ a*c) produce
        // no crossing.
        let disc = b * b - a * c;
        if disc <= 0.0 {
            return inside_state;
        }

        if let Some(queue) = queue {
            let sqrt_disc = disc.sqrt();
            for t in [(-b - sqrt_disc) / a, (-b + sqrt_disc) / a] {
                if t > 0.0 && t < 1.0 {
                    queue.push(RayHit {
                        time: t,
                        volume,
                        mask: self.mask,
                    });
                }
            }
        }
        inside_state
    }
}
