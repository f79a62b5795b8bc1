//! Simple polygon: even-odd containment and per-edge crossing events.

use crate::RayHit;
use sensecast_math::{quantize, Aabb2, Point2, ALMOST_ZERO};

/// A simple polygon with at least three vertices.
///
/// Containment uses the even-odd crossing-number rule; boundary crossings
/// solve a ray/segment intersection per edge with a half-open side rule at
/// shared vertices so the crossing parity always agrees with the containment
/// test, vertex hits included.
#[derive(Debug, Clone)]
pub struct PolygonShape {
    mask: i32,
    points: Vec<Point2>,
    bounds: Aabb2,
}

impl PolygonShape {
    /// Build a polygon from its vertex list.
    ///
    /// Returns `None` with fewer than 3 vertices or a degenerate (zero-area
    /// bounding box) outline.
    pub fn build(points: &[[f64; 2]], mask: i32) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let points: Vec<Point2> = points
            .iter()
            .map(|p| Point2::new(quantize(p[0]), quantize(p[1])))
            .collect();

        let mut bounds = Aabb2::empty();
        for p in &points {
            bounds.include_point(p);
        }
        if bounds.is_degenerate() {
            return None;
        }

        Some(Self {
            mask,
            points,
            bounds,
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

    /// Even-odd containment test.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        let n = self.points.len();
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            // Half-open on y: each horizontal level is owned by exactly one
            // of two edges meeting at a shared vertex.
            if (p1.y > y) != (p2.y > y) {
                let x_cross = p1.x + (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True only if the polygon fully covers `bounds`.
    pub fn contains_bounds(&self, bounds: &Aabb2) -> bool {
        // All four corners inside, and no edge passing through the box.
        // (A concave polygon could contain every corner yet cut the box.)
        let corners = [
            (bounds.min.x, bounds.min.y),
            (bounds.max.x, bounds.min.y),
            (bounds.max.x, bounds.max.y),
            (bounds.min.x, bounds.max.y),
        ];
        if !corners.iter().all(|&(x, y)| self.contains_point(x, y)) {
            return false;
        }

        let n = self.points.len();
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            if segment_intersects_box(p1, p2, bounds) {
                return false;
            }
        }
        true
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
        let inside_state = if self.contains_point(ox, oy) {
            self.mask
        } else {
            0
        };

        let Some(queue) = queue else {
            return inside_state;
        };
        if vx.abs() < ALMOST_ZERO && vy.abs() < ALMOST_ZERO {
            return inside_state;
        }

        let n = self.points.len();
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];

            // Same half-open rule as contains_point, generalized to the ray
            // line: an edge is crossed only when its endpoints straddle the
            // line, with points exactly on the line assigned to the
            // non-positive side. A vertex graze then counts on both adjacent
            // edges or on neither, so the crossing parity of an
            // outside-to-outside ray stays even.
            let side1 = vx * (p1.y - oy) - vy * (p1.x - ox) > 0.0;
            let side2 = vx * (p2.y - oy) - vy * (p2.x - ox) > 0.0;
            if side1 == side2 {
                continue;
            }

            let ex = p2.x - p1.x;
            let ey = p2.y - p1.y;

            // Solve o + t*v = p1 + s*e
            let denom = vx * ey - vy * ex;
            if denom.abs() < ALMOST_ZERO {
                continue;
            }
            let dx = p1.x - ox;
            let dy = p1.y - oy;
            let t = (dx * ey - dy * ex) / denom;

            if t > 0.0 && t < 1.0 {
                queue.push(RayHit {
                    time: t,
                    volume,
                    mask: self.mask,
                });
            }
        }
        inside_state
    }
}

/// Does the segment `p1 -> p2` pass through the box?
fn segment_intersects_box(p1: Point2, p2: Point2, bounds: &Aabb2) -> bool {
    let vx = p2.x - p1.x;
    let vy = p2.y - p1.y;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, d, lo, hi) in [
        (p1.x, vx, bounds.min.x, bounds.max.x),
        (p1.y, vy, bounds.min.y, bounds.max.y),
    ] {
        if d.abs() < ALMOST_ZERO {
            if p < lo || p > hi {
                return false;
            }
            continue;
        }
        let a = (lo - p) / d;
        let b = (hi - p) / d;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    t0 <= t1
}
