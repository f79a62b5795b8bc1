#![warn(missing_docs)]

//! Math types for the sensecast ray-casting kernel.
//!
//! Thin wrappers around nalgebra providing the planar/vertical types the
//! engine works in: 2D points and vectors for shape geometry, 3D points for
//! ray endpoints, axis-aligned boxes, vertical bands, and the coordinate
//! quantization and tolerance constants shared by every crate.

use nalgebra::{Vector2, Vector3};

/// A point in the 2D shape plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the 2D shape plane.
pub type Vec2 = Vector2<f64>;

/// A point in 3D space (ray endpoints carry an elevation).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Sub-unit grid resolution all stored coordinates are snapped to.
///
/// Quantizing to 1/256 keeps ray casting deterministic and avoids
/// numerical-adjacency artifacts from accumulated floating error.
pub const GRID_RESOLUTION: f64 = 256.0;

/// Threshold below which a cost or velocity component is treated as zero.
pub const ALMOST_ZERO: f64 = 1e-12;

/// Arrival times within this distance of 1 are snapped to exactly 1.
///
/// Tuned constant (0.99999 cutoff); avoids perpetual "just barely didn't
/// reach" artifacts from floating accumulation.
pub const TIME_SNAP: f64 = 1e-5;

/// Snap a coordinate to the 1/256 sub-unit grid.
#[inline]
pub fn quantize(v: f64) -> f64 {
    (v * GRID_RESOLUTION).round() / GRID_RESOLUTION
}

/// A 2D affine transform stored as six coefficients.
///
/// Maps `(x, y)` to `(a*x + c*y + tx, b*x + d*y + ty)`, the column-major
/// convention of a 3x3 homogeneous matrix with a dropped bottom row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    /// Matrix coefficient (0,0).
    pub a: f64,
    /// Matrix coefficient (1,0).
    pub b: f64,
    /// Matrix coefficient (0,1).
    pub c: f64,
    /// Matrix coefficient (1,1).
    pub d: f64,
    /// Translation x.
    pub tx: f64,
    /// Translation y.
    pub ty: f64,
}

impl Affine2 {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            tx: dx,
            ty: dy,
            ..Self::identity()
        }
    }

    /// Rotation about the origin by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            a: c,
            b: s,
            c: -s,
            d: c,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Non-uniform scale by `(sx, sy)`.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// Compose: apply `self` first, then `other`.
    pub fn then(&self, other: &Affine2) -> Self {
        Self {
            a: other.a * self.a + other.c * self.b,
            b: other.b * self.a + other.d * self.b,
            c: other.a * self.c + other.c * self.d,
            d: other.b * self.c + other.d * self.d,
            tx: other.a * self.tx + other.c * self.ty + other.tx,
            ty: other.b * self.tx + other.d * self.ty + other.ty,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point2) -> Point2 {
        Point2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Transform a vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < ALMOST_ZERO {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }
}

/// Axis-aligned bounding box in the 2D shape plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    /// Minimum corner.
    pub min: Point2,
    /// Maximum corner.
    pub max: Point2,
}

impl Aabb2 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Expand this AABB to include another AABB.
    pub fn include_box(&mut self, other: &Aabb2) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Test if this AABB fully contains another.
    pub fn contains_box(&self, other: &Aabb2) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Expand the AABB by a margin in all directions.
    pub fn expand(&mut self, margin: f64) {
        self.min.x -= margin;
        self.min.y -= margin;
        self.max.x += margin;
        self.max.y += margin;
    }

    /// Width of the box (zero or negative when empty/degenerate).
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box (zero or negative when empty/degenerate).
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Length of the box diagonal; zero for an empty box.
    pub fn diagonal(&self) -> f64 {
        if self.width() < 0.0 || self.height() < 0.0 {
            return 0.0;
        }
        self.width().hypot(self.height())
    }

    /// True when the box has zero (or inverted) extent along either axis.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// A vertical interval a region occupies; `top` may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZBand {
    /// Lower elevation bound (inclusive).
    pub bottom: f64,
    /// Upper elevation bound (inclusive); `f64::INFINITY` for unbounded.
    pub top: f64,
}

impl ZBand {
    /// Create a band from a base elevation and a (possibly infinite) height.
    pub fn from_elevation(elevation: f64, height: f64) -> Self {
        Self {
            bottom: elevation,
            top: if height.is_finite() {
                elevation + height
            } else {
                f64::INFINITY
            },
        }
    }

    /// The band covering every elevation.
    pub fn unbounded() -> Self {
        Self {
            bottom: f64::NEG_INFINITY,
            top: f64::INFINITY,
        }
    }

    /// Test if two bands overlap (touching counts).
    pub fn overlaps(&self, other: &ZBand) -> bool {
        self.bottom <= other.top && self.top >= other.bottom
    }

    /// Test if this band fully contains another.
    pub fn contains_band(&self, other: &ZBand) -> bool {
        self.bottom <= other.bottom && self.top >= other.top
    }

    /// Test if an elevation lies inside the band (inclusive).
    pub fn contains(&self, z: f64) -> bool {
        z >= self.bottom && z <= self.top
    }

    /// True when the band is empty (inverted bounds).
    pub fn is_degenerate(&self) -> bool {
        self.top < self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_grid() {
        assert_eq!(quantize(1.0), 1.0);
        assert_eq!(quantize(0.5), 0.5);
        // 1/512 rounds to 1/256 grid
        let q = quantize(0.001);
        assert!((q * GRID_RESOLUTION).fract().abs() < 1e-12);
        assert!((q - 0.001).abs() <= 0.5 / GRID_RESOLUTION);
    }

    #[test]
    fn test_affine_roundtrip() {
        use std::f64::consts::PI;
        let t = Affine2::translation(3.0, -2.0)
            .then(&Affine2::rotation(PI / 3.0))
            .then(&Affine2::scale(2.0, 0.5));
        let inv = t.inverse().unwrap();
        let p = Point2::new(1.5, -4.25);
        let back = inv.apply_point(&t.apply_point(&p));
        assert!((back - p).norm() < 1e-12);
    }

    #[test]
    fn test_affine_compose_order() {
        // translate then scale: (0,0) -> (1,0) -> (2,0)
        let t = Affine2::translation(1.0, 0.0).then(&Affine2::scale(2.0, 2.0));
        let r = t.apply_point(&Point2::new(0.0, 0.0));
        assert!((r.x - 2.0).abs() < 1e-12);
        assert!(r.y.abs() < 1e-12);
    }

    #[test]
    fn test_affine_degenerate_inverse() {
        assert!(Affine2::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let b = Aabb2::new(Point2::new(5.0, 5.0), Point2::new(15.0, 15.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = Aabb2::new(Point2::new(20.0, 20.0), Point2::new(30.0, 30.0));
        assert!(!a.overlaps(&c));

        // Touching counts
        let d = Aabb2::new(Point2::new(10.0, 0.0), Point2::new(20.0, 10.0));
        assert!(a.overlaps(&d));
    }

    #[test]
    fn test_aabb_contains_box() {
        let outer = Aabb2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let inner = Aabb2::new(Point2::new(2.0, 2.0), Point2::new(8.0, 8.0));
        assert!(outer.contains_box(&inner));
        assert!(!inner.contains_box(&outer));
        assert!(outer.contains_box(&outer));
    }

    #[test]
    fn test_aabb_include_and_diagonal() {
        let mut a = Aabb2::empty();
        assert!(a.is_degenerate());
        assert_eq!(a.diagonal(), 0.0);
        a.include_point(&Point2::new(0.0, 0.0));
        a.include_point(&Point2::new(3.0, 4.0));
        assert!((a.diagonal() - 5.0).abs() < 1e-12);
        assert!(!a.is_degenerate());
    }

    #[test]
    fn test_zband_from_elevation() {
        let band = ZBand::from_elevation(10.0, 5.0);
        assert!(band.contains(10.0));
        assert!(band.contains(15.0));
        assert!(!band.contains(15.1));

        let open = ZBand::from_elevation(0.0, f64::INFINITY);
        assert!(open.contains(1e9));
        assert!(!open.contains(-0.1));
    }

    #[test]
    fn test_zband_overlap() {
        let a = ZBand::from_elevation(0.0, 10.0);
        let b = ZBand::from_elevation(10.0, 10.0);
        let c = ZBand::from_elevation(20.5, 1.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(a.overlaps(&ZBand::unbounded()));
    }
}
