//! Texture-masked rectangle: sphere-traced signed distance field.

use crate::{RayHit, TileMask};
use sensecast_field::DistanceField;
use sensecast_math::{quantize, Aabb2, Affine2, Point2, Vec2, ALMOST_ZERO};

/// Minimum marching step in pixels; also the floor under sphere-trace steps
/// so degenerate field values cannot stall the march.
const MIN_STEP: f64 = 0.25;

/// A rectangle whose opaque area is defined by a pixel mask.
///
/// The mask is preprocessed into a signed distance field; boundary crossings
/// are found by sphere tracing in the rectangle's local pixel space, flipping
/// inside/outside parity whenever the signed distance changes sign. The
/// shrunk field guarantees no step overshoots a boundary, giving sub-pixel
/// crossings without visiting every pixel.
#[derive(Debug, Clone)]
pub struct TileShape {
    mask: i32,
    bounds: Aabb2,
    /// World space to mask pixel space `[0,w] x [0,h]`.
    to_pixels: Affine2,
    field: DistanceField,
}

impl TileShape {
    /// Build a tile; `rotation` is degrees about the rectangle center.
    ///
    /// Returns `None` for non-positive extents or an empty/mismatched mask.
    pub fn build(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation: f64,
        tile_mask: &TileMask,
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

        let field = DistanceField::from_mask(
            tile_mask.width,
            tile_mask.height,
            &tile_mask.pixels,
            tile_mask.threshold,
        )?;

        let angle = rotation.to_radians();
        let cx = x + width / 2.0;
        let cy = y + height / 2.0;
        let (mw, mh) = (field.width() as f64, field.height() as f64);

        // Pixel space -> world: normalize, scale to rect, center, rotate, place.
        let from_pixels = Affine2::scale(width / mw, height / mh)
            .then(&Affine2::translation(-width / 2.0, -height / 2.0))
            .then(&Affine2::rotation(angle))
            .then(&Affine2::translation(cx, cy));
        let to_pixels = from_pixels.inverse()?;

        let mut bounds = Aabb2::empty();
        for corner in [(0.0, 0.0), (mw, 0.0), (mw, mh), (0.0, mh)] {
            bounds.include_point(&from_pixels.apply_point(&Point2::new(corner.0, corner.1)));
        }

        Some(Self {
            mask,
            bounds,
            to_pixels,
            field,
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

    /// True only if the opaque mask area fully covers `bounds`.
    ///
    /// Conservative: answers `true` only when the signed distance at the box
    /// center is negative by at least the box circumradius (in pixels), which
    /// guarantees coverage without scanning texels underneath the box.
    pub fn contains_bounds(&self, bounds: &Aabb2) -> bool {
        let center = Point2::new(
            (bounds.min.x + bounds.max.x) / 2.0,
            (bounds.min.y + bounds.max.y) / 2.0,
        );
        let pc = self.to_pixels.apply_point(&center);
        let d = self.field.sample(pc.x, pc.y);
        if d >= 0.0 {
            return false;
        }
        let radius = [
            (bounds.min.x, bounds.min.y),
            (bounds.max.x, bounds.min.y),
            (bounds.max.x, bounds.max.y),
            (bounds.min.x, bounds.max.y),
        ]
        .iter()
        .map(|&(px, py)| {
            let p = self.to_pixels.apply_point(&Point2::new(px, py));
            (p - pc).norm()
        })
        .fold(0.0f64, f64::max);
        // The shrunk field under-reports by up to 1 pixel, never over.
        -d >= radius
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
        let o = self.to_pixels.apply_point(&Point2::new(ox, oy));
        let v = self.to_pixels.apply_vec(&Vec2::new(vx, vy));
        let (mw, mh) = (self.field.width() as f64, self.field.height() as f64);

        // Clip the line to the rectangle in pixel space.
        let Some((t0, t1)) = pixel_slab_interval(o, v, mw, mh) else {
            return 0;
        };

        let sample_at = |t: f64| self.field.sample(o.x + t * v.x, o.y + t * v.y);

        let origin_inside = t0 <= 0.0 && t1 >= 0.0 && sample_at(0.0) < 0.0;
        let inside_state = if origin_inside { self.mask } else { 0 };

        let Some(queue) = queue else {
            return inside_state;
        };

        let speed = v.norm();
        if speed < ALMOST_ZERO {
            return inside_state;
        }

        let t_start = t0.max(0.0);
        let t_end = t1.min(1.0);
        if t_start >= t_end {
            return inside_state;
        }

        // Sphere trace: advance by the (safe) unsigned field value, flipping
        // parity whenever the sign disagrees with the tracked state.
        let mut inside = if t_start == 0.0 {
            origin_inside
        } else {
            false
        };
        let mut t = t_start;
        while t < t_end {
            let d = sample_at(t);
            if (d < 0.0) != inside {
                if t > 0.0 && t < 1.0 {
                    queue.push(RayHit {
                        time: t,
                        volume,
                        mask: self.mask,
                    });
                }
                inside = !inside;
                continue;
            }
            t += d.abs().max(MIN_STEP) / speed;
        }

        // Leaving the rectangle while still inside the mask crosses the
        // shape boundary at the rectangle edge.
        if inside && t1 < 1.0 && t1 > 0.0 {
            queue.push(RayHit {
                time: t1,
                volume,
                mask: self.mask,
            });
        }

        inside_state
    }
}

/// Slab interval of the line `o + t*v` against `[0,w] x [0,h]`.
fn pixel_slab_interval(o: Point2, v: Vec2, w: f64, h: f64) -> Option<(f64, f64)> {
    let mut t0 = f64::NEG_INFINITY;
    let mut t1 = f64::INFINITY;

    for (p, d, hi) in [(o.x, v.x, w), (o.y, v.y, h)] {
        if d.abs() < ALMOST_ZERO {
            if p < 0.0 || p > hi {
                return None;
            }
            continue;
        }
        let a = -p / d;
        let b = (hi - p) / d;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }

    if t0 > t1 {
        return None;
    }
    Some((t0, t1))
}
