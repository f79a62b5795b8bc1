#![warn(missing_docs)]

//! Signed Euclidean distance fields for texture-masked shapes.
//!
//! A binary pixel mask is turned into a padded 2D grid of signed distances
//! to the mask boundary: positive outside the mask, negative inside. The
//! field is built from two independent squared-distance transforms (one with
//! the inside pixels as sources, one with the outside pixels) using the
//! classical Felzenszwalb–Huttenlocher two-pass lower-envelope-of-parabolas
//! algorithm, then conservatively shrunk so that sphere tracing against it
//! can never step past the true boundary.

/// A padded grid of signed Euclidean distances in pixel units.
///
/// The grid carries a 1-pixel border on every side so ray marching stays
/// well-defined at the mask edges. Distances are positive outside the mask
/// and negative inside.
#[derive(Debug, Clone)]
pub struct DistanceField {
    /// Mask width in pixels (without padding).
    width: usize,
    /// Mask height in pixels (without padding).
    height: usize,
    /// Row-major signed distances, `(width + 2) * (height + 2)` entries.
    data: Vec<f64>,
}

impl DistanceField {
    /// Build a signed distance field from a binary mask.
    ///
    /// A pixel is "inside" when its value is strictly greater than
    /// `threshold`. Returns `None` for an empty mask or a pixel buffer that
    /// does not match `width * height`.
    pub fn from_mask(width: usize, height: usize, pixels: &[u8], threshold: u8) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return None;
        }

        let pw = width + 2;
        let ph = height + 2;
        // Large finite stand-in for "no source here"; infinity would turn
        // the parabola intersections into NaN.
        const FAR: f64 = 1e20;
        let inside_at = |x: usize, y: usize| -> bool {
            // Padding border counts as outside.
            if x == 0 || y == 0 || x > width || y > height {
                return false;
            }
            pixels[(y - 1) * width + (x - 1)] > threshold
        };

        // Squared distance to the nearest inside pixel, and to the nearest
        // outside pixel, each over the padded grid.
        let mut to_inside = vec![0.0f64; pw * ph];
        let mut to_outside = vec![0.0f64; pw * ph];
        for y in 0..ph {
            for x in 0..pw {
                let inside = inside_at(x, y);
                to_inside[y * pw + x] = if inside { 0.0 } else { FAR };
                to_outside[y * pw + x] = if inside { FAR } else { 0.0 };
            }
        }
        squared_distance_transform(&mut to_inside, pw, ph);
        squared_distance_transform(&mut to_outside, pw, ph);

        let mut data = vec![0.0f64; pw * ph];
        for i in 0..pw * ph {
            let signed = to_inside[i].sqrt() - to_outside[i].sqrt();
            data[i] = shrink(signed);
        }

        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Mask width in pixels (without padding).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Mask height in pixels (without padding).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample the field at a continuous mask-space position.
    ///
    /// `(0, 0)` is the top-left corner of the first mask pixel; samples are
    /// taken from the pixel containing the position, clamped into the padded
    /// border, so sampling anywhere (even far outside) is defined.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let pw = self.width + 2;
        let ix = (x.floor() + 1.0).clamp(0.0, (self.width + 1) as f64) as usize;
        let iy = (y.floor() + 1.0).clamp(0.0, (self.height + 1) as f64) as usize;
        self.data[iy * pw + ix]
    }
}

/// Reduce a signed distance magnitude by up to 1 pixel, floored at 0.5.
///
/// Distances are measured between pixel centers while the real mask boundary
/// lies between pixels; stepping by the raw value could overshoot. Values
/// already below 0.5 are kept as-is.
fn shrink(signed: f64) -> f64 {
    let magnitude = signed.abs();
    let reduced = (magnitude - 1.0).max(magnitude.min(0.5));
    reduced.copysign(signed)
}

/// In-place 2D squared Euclidean distance transform.
///
/// Sources are cells holding 0.0; every other cell must hold `INFINITY`.
/// One 1D lower-envelope pass along each row, then along each column.
fn squared_distance_transform(grid: &mut [f64], width: usize, height: usize) {
    let n = width.max(height);
    let mut f = vec![0.0f64; n];
    let mut d = vec![0.0f64; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];

    for y in 0..height {
        let row = &mut grid[y * width..(y + 1) * width];
        f[..width].copy_from_slice(row);
        transform_1d(&f[..width], &mut d[..width], &mut v[..width], &mut z[..width + 1]);
        row.copy_from_slice(&d[..width]);
    }

    for x in 0..width {
        for y in 0..height {
            f[y] = grid[y * width + x];
        }
        transform_1d(&f[..height], &mut d[..height], &mut v[..height], &mut z[..height + 1]);
        for y in 0..height {
            grid[y * width + x] = d[y];
        }
    }
}

/// 1D squared distance transform (lower envelope of parabolas).
///
/// `f` is the sampled function, `d` receives the transform; `v` and `z` are
/// scratch for the parabola-vertex stack and intersection abscissae.
fn transform_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    // Intersection abscissa of the parabolas rooted at q and p.
    let intersect = |q: usize, p: usize| -> f64 {
        ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2 * q - 2 * p) as f64
    };

    let n = f.len();
    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for q in 0..n {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dx = q as f64 - p as f64;
        d[q] = dx * dx + f[p];
    }
}
