//! The ray caster: construction-time filtering and bounds, per-cast sweeps.

use crate::sense::{normalize, Sense};
use crate::volume::{prune_volumes, Volume};
use crate::SENSE_EXHAUSTED;
use sensecast_math::{quantize, Aabb2, Point2, Point3, ZBand, ALMOST_ZERO, TIME_SNAP};
use sensecast_region::{CombineMode, Region};
use sensecast_shapes::RayHit;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Event mask marking a vertical entry/exit of a volume rather than a
/// shape-boundary crossing. Shape masks are always non-zero.
const Z_TOGGLE: i32 = 0;

/// The spatial window a ray caster is restricted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Planar crop.
    pub bounds: Aabb2,
    /// Vertical crop.
    pub z: ZBand,
}

impl Window {
    /// A window with explicit planar and vertical crops.
    pub fn new(bounds: Aabb2, z: ZBand) -> Self {
        Self { bounds, z }
    }

    /// The window covering all of space.
    pub fn unbounded() -> Self {
        Self {
            bounds: Aabb2::new(
                Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
                Point2::new(f64::INFINITY, f64::INFINITY),
            ),
            z: ZBand::unbounded(),
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Per-volume sweep state.
struct VolumeState {
    /// XOR of the masks of shapes currently containing the ray point;
    /// non-zero means planar-inside.
    mask_state: i32,
    /// Is the ray's elevation currently inside the volume's band?
    z_inside: bool,
    /// False when the volume can never enclose any point of this ray.
    participating: bool,
}

impl VolumeState {
    fn inside(&self) -> bool {
        self.participating && self.mask_state != 0 && self.z_inside
    }
}

/// Casts rays through a snapshot of active regions.
///
/// Built once per distinct (sense set, window) pair — construction cost is
/// non-trivial (volume filtering, pruning, bounds estimation) — then
/// queried repeatedly via [`set_origin`](Self::set_origin) /
/// [`set_target`](Self::set_target) / [`cast`](Self::cast), or statelessly
/// via [`cast_segment`](Self::cast_segment).
#[derive(Debug, Clone)]
pub struct RayCaster {
    volumes: Vec<Volume>,
    senses: Vec<Sense>,
    min_d: f64,
    max_d: f64,
    blocked: bool,
    origin: Point3,
    target: Point3,
}

impl RayCaster {
    /// Build a caster over `regions` (already in priority order) for the
    /// given senses, window, and range cap.
    pub fn new(regions: &[&Region], senses: &[Sense], window: Window, max_range: f64) -> Self {
        Self::build(regions, senses, window, max_range, true)
    }

    /// As [`new`](Self::new), with volume pruning switchable for the
    /// equivalence property test.
    pub(crate) fn build(
        regions: &[&Region],
        senses: &[Sense],
        window: Window,
        max_range: f64,
        prune: bool,
    ) -> Self {
        let senses = normalize(senses);

        let mut volumes: Vec<Volume> = regions
            .iter()
            .filter_map(|r| Volume::build(r, &senses, &window.bounds, &window.z))
            .collect();

        let mut blocked = false;
        if prune {
            let (kept, b) = prune_volumes(volumes, &window.bounds, &window.z);
            volumes = kept;
            blocked = b;
        }

        let (min_d, max_d) = estimate_bounds(&volumes, &senses, &window, max_range, blocked);

        Self {
            volumes,
            senses,
            min_d,
            max_d,
            blocked,
            origin: Point3::origin(),
            target: Point3::origin(),
        }
    }

    /// Guaranteed-safe travel distance: any segment no longer than this is
    /// fully traversable without per-shape computation.
    pub fn min_distance(&self) -> f64 {
        self.min_d
    }

    /// Upper bound on any segment's achievable travel distance.
    pub fn max_distance(&self) -> f64 {
        self.max_d
    }

    /// The normalized sense list (descending range).
    pub fn senses(&self) -> &[Sense] {
        &self.senses
    }

    /// The surviving volumes, in priority order.
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Set the ray origin for subsequent [`cast`](Self::cast) calls.
    pub fn set_origin(&mut self, x: f64, y: f64, z: f64) {
        self.origin = Point3::new(quantize(x), quantize(y), quantize(z));
    }

    /// Set the ray target for subsequent [`cast`](Self::cast) calls.
    pub fn set_target(&mut self, x: f64, y: f64, z: f64) {
        self.target = Point3::new(quantize(x), quantize(y), quantize(z));
    }

    /// Cast the stored origin/target segment; returns the normalized
    /// arrival fraction in `[0, 1]` (1 means the target was reached).
    pub fn cast(&self) -> f64 {
        self.cast_impl(&self.origin, &self.target, false)
    }

    /// Hit-test the stored origin/target segment.
    pub fn reaches_target(&self) -> bool {
        self.cast_impl(&self.origin, &self.target, true) >= 1.0
    }

    /// Cast an explicit segment.
    pub fn cast_segment(&self, origin: &Point3, target: &Point3) -> f64 {
        self.cast_impl(origin, target, false)
    }

    /// Hit-test an explicit segment.
    pub fn reaches(&self, origin: &Point3, target: &Point3) -> bool {
        self.cast_impl(origin, target, true) >= 1.0
    }

    fn cast_impl(&self, origin: &Point3, target: &Point3, hit_test: bool) -> f64 {
        let dx = target.x - origin.x;
        let dy = target.y - origin.y;
        let dz = target.z - origin.z;
        let length = (dx * dx + dy * dy + dz * dz).sqrt();

        if length <= self.min_d {
            return 1.0;
        }
        if hit_test && length > self.max_d {
            return 0.0;
        }
        if self.blocked || self.senses.is_empty() {
            return 0.0;
        }

        let mut heap: BinaryHeap<Reverse<RayHit>> = BinaryHeap::new();
        for (i, sense) in self.senses.iter().enumerate() {
            if sense.range < length {
                heap.push(Reverse(RayHit {
                    time: sense.range / length,
                    volume: SENSE_EXHAUSTED,
                    mask: i as i32,
                }));
            }
        }

        // Rays with no planar direction use pure containment tests instead
        // of marching.
        let planar_degenerate = dx.abs() < ALMOST_ZERO && dy.abs() < ALMOST_ZERO;

        let mut events: Vec<RayHit> = Vec::new();
        let mut states: Vec<VolumeState> = Vec::with_capacity(self.volumes.len());

        for (vi, volume) in self.volumes.iter().enumerate() {
            let band = volume.z_band();
            let mut z_inside = band.contains(origin.z);
            let mut participating = true;

            if dz.abs() >= ALMOST_ZERO {
                // Clip to the t-interval where the ray's z is in the band.
                let mut tz0 = (band.bottom - origin.z) / dz;
                let mut tz1 = (band.top - origin.z) / dz;
                if tz0 > tz1 {
                    std::mem::swap(&mut tz0, &mut tz1);
                }
                if tz1 <= 0.0 || tz0 >= 1.0 {
                    participating = false;
                    z_inside = false;
                } else {
                    for tz in [tz0, tz1] {
                        if tz > 0.0 && tz < 1.0 {
                            events.push(RayHit {
                                time: tz,
                                volume: vi as i32,
                                mask: Z_TOGGLE,
                            });
                        }
                    }
                }
            } else if !z_inside {
                participating = false;
            }

            if !participating {
                states.push(VolumeState {
                    mask_state: 0,
                    z_inside: false,
                    participating: false,
                });
                continue;
            }

            let mut mask_state = 0i32;
            for shape in volume.shapes() {
                mask_state ^= if planar_degenerate {
                    shape.compute_hits(origin.x, origin.y, 0.0, 0.0, None, vi as i32)
                } else {
                    shape.compute_hits(origin.x, origin.y, dx, dy, Some(&mut events), vi as i32)
                };
            }

            states.push(VolumeState {
                mask_state,
                z_inside,
                participating,
            });
        }

        for event in events {
            heap.push(Reverse(event));
        }

        // Sweep: between events, drain energy at the combined cost; at each
        // event, flip the state it carries and recompute the cost.
        let mut active = self.senses.len();
        let mut energy = 1.0f64;
        let mut t = 0.0f64;
        let mut cost = combined_cost(&self.volumes, &states, active);

        while let Some(Reverse(hit)) = heap.pop() {
            let dt = hit.time - t;
            if dt > 0.0 {
                let rate = cost * length;
                if rate > 0.0 {
                    let spend = rate * dt;
                    if spend >= energy {
                        return finish(t + energy / rate);
                    }
                    energy -= spend;
                }
            }
            t = hit.time;

            if hit.volume == SENSE_EXHAUSTED {
                active -= 1;
                if active == 0 {
                    return finish(t);
                }
            } else {
                let state = &mut states[hit.volume as usize];
                if hit.mask == Z_TOGGLE {
                    state.z_inside = !state.z_inside;
                } else {
                    state.mask_state ^= hit.mask;
                }
            }
            cost = combined_cost(&self.volumes, &states, active);
        }

        let rate = cost * length;
        if rate <= ALMOST_ZERO {
            return 1.0;
        }
        finish(t + energy / rate)
    }
}

/// Combined per-distance cost of all volumes currently enclosing the ray,
/// folded in priority order with the literal reducer semantics.
fn combined_cost(volumes: &[Volume], states: &[VolumeState], active: usize) -> f64 {
    let mut acc = 0.0f64;
    for (volume, state) in volumes.iter().zip(states) {
        if !state.inside() {
            continue;
        }
        let c = volume.cost_for_active(active);
        match volume.mode() {
            CombineMode::Sum => acc += c,
            CombineMode::Set => acc = c,
            CombineMode::Min => acc = acc.max(c),
            CombineMode::Max => acc = acc.min(c),
        }
    }
    acc
}

/// Clamp an arrival time to `[0, 1]`, snapping near-1 results to exactly 1.
fn finish(time: f64) -> f64 {
    let clamped = time.clamp(0.0, 1.0);
    if clamped >= 1.0 - TIME_SNAP {
        1.0
    } else {
        clamped
    }
}

/// Idealized 1D travel bounds ignoring spatial shape.
///
/// `min_d` assumes the worst case — every volume's maximum per-sense cost
/// applies over the whole segment (the sum bounds any reachable combined
/// cost from above, since `Set`/`Min`/`Max` can never exceed it). `max_d`
/// assumes the best case, capped by the range limit, the window diagonal,
/// and any inescapable window-covering `Set` volume.
fn estimate_bounds(
    volumes: &[Volume],
    senses: &[Sense],
    window: &Window,
    max_range: f64,
    blocked: bool,
) -> (f64, f64) {
    if senses.is_empty() || blocked {
        return (0.0, 0.0);
    }
    let r0 = senses[0].range;

    // Max volumes only ever lower the combined cost; summing the rest bounds
    // every reachable combined cost from above.
    let worst: f64 = volumes
        .iter()
        .filter(|v| v.mode() != CombineMode::Max)
        .map(|v| v.max_cost())
        .sum();
    let min_d = if worst > 0.0 { (1.0 / worst).min(r0) } else { r0 };

    // A window-covering Set volume with nothing after it that could lower
    // cost forces at least its best-case cost everywhere.
    let mut forced = 0.0f64;
    for (i, volume) in volumes.iter().enumerate() {
        if volume.mode() != CombineMode::Set
            || !volume.z_band().contains_band(&window.z)
            || !volume.covers_bounds(&window.bounds)
        {
            continue;
        }
        let escapable = volumes[i + 1..]
            .iter()
            .any(|v| matches!(v.mode(), CombineMode::Set | CombineMode::Max));
        if !escapable {
            forced = volume.min_cost();
        }
    }
    let cap = if forced > 0.0 { 1.0 / forced } else { f64::INFINITY };

    let mut diagonal = window.bounds.diagonal();
    let z_extent = window.z.top - window.z.bottom;
    if diagonal.is_finite() && z_extent.is_finite() {
        diagonal = diagonal.hypot(z_extent);
    } else {
        diagonal = f64::INFINITY;
    }

    let max_d = max_range.min(diagonal).min(r0).min(cap).max(0.0);
    (min_d.min(max_d), max_d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensecast_math::Point2;
    use sensecast_region::{RegionData, RegionRegistry};
    use sensecast_shapes::ShapeDescriptor;
    use std::collections::BTreeMap;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> ShapeDescriptor {
        ShapeDescriptor::Rect {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            mask_bit: None,
        }
    }

    fn data(
        mode: CombineMode,
        limits: &[(&str, f64)],
        shapes: Vec<ShapeDescriptor>,
        priority: f64,
    ) -> RegionData {
        RegionData {
            mode,
            limits: limits
                .iter()
                .map(|(name, limit)| (name.to_string(), *limit))
                .collect::<BTreeMap<_, _>>(),
            shapes,
            priority: vec![priority],
            ..Default::default()
        }
    }

    fn caster_over(
        regions: Vec<RegionData>,
        senses: &[Sense],
        window: Window,
        max_range: f64,
        prune: bool,
    ) -> RayCaster {
        let mut registry = RegionRegistry::new();
        for (i, data) in regions.into_iter().enumerate() {
            registry.create_region(&format!("r{i}"), data).unwrap();
        }
        registry.refresh();
        let active = registry.active_regions();
        RayCaster::build(&active, senses, window, max_range, prune)
    }

    fn cast_x(caster: &RayCaster, length: f64) -> f64 {
        caster.cast_segment(&Point3::new(0.0, 0.5, 0.0), &Point3::new(length, 0.5, 0.0))
    }

    #[test]
    fn test_free_space_ends_at_sense_range() {
        let caster = caster_over(
            vec![],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // 150-unit segment, 100-unit sense: travel stops at the range
        assert!((cast_x(&caster, 150.0) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(cast_x(&caster, 50.0), 1.0);
    }

    #[test]
    fn test_sum_drains_budget() {
        let caster = caster_over(
            vec![data(
                CombineMode::Sum,
                &[("sight", 10.0)],
                vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                0.0,
            )],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // Cost 1/10 over a 20-unit segment exhausts the budget halfway
        assert!((cast_x(&caster, 20.0) - 0.5).abs() < 1e-9);
        assert_eq!(cast_x(&caster, 10.0), 1.0);
    }

    #[test]
    fn test_set_replaces_accumulated_cost() {
        let caster = caster_over(
            vec![
                data(
                    CombineMode::Sum,
                    &[("sight", 1000.0)],
                    vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                    0.0,
                ),
                data(
                    CombineMode::Set,
                    &[("sight", 5.0)],
                    vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                    1.0,
                ),
            ],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // Set's 1/5 wins over the earlier Sum's 1/1000
        assert!((cast_x(&caster, 20.0) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_max_clears_below_sum() {
        let caster = caster_over(
            vec![
                data(
                    CombineMode::Sum,
                    &[("sight", 10.0)],
                    vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                    0.0,
                ),
                data(
                    CombineMode::Max,
                    &[("sight", 100.0)],
                    vec![rect(-1.0, -50.0, 11.0, 100.0)],
                    1.0,
                ),
            ],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // First 10 units cleared to cost 1/100, remainder at 1/10:
        // spend 0.1 over t in [0, 0.5], then 0.9 / (0.1 * 20) = 0.45 more
        assert!((cast_x(&caster, 20.0) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_min_keeps_larger_cost() {
        let stack = |min_limit: f64| {
            caster_over(
                vec![
                    data(
                        CombineMode::Sum,
                        &[("sight", 10.0)],
                        vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                        0.0,
                    ),
                    data(
                        CombineMode::Min,
                        &[("sight", min_limit)],
                        vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                        1.0,
                    ),
                ],
                &[Sense::new("sight", 100.0)],
                Window::unbounded(),
                1e9,
                true,
            )
        };
        // Upper envelope: a cheaper Min region (1/100) cannot lower the
        // Sum's 1/10, so the budget still drains halfway
        assert!((cast_x(&stack(100.0), 20.0) - 0.5).abs() < 1e-9);
        // A costlier Min region (1/4) raises the rate instead of adding
        assert!((cast_x(&stack(4.0), 20.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_vertex_graze_does_not_attenuate() {
        // Segment touching a polygon apex without entering it: the paired
        // same-time crossings cancel, leaving the cast unattenuated.
        let caster = caster_over(
            vec![data(
                CombineMode::Sum,
                &[("sight", 10.0)],
                vec![ShapeDescriptor::Polygon {
                    points: vec![[0.0, 0.0], [10.0, 5.0], [0.0, 10.0]],
                    mask_bit: None,
                }],
                0.0,
            )],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        let fraction = caster.cast_segment(
            &Point3::new(10.0, -5.0, 0.0),
            &Point3::new(10.0, 35.0, 0.0),
        );
        assert_eq!(fraction, 1.0);
    }

    #[test]
    fn test_vertical_ray_clips_to_band() {
        let mut region = data(
            CombineMode::Sum,
            &[("sight", 10.0)],
            vec![rect(0.0, 0.0, 10.0, 10.0)],
            0.0,
        );
        region.elevation = 0.0;
        region.height = Some(10.0);
        let caster = caster_over(
            vec![region],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // Straight up through the band: free below, drained inside
        let fraction =
            caster.cast_segment(&Point3::new(5.0, 5.0, -5.0), &Point3::new(5.0, 5.0, 15.0));
        assert!((fraction - 0.75).abs() < 1e-9);
        // Horizontal ray above the band is unaffected
        let above =
            caster.cast_segment(&Point3::new(0.0, 5.0, 20.0), &Point3::new(20.0, 5.0, 20.0));
        assert_eq!(above, 1.0);
    }

    #[test]
    fn test_sense_prefix_costs() {
        let caster = caster_over(
            vec![data(
                CombineMode::Sum,
                &[("sight", 10.0), ("hearing", f64::INFINITY)],
                vec![rect(-1000.0, -1000.0, 2000.0, 2000.0)],
                0.0,
            )],
            &[Sense::new("sight", 100.0), Sense::new("hearing", 30.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        // While hearing is alive the minimum cost is 0; after it exhausts at
        // t = 30/60, sight's 1/10 drains the full budget in 1/6 more
        assert!((cast_x(&caster, 60.0) - (0.5 + 1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_blocked_window() {
        let window = Window::new(
            Aabb2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)),
            ZBand::unbounded(),
        );
        let caster = caster_over(
            vec![data(
                CombineMode::Sum,
                &[("sight", 0.0)],
                vec![rect(-5.0, -5.0, 30.0, 30.0)],
                0.0,
            )],
            &[Sense::new("sight", 100.0)],
            window,
            1e9,
            true,
        );
        assert_eq!(caster.max_distance(), 0.0);
        assert_eq!(cast_x(&caster, 5.0), 0.0);
        assert!(!caster.reaches(&Point3::new(1.0, 1.0, 0.0), &Point3::new(2.0, 1.0, 0.0)));
    }

    #[test]
    fn test_travel_bounds() {
        let caster = caster_over(
            vec![data(
                CombineMode::Sum,
                &[("sight", 10.0)],
                vec![rect(0.0, 0.0, 10.0, 10.0)],
                0.0,
            )],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1000.0,
            true,
        );
        // Worst case every unit costs 1/10; best case is the sense range
        assert!((caster.min_distance() - 10.0).abs() < 1e-12);
        assert!((caster.max_distance() - 100.0).abs() < 1e-12);
        assert!(caster.min_distance() <= caster.max_distance());
    }

    #[test]
    fn test_hit_test_short_circuits() {
        let caster = caster_over(
            vec![],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        assert!(caster.reaches(&Point3::new(0.0, 0.0, 0.0), &Point3::new(99.0, 0.0, 0.0)));
        assert!(!caster.reaches(&Point3::new(0.0, 0.0, 0.0), &Point3::new(101.0, 0.0, 0.0)));
    }

    #[test]
    fn test_zero_length_segment() {
        let caster = caster_over(
            vec![],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        let p = Point3::new(3.0, 4.0, 5.0);
        assert_eq!(caster.cast_segment(&p, &p), 1.0);
    }

    #[test]
    fn test_no_senses_sees_nothing() {
        let caster = caster_over(vec![], &[], Window::unbounded(), 1e9, true);
        assert_eq!(cast_x(&caster, 1.0), 0.0);
    }

    #[test]
    fn test_stored_endpoints() {
        let mut caster = caster_over(
            vec![],
            &[Sense::new("sight", 100.0)],
            Window::unbounded(),
            1e9,
            true,
        );
        caster.set_origin(0.0, 0.0, 0.0);
        caster.set_target(150.0, 0.0, 0.0);
        assert!((caster.cast() - 2.0 / 3.0).abs() < 1e-9);
        assert!(!caster.reaches_target());
        caster.set_target(50.0, 0.0, 0.0);
        assert!(caster.reaches_target());
    }

    #[test]
    fn test_prune_equivalence() {
        // A window-covering inert clearing over a stack of varied volumes:
        // pruning must not change any cast result.
        let window = Window::new(
            Aabb2::new(Point2::new(0.0, 0.0), Point2::new(20.0, 20.0)),
            ZBand::unbounded(),
        );
        let regions = vec![
            data(
                CombineMode::Sum,
                &[("sight", 5.0)],
                vec![rect(2.0, 2.0, 6.0, 6.0)],
                0.0,
            ),
            data(
                CombineMode::Set,
                &[("sight", 2.0)],
                vec![rect(4.0, 4.0, 10.0, 10.0)],
                1.0,
            ),
            data(
                CombineMode::Set,
                &[("sight", f64::INFINITY)],
                vec![rect(-5.0, -5.0, 40.0, 40.0)],
                2.0,
            ),
            data(
                CombineMode::Sum,
                &[("sight", 8.0)],
                vec![rect(10.0, 1.0, 8.0, 12.0)],
                3.0,
            ),
        ];
        let senses = [Sense::new("sight", 100.0)];
        let pruned = caster_over(regions.clone(), &senses, window, 1e9, true);
        let full = caster_over(regions, &senses, window, 1e9, false);
        assert!(pruned.volumes().len() < full.volumes().len());

        for step in 0..40 {
            let angle = f64::from(step) * 0.157;
            let origin = Point3::new(1.0 + f64::from(step) * 0.4, 3.0, 0.0);
            let target = Point3::new(
                10.0 + 9.0 * angle.cos(),
                10.0 + 9.0 * angle.sin(),
                0.0,
            );
            let a = pruned.cast_segment(&origin, &target);
            let b = full.cast_segment(&origin, &target);
            assert!(
                (a - b).abs() < 1e-9,
                "diverged at step {step}: {a} vs {b}"
            );
        }
    }
}
