//! Contours, extrema and vector barbs for a single patch.

use field_poly::{Axis, BiPoly};
use tracing::{trace, warn};

use super::ilist::{PatchEdges, PatchSide, RootKind};
use super::items::{ContourFragment, ExtremumKind, ExtremumMark, VectorBarb};
use super::spec::{value_key, ContourSpec, SpecKind};
use super::tracker::{tidy_fragments, track_from_side, track_loop};
use crate::config::TrackerParams;
use crate::geometry::point::Point2;
use crate::spline::{Patch, PatchMask};
use crate::Tolerance;

/// Track curves of `func` from every side using the `kind` roots.
fn track_all_sides(func: &BiPoly, edges: &PatchEdges<'_>, kind: RootKind, params: &TrackerParams) -> Vec<ContourFragment> {
    PatchSide::ALL
        .iter()
        .flat_map(|side| track_from_side(func, edges.side(*side).roots(kind), *side, params))
        .collect()
}

/// Closed contours lying wholly inside the patch.
///
/// Every such loop surrounds a stationary point, so a line from each
/// stationary point to the right-hand side of the patch crosses it. Each
/// crossing not already on one of `tracked` seeds a loop.
fn interior_loops(
    func: &BiPoly,
    specs: &[ContourSpec],
    tracked: &[ContourFragment],
    params: &TrackerParams,
    max_levels: usize,
) -> Vec<ContourFragment> {
    let near = 0.5 * params.seg_len;
    let mut loops: Vec<ContourFragment> = Vec::new();
    for (sx, sy) in func.stationary_points() {
        let ray = func.project(Axis::Y, sy);
        let (lo, hi) = ray.range(sx, 1.0);
        for (ispec, spec) in specs.iter().enumerate() {
            for cval in spec.levels_in(lo, hi, max_levels) {
                let key = value_key(cval);
                for x in ray.roots(cval, sx, 1.0) {
                    if x <= sx || x >= 1.0 {
                        continue;
                    }
                    let seed = Point2::new(x, sy);
                    let seen = |frag: &ContourFragment| frag.key() == key && frag.line.distance_to(&seed) < near;
                    if tracked.iter().chain(loops.iter()).any(seen) {
                        continue;
                    }
                    if let Some(line) = track_loop(func, cval, seed, params) {
                        trace!(cval, x = seed.x, y = seed.y, npts = line.len(), "tracked interior contour");
                        loops.push(ContourFragment::new(line, cval, Some(ispec)));
                    }
                }
            }
        }
    }
    loops
}

/// Last spec of the given extremum kind, with its value range.
fn extremum_spec(specs: &[ContourSpec], kind: ExtremumKind) -> Option<(&ContourSpec, f64, f64)> {
    specs.iter().rev().find_map(|spec| match (&spec.kind, kind) {
        (SpecKind::Maxima { min, max }, ExtremumKind::Maxima)
        | (SpecKind::Minima { min, max }, ExtremumKind::Minima)
        | (SpecKind::Saddle { min, max }, ExtremumKind::Saddle) => Some((spec, *min, *max)),
        _ => None,
    })
}

/// Contour one patch: value contours from the boundary lists and loops
/// inside the patch, then extrema where curves of `df/dx = 0` and
/// `df/dy = 0` cross.
///
/// The patch function must already be defined. Fully masked patches are
/// left untouched.
pub fn contour_patch(
    patch: &mut Patch,
    edges: &PatchEdges<'_>,
    specs: &[ContourSpec],
    params: &TrackerParams,
    tol: &Tolerance,
    max_levels: usize,
) {
    if specs.is_empty() || patch.mask == PatchMask::Nothing {
        return;
    }
    patch.contours.clear();
    patch.extrema.clear();
    let func = *patch.function.value();

    let mut fragments = track_all_sides(&func, edges, RootKind::Value, params);
    tidy_fragments(&mut fragments, edges, tol);
    fragments.retain(|frag| frag.line.len() >= 2);
    let loops = interior_loops(&func, specs, &fragments, params, max_levels);
    fragments.extend(loops);
    for mut frag in fragments {
        match frag.spec.and_then(|i| specs.get(i)) {
            Some(spec) => frag.style = spec.style.line.clone(),
            None => warn!(value = frag.value, spec = ?frag.spec, "contour without a valid spec"),
        }
        frag.visible = patch.mask.admits(&frag.line);
        patch.contours.push(frag);
    }

    let wanted: Vec<_> = [ExtremumKind::Maxima, ExtremumKind::Minima, ExtremumKind::Saddle]
        .into_iter()
        .filter_map(|kind| extremum_spec(specs, kind).map(|found| (kind, found)))
        .collect();
    if wanted.is_empty() {
        patch.mark_contoured();
        return;
    }

    let xcurves = track_all_sides(&func.differentiate(Axis::X), edges, RootKind::DfDx, params);
    let ycurves = track_all_sides(&func.differentiate(Axis::Y), edges, RootKind::DfDy, params);

    for xline in xcurves.iter().map(|c| &c.line).filter(|l| l.len() > 1) {
        for yline in ycurves.iter().map(|c| &c.line).filter(|l| l.len() > 1) {
            let Some(cross) = xline.segment_crossing(yline) else {
                continue;
            };
            let dx = yline.points[cross.seg_b + 1].x - yline.points[cross.seg_b].x;
            let dy = xline.points[cross.seg_a + 1].y - xline.points[cross.seg_a].y;
            let kind = if dx > 0.0 && dy < 0.0 {
                ExtremumKind::Maxima
            } else if dx < 0.0 && dy > 0.0 {
                ExtremumKind::Minima
            } else if dx * dy > 0.0 {
                ExtremumKind::Saddle
            } else {
                continue;
            };
            let Some((_, (spec, min, max))) = wanted.iter().find(|(k, _)| *k == kind) else {
                continue;
            };
            let value = func.evaluate(cross.point.x, cross.point.y);
            if value < *min || value > *max {
                continue;
            }
            let mut mark = ExtremumMark::new(kind, cross.point, value);
            mark.style = spec.style.mark.clone();
            mark.visible = patch.mask.admits_point(&cross.point);
            trace!(iu = patch.iu, iv = patch.iv, ?kind, value, "found extremum");
            patch.extrema.push(mark);
        }
    }
    patch.mark_contoured();
}

/// Wind barbs for a vector patch.
///
/// A positive multiplier `m` samples an `m x m` grid over the patch
/// (skipping the domain's left and bottom edges so neighbours don't
/// double up); a negative one draws a single barb at the lower-left corner
/// of every `|m|`-th interior patch.
pub fn patch_vectors(patch: &mut Patch, specs: &[ContourSpec]) {
    let Some((u, v)) = patch.function.components().map(|(u, v)| (*u, *v)) else {
        return;
    };
    patch.vectors.clear();
    let Some((spec, mult)) = specs.iter().rev().find_map(|spec| match spec.kind {
        SpecKind::Vector { mult } => Some((spec, mult)),
        _ => None,
    }) else {
        return;
    };
    let mult = if mult >= 0 { mult.max(1) } else { mult.min(-1) };

    let samples: Vec<Point2> = if mult < 0 {
        let every = mult.unsigned_abs() as usize;
        if patch.iu == 0 || patch.iv == 0 || patch.iu % every != 0 || patch.iv % every != 0 {
            return;
        }
        vec![Point2::ORIGIN]
    } else {
        let n = mult as usize;
        let mu0 = usize::from(patch.iu == 0);
        let mv0 = usize::from(patch.iv == 0);
        (mu0..n)
            .flat_map(|mu| (mv0..n).map(move |mv| Point2::new(mu as f64 / n as f64, mv as f64 / n as f64)))
            .collect()
    };

    for pp in samples {
        let (uu, vv) = (u.evaluate(pp.x, pp.y), v.evaluate(pp.x, pp.y));
        let speed = uu.hypot(vv);
        // Direction the flow comes from, relative to the patch top
        let direction = 90.0 - (180.0 + vv.atan2(uu).to_degrees());
        let mut barb = VectorBarb::new(pp, direction, speed);
        barb.style = spec.style.barb.clone();
        barb.visible = patch.mask.admits_point(&pp);
        patch.vectors.push(barb);
    }
}

/// Restyle a contoured patch for a new set of specs without re-tracking.
///
/// Contours take the style of the first level spec producing their value;
/// marks that of the first spec of their kind covering their value; barbs
/// that of the first vector spec. Anything unmatched is hidden.
pub fn reset_patch_styles(patch: &mut Patch, specs: &[ContourSpec]) {
    if specs.is_empty() {
        return;
    }
    let mask = patch.mask.clone();

    patch.contours.for_each_mut(|frag| {
        match specs.iter().position(|s| s.matches_level(frag.value)) {
            Some(i) => {
                frag.style = specs[i].style.line.clone();
                frag.spec = Some(i);
                frag.visible = mask.admits(&frag.line);
            }
            None => frag.visible = false,
        }
    });

    patch.extrema.for_each_mut(|mark| {
        let found = specs.iter().find(|s| match (&s.kind, mark.kind) {
            (SpecKind::Maxima { min, max }, ExtremumKind::Maxima)
            | (SpecKind::Minima { min, max }, ExtremumKind::Minima)
            | (SpecKind::Saddle { min, max }, ExtremumKind::Saddle) => mark.value >= *min && mark.value <= *max,
            _ => false,
        });
        match found {
            Some(spec) => {
                mark.style = spec.style.mark.clone();
                mark.visible = mask.admits_point(&mark.point);
            }
            None => mark.visible = false,
        }
    });

    let barb_spec = specs.iter().find(|s| matches!(s.kind, SpecKind::Vector { .. }));
    patch.vectors.for_each_mut(|barb| match barb_spec {
        Some(spec) => {
            barb.style = spec.style.barb.clone();
            barb.visible = mask.admits_point(&barb.point);
        }
        None => barb.visible = false,
    });
}
