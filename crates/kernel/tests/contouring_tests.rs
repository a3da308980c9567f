//! End-to-end contouring scenarios on small synthetic fields.

use field_kernel::contour::{ContourSpec, ExtremumKind};
use field_kernel::geometry::point::{Bounds, Point2};
use field_kernel::geometry::transform::Xform;
use field_kernel::spline::Spline;
use field_kernel::surface::{BoundaryEdge, RetryOutcome, Surface};
use field_kernel::{AllocationPolicy, SurfaceConfig, TrackerConfig};

fn grid(m: usize, n: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..m)
        .flat_map(|iu| (0..n).map(move |iv| (iu, iv)))
        .map(|(iu, iv)| f(iu as f64, iv as f64))
        .collect()
}

fn surface(m: usize, n: usize, xform: Xform, f: impl Fn(f64, f64) -> f64) -> Surface {
    let spline = Spline::scalar(m, n, xform, 1.0, grid(m, n, f)).unwrap();
    Surface::new(spline, SurfaceConfig::default()).unwrap()
}

/// Linear field `1.3 + x + 0.3 y` over the 3x3 domain `[0, 3]^2`.
fn tilted_ramp() -> Surface {
    surface(6, 6, Xform::identity(), |u, v| u + 0.3 * v)
}

#[test]
fn flat_field_band_covers_domain() {
    let sfc = surface(4, 4, Xform::identity(), |_, _| 5.0);
    assert!(sfc.contour_curveset(3.0).unwrap().curves.is_empty());

    let band = sfc.contour_areaset(0.0, 10.0, None).unwrap();
    assert_eq!(band.outcome, RetryOutcome::Succeeded);
    assert_eq!(band.areas.len(), 1);
    assert!((band.total_size() - 1.0).abs() < 1e-9);

    let band = sfc.contour_areaset(6.0, 10.0, None).unwrap();
    assert!(band.areas.is_empty());
}

#[test]
fn rotated_flat_field_band_keeps_size() {
    let sfc = surface(5, 4, Xform::new(Point2::new(100.0, -50.0), 30.0), |_, _| 5.0);
    let band = sfc.contour_areaset(0.0, 10.0, None).unwrap();
    assert_eq!(band.areas.len(), 1);
    assert!((band.total_size() - 2.0).abs() < 1e-9);
    let inside = sfc.spline().spline_to_world(&Point2::new(1.0, 0.5));
    assert!(band.areas[0].contains_point(&inside));
}

#[test]
fn band_area_of_tilted_ramp() {
    let sfc = tilted_ramp();
    let band = sfc.contour_areaset(2.0, 4.0, None).unwrap();
    assert_eq!(band.outcome, RetryOutcome::Succeeded);
    assert_eq!(band.areas.len(), 1);
    // strip of width 2, less the corner cut off by the left edge
    assert!((band.total_size() - (6.0 - 1.0 / 15.0)).abs() < 0.02);
    assert!(!band.areas[0].boundary.is_clockwise());
}

#[test]
fn bands_are_monotonic_and_additive() {
    let sfc = tilted_ramp();
    let wide = sfc.contour_areaset(2.0, 4.0, None).unwrap().total_size();
    let narrow = sfc.contour_areaset(2.5, 3.5, None).unwrap().total_size();
    assert!(wide > narrow);

    let low = sfc.contour_areaset(2.0, 3.0, None).unwrap().total_size();
    let high = sfc.contour_areaset(3.0, 4.0, None).unwrap().total_size();
    assert!((low + high - wide).abs() < 0.02);
}

#[test]
fn band_clipped_to_limits() {
    let sfc = tilted_ramp();
    let limits = Bounds::new(0.0, 0.0, 1.5, 1.0);
    let band = sfc.contour_areaset(2.0, 4.0, Some(&limits)).unwrap();
    assert_eq!(band.areas.len(), 1);
    for p in &band.areas[0].boundary.points {
        assert!(p.x > -1e-9 && p.x < 1.5 + 1e-9);
        assert!(p.y > -1e-9 && p.y < 1.0 + 1e-9);
    }
    // x from 0.7 - 0.3 y to 1.5 over y in [0, 1]
    assert!((band.total_size() - 0.95).abs() < 0.02);
}

#[test]
fn saddle_found_at_centre() {
    let mut sfc = surface(6, 6, Xform::identity(), |u, v| (u - 2.5).powi(2) - (v - 2.5).powi(2));
    sfc.set_specs(vec![
        ContourSpec::range(-10.0, 10.0, 0.05, 0.5),
        ContourSpec::maxima(-10.0, 10.0),
        ContourSpec::minima(-10.0, 10.0),
        ContourSpec::saddle(-10.0, 10.0),
    ])
    .unwrap();
    sfc.contour_surface().unwrap();

    let mut found = Vec::new();
    for iu in 0..3 {
        for iv in 0..3 {
            if let Some(patch) = sfc.get_patch(iu, iv) {
                for mark in patch.extrema.iter() {
                    found.push((mark.kind, sfc.spline().patch_to_world(&mark.point, iu, iv).unwrap()));
                }
            }
        }
    }
    assert_eq!(found.len(), 1);
    let (kind, at) = found[0];
    assert_eq!(kind, ExtremumKind::Saddle);
    assert!((at.x - 1.5).abs() < 1e-3);
    assert!((at.y - 1.5).abs() < 1e-3);
}

#[test]
fn closed_contour_makes_island() {
    let sfc = surface(8, 8, Xform::identity(), |u, v| 20.0 - (u - 3.5).powi(2) - (v - 3.5).powi(2));
    let set = sfc.contour_curveset(17.0).unwrap();
    assert_eq!(set.curves.len(), 1);
    assert_eq!(set.curves[0].entry, BoundaryEdge::Closed);
    assert!(set.curves[0].line.is_closed());
    // higher values on the right, so the loop runs clockwise around the peak
    assert!(set.curves[0].line.is_clockwise());

    let band = sfc.contour_areaset(17.0, 30.0, None).unwrap();
    assert_eq!(band.areas.len(), 1);
    let island = &band.areas[0];
    assert!(island.holes.is_empty());
    assert!(island.contains_point(&Point2::new(2.5, 2.5)));
    assert!(!island.contains_point(&Point2::new(0.2, 0.2)));
    // peak value is 20 - 2/3, so the radius squared is 7/3
    let expected = std::f64::consts::PI * 7.0 / 3.0;
    assert!((island.size() - expected).abs() / expected < 0.05);

    let skirt = sfc.contour_areaset(0.0, 17.0, None).unwrap();
    assert_eq!(skirt.areas.len(), 1);
    assert_eq!(skirt.areas[0].holes.len(), 1);
    assert!((skirt.total_size() + island.size() - 25.0).abs() < 1e-6);
}

#[test]
fn policies_give_identical_contours() {
    let f = |u: f64, v: f64| (u * 0.7).sin() + (v * 0.4).cos();
    let spline = Spline::scalar(7, 7, Xform::identity(), 2.0, grid(7, 7, f)).unwrap();
    let mut counts = Vec::new();
    for policy in [AllocationPolicy::Eager, AllocationPolicy::Lazy, AllocationPolicy::AllocateAndFree] {
        let config = SurfaceConfig::default().with_policy(policy);
        let mut sfc = Surface::new(spline.clone(), config).unwrap();
        sfc.set_specs(vec![ContourSpec::range(-3.0, 3.0, 0.05, 0.25)]).unwrap();
        sfc.contour_surface().unwrap();
        let total: usize = (0..4)
            .flat_map(|iu| (0..4).map(move |iv| (iu, iv)))
            .filter_map(|(iu, iv)| sfc.get_patch(iu, iv).map(|p| p.contours.len()))
            .sum();
        counts.push(total);
    }
    assert!(counts[0] > 0);
    assert!(counts.iter().all(|&c| c == counts[0]));
}

#[test]
fn edit_then_partial_recontour_matches_full() {
    let f = |u: f64, v: f64| 0.21 * u * v + 0.013;
    let mut partial = surface(10, 10, Xform::identity(), f);
    partial.set_specs(vec![ContourSpec::list(vec![1.0, 2.0, 3.0])]).unwrap();
    partial.contour_surface().unwrap();

    partial.set_control_vertex(3, 3, 6.0).unwrap();
    // vertex (3, 3) shapes patches 0..=3 in each direction
    partial.contour_surface_partial(0, 3, 0, 3).unwrap();

    let mut full = partial.clone();
    full.contour_surface().unwrap();

    for iu in 0..7 {
        for iv in 0..7 {
            let a = partial.get_patch(iu, iv).map(|p| p.contours.len());
            let b = full.get_patch(iu, iv).map(|p| p.contours.len());
            assert_eq!(a, b, "patch ({iu}, {iv})");
        }
    }
}

#[test]
fn invalid_band_is_rejected() {
    let sfc = tilted_ramp();
    assert!(sfc.contour_areaset(4.0, 2.0, None).is_err());
    assert!(sfc.contour_areaset(3.0, 3.0, None).is_err());
}

#[test]
fn stored_bands_cover_the_domain() {
    let spline = Spline::scalar(6, 6, Xform::identity(), 1.0, grid(6, 6, |u, v| u + 0.3 * v)).unwrap();
    let config = SurfaceConfig::default().with_tracker(TrackerConfig::tight_square());
    let mut sfc = Surface::new(spline, config).unwrap();
    // field spans 1.3 to 5.2 over the 3x3 domain
    sfc.compute_bands(&[(0.0, 2.0), (2.0, 4.0), (4.0, 10.0)]).unwrap();
    assert_eq!(sfc.bands().len(), 3);
    let total: f64 = sfc.bands().iter().map(|b| b.total_size()).sum();
    assert!((total - 9.0).abs() < 0.05);
    assert!(sfc.bands().iter().all(|b| b.outcome != RetryOutcome::GaveUp));
}

/// Flat field of 5 with a 2x2 block of low vertices. The dip bottoms out
/// near 3.94 at (0.5, 0.5), well inside patch (0, 0).
fn dip() -> Surface {
    surface(5, 5, Xform::identity(), |u, v| {
        if (1.0..=2.0).contains(&u) && (1.0..=2.0).contains(&v) { 3.85 } else { 5.0 }
    })
}

#[test]
fn contour_inside_one_patch_is_found() {
    let sfc = dip();
    let set = sfc.contour_curveset(4.0).unwrap();
    assert!(!set.failed);
    assert_eq!(set.open().count(), 0);
    let loops: Vec<_> = set.closed().collect();
    assert_eq!(loops.len(), 1);
    let line = &loops[0].line;
    assert!(line.contains_point(&Point2::new(0.5, 0.5)));
    // lower values inside, so the loop runs anticlockwise
    assert!(!line.is_clockwise());
    for p in &line.points {
        assert!((sfc.eval(p).unwrap().value - 4.0).abs() < 0.01);
    }
}

#[test]
fn dip_bands_are_monotonic_and_tile() {
    let sfc = dip();
    let wide = sfc.contour_areaset(2.0, 8.0, None).unwrap();
    let narrow = sfc.contour_areaset(4.0, 6.0, None).unwrap();
    let low = sfc.contour_areaset(0.0, 4.0, None).unwrap();
    for band in [&wide, &narrow, &low] {
        assert_eq!(band.outcome, RetryOutcome::Succeeded);
    }
    assert!((wide.total_size() - 4.0).abs() < 1e-9);
    assert!(wide.total_size() > narrow.total_size());
    assert_eq!(narrow.areas.len(), 1);
    assert_eq!(narrow.areas[0].holes.len(), 1);
    // the 4.0 loop reaches about 0.32 from the bottom of the dip
    assert!(low.total_size() > 0.2 && low.total_size() < 0.4, "low = {}", low.total_size());
    assert!((low.total_size() + narrow.total_size() - 4.0).abs() < 1e-9);

    assert!(sfc.contour_areaset(6.0, 9.0, None).unwrap().areas.is_empty());
}

#[test]
fn circle_tracked_bands_cover_the_domain() {
    let f = |u: f64, v: f64| 20.0 - (u - 3.5).powi(2) - (v - 3.5).powi(2);
    for tracker in [TrackerConfig::circle(), TrackerConfig::tight_circle()] {
        let spline = Spline::scalar(8, 8, Xform::identity(), 1.0, grid(8, 8, f)).unwrap();
        let mut sfc = Surface::new(spline, SurfaceConfig::default().with_tracker(tracker)).unwrap();
        sfc.compute_bands(&[(-50.0, 10.0), (10.0, 15.0), (15.0, 19.0), (19.0, 30.0)]).unwrap();
        let total: f64 = sfc.bands().iter().map(|b| b.total_size()).sum();
        assert!((total - 25.0).abs() < 0.05, "{:?}: total {total}", tracker.mode);
        assert!(sfc.bands().iter().all(|b| b.outcome != RetryOutcome::GaveUp));
        // the top band is an island round the peak at (2.5, 2.5)
        let top = &sfc.bands()[3];
        assert_eq!(top.areas.len(), 1);
        assert!(top.areas[0].contains_point(&Point2::new(2.5, 2.5)));
    }
}

#[test]
fn vector_magnitude_matches_components_at_grid_points() {
    let (m, n) = (6, 7);
    let u = grid(m, n, |iu, iv| 1.0 + 0.3 * iu - 0.2 * iv * iv);
    let v = grid(m, n, |iu, iv| 3.0 * (0.7 * iu).sin() + 0.5 * iv);
    let spline = Spline::vector(m, n, Xform::identity(), 1.0, u, v).unwrap();
    let sfc = Surface::new(spline, SurfaceConfig::default()).unwrap();
    // vertex (iu, iv) sits over the world point (iu - 1, iv - 1)
    for iu in 1..m - 1 {
        for iv in 1..n - 1 {
            let p = Point2::new(iu as f64 - 1.0, iv as f64 - 1.0);
            let (uu, vv) = sfc.eval_uv(&p).unwrap().value;
            let mag = sfc.eval(&p).unwrap().value;
            assert!((mag - uu.hypot(vv)).abs() < 1e-9, "({iu}, {iv}): {mag} vs {}", uu.hypot(vv));
        }
    }
}
