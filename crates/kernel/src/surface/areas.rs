//! Areas lying between two contour values.
//!
//! Curves of the upper value keep their direction and curves of the lower
//! value are reversed, so every curve has the band on its left. Open curves
//! are then chained anticlockwise around the domain boundary into area
//! outlines; closed curves become islands or holes by their winding.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::stitch::{BoundaryEdge, CurveSet, WorldCurve};
use super::Surface;
use crate::contour::spec::VALUE_TOL;
use crate::error::FieldError;
use crate::geometry::area::{enclosing_area, Area};
use crate::geometry::curves::Polyline;
use crate::geometry::point::{Bounds, Point2};
use crate::spline::Patch;

/// Areas assembled from one pair of curve sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaBuild {
    pub areas: Vec<Area>,
    pub failed: bool,
}

/// How many attempts a band needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryOutcome {
    Succeeded,
    /// Succeeded once the band limits were nudged apart this many times.
    SucceededAfterRetry(usize),
    /// Every attempt failed; the band has no areas.
    GaveUp,
}

/// The areas of one `(lower, upper)` band, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSet {
    pub lower: f64,
    pub upper: f64,
    pub areas: Vec<Area>,
    pub outcome: RetryOutcome,
}

impl AreaSet {
    pub fn total_size(&self) -> f64 {
        self.areas.iter().map(Area::size).sum()
    }
}

/// Where a band with no contours lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Uncut {
    Whole,
    Empty,
    /// Some patch reaches across a limit, so contours went missing.
    Crossed,
}

/// A curve as seen by the boundary walk.
#[derive(Debug)]
struct Entry {
    entry: BoundaryEdge,
    entry_at: f64,
    exit: BoundaryEdge,
    exit_at: f64,
    size: f64,
    line: Polyline,
}

impl Entry {
    fn key(&self) -> (BoundaryEdge, f64) {
        (self.entry, self.entry_at)
    }
}

/// Position of `p` along `edge`, increasing clockwise around the box.
fn edge_location(edge: BoundaryEdge, p: Option<&Point2>, bounds: &Bounds) -> f64 {
    let Some(p) = p else {
        return 0.0;
    };
    match edge {
        BoundaryEdge::Left => p.y - bounds.bottom,
        BoundaryEdge::Top => p.x - bounds.left,
        BoundaryEdge::Right => bounds.top - p.y,
        BoundaryEdge::Bottom => bounds.right - p.x,
        BoundaryEdge::Closed => 0.0,
    }
}

fn make_entry(curve: &WorldCurve, reversed: bool, bounds: &Bounds) -> Entry {
    let mut line = curve.line.clone();
    let start = edge_location(curve.entry, line.first(), bounds);
    let end = edge_location(curve.exit, line.last(), bounds);
    let mut size = 0.0;
    if curve.is_closed() {
        line.close();
        size = line.signed_area().abs();
    }
    if reversed {
        line.reverse();
        Entry {
            entry: curve.exit,
            entry_at: end,
            exit: curve.entry,
            exit_at: start,
            size,
            line,
        }
    } else {
        Entry {
            entry: curve.entry,
            entry_at: start,
            exit: curve.exit,
            exit_at: end,
            size,
            line,
        }
    }
}

/// Anticlockwise outline of `bounds`.
pub fn box_outline(bounds: &Bounds) -> Polyline {
    let mut line = Polyline::from_points(vec![
        bounds.bottom_left(),
        bounds.bottom_right(),
        bounds.top_right(),
        bounds.top_left(),
    ]);
    line.close();
    line
}

/// Trace the outline that starts with `open[0]`, consuming every other
/// entry it passes through. `open` must not be empty.
fn walk_outline(open: &mut Vec<Entry>, bounds: &Bounds) -> Option<Polyline> {
    let mut line = Polyline::new();
    let mut cur = 0;
    loop {
        line.append(&open[cur].line);
        let (mut edge, at) = (open[cur].exit, open[cur].exit_at);
        if cur != 0 {
            open.remove(cur);
        }
        if edge == BoundaryEdge::Closed {
            error!("open contour no longer ends at an edge");
            return None;
        }

        // next entry anticlockwise from the exit, wrapping to the last
        let idx = open.partition_point(|e| e.key() <= (edge, at));
        let next = idx.checked_sub(1).unwrap_or(open.len() - 1);
        let (next_edge, next_at) = open[next].key();

        let mut wrap = next_edge == edge && next_at > at;
        while wrap || edge != next_edge {
            let (corner, following) = match edge {
                BoundaryEdge::Left => (bounds.bottom_left(), BoundaryEdge::Bottom),
                BoundaryEdge::Bottom => (bounds.bottom_right(), BoundaryEdge::Right),
                BoundaryEdge::Right => (bounds.top_right(), BoundaryEdge::Top),
                BoundaryEdge::Top => (bounds.top_left(), BoundaryEdge::Left),
                BoundaryEdge::Closed => {
                    error!("boundary walk reached a closed contour");
                    return None;
                }
            };
            line.push(corner);
            edge = following;
            wrap = false;
        }

        if next == 0 {
            break;
        }
        cur = next;
    }
    line.condense();
    line.close();
    Some(line)
}

/// Assemble the areas between two sets of contour curves.
///
/// `lower` and `upper` are the curves of the band's limits and `bounds`
/// the domain box, all in the same frame.
pub fn areas_from_curves(lower: &[WorldCurve], upper: &[WorldCurve], bounds: &Bounds) -> AreaBuild {
    let mut build = AreaBuild::default();
    if lower.is_empty() && upper.is_empty() {
        return build;
    }

    let mut open: Vec<Entry> = Vec::new();
    let mut closed: Vec<Entry> = Vec::new();
    let entries = upper
        .iter()
        .map(|c| make_entry(c, false, bounds))
        .chain(lower.iter().map(|c| make_entry(c, true, bounds)));
    for entry in entries {
        if entry.line.is_empty() {
            continue;
        }
        if entry.entry == BoundaryEdge::Closed {
            let at = closed.partition_point(|e| e.size >= entry.size);
            closed.insert(at, entry);
        } else {
            let key = entry.key();
            let at = open.partition_point(|e| e.key() <= key);
            open.insert(at, entry);
        }
    }

    while !open.is_empty() {
        match walk_outline(&mut open, bounds) {
            Some(line) => build.areas.push(Area::new(line)),
            None => build.failed = true,
        }
        open.remove(0);
    }

    for entry in closed {
        let line = entry.line;
        if !line.is_clockwise() {
            build.areas.push(Area::new(line));
            continue;
        }
        if build.areas.is_empty() {
            build.areas.push(Area::new(box_outline(bounds)));
            build.areas[0].add_hole(line);
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };
        match enclosing_area(&build.areas, &first) {
            Some(i) => build.areas[i].add_hole(line),
            None => {
                error!(x = first.x, y = first.y, "hole lies in no area");
                build.failed = true;
            }
        }
    }
    build
}

impl Surface {
    /// Areas where the field lies between `lower` and `upper`, optionally
    /// clipped to a world box.
    ///
    /// A band that cannot be assembled cleanly is retried with its limits
    /// nudged slightly apart, up to the configured number of times.
    #[instrument(skip(self))]
    pub fn contour_areaset(&self, lower: f64, upper: f64, limits: Option<&Bounds>) -> Result<AreaSet, FieldError> {
        if !(lower < upper) {
            return Err(FieldError::InvalidBand { lower, upper });
        }
        let (nu, nv) = self.patch_dims();
        let bounds = Bounds::from_corners(
            self.spline.patch_to_spline(&Point2::ORIGIN, 0, 0)?,
            self.spline.patch_to_spline(&Point2::new(1.0, 1.0), nu - 1, nv - 1)?,
        );

        let retry = self.config.retry;
        let step = (upper - lower) * retry.nudge_fraction;
        let (mut lval, mut uval) = (lower, upper);
        let mut attempt = 0;
        let (areas, outcome) = loop {
            let lcurves = self.contour_curveset(lval)?;
            let ucurves = self.contour_curveset(uval)?;
            let build = areas_from_curves(&self.curves_to_spline(&lcurves), &self.curves_to_spline(&ucurves), &bounds);
            let mut clean = !lcurves.failed && !ucurves.failed && !build.failed;
            let mut areas = build.areas;
            if clean && lcurves.curves.is_empty() && ucurves.curves.is_empty() {
                match self.uncut_band(lval, uval)? {
                    Uncut::Whole => areas.push(Area::new(box_outline(&bounds))),
                    Uncut::Empty => {}
                    Uncut::Crossed => {
                        warn!(lval, uval, "band limits cross the field but no contours were found");
                        clean = false;
                    }
                }
            }
            if clean {
                let outcome = match attempt {
                    0 => RetryOutcome::Succeeded,
                    n => RetryOutcome::SucceededAfterRetry(n),
                };
                break (areas, outcome);
            }
            attempt += 1;
            if attempt > retry.max_retries {
                error!(lower, upper, attempts = attempt, "failed to build band even after retrying");
                break (Vec::new(), RetryOutcome::GaveUp);
            }
            lval -= step / 2.0;
            uval += step / 2.0;
            warn!(lower, upper, lval, uval, attempt, "retrying band with nudged limits");
        };

        let mut areas: Vec<Area> = areas.iter().map(|a| a.map(|p| self.spline.spline_to_world(p))).collect();
        if let Some(limits) = limits {
            areas = areas.iter().filter_map(|a| a.clip_to(limits)).collect();
        }
        if outcome != RetryOutcome::Succeeded {
            info!(lower, upper, ?outcome, "band needed retries");
        }
        debug!(lower, upper, areas = areas.len(), "built band");
        Ok(AreaSet { lower, upper, areas, outcome })
    }

    /// Where a band lies when neither limit has a contour, judged from the
    /// value range of every patch.
    fn uncut_band(&self, lower: f64, upper: f64) -> Result<Uncut, FieldError> {
        let (nu, nv) = self.patch_dims();
        let (mut inside, mut outside) = (0usize, 0usize);
        for iu in 0..nu {
            for iv in 0..nv {
                let mut patch = Patch::new(iu, iv);
                patch.define(&self.spline)?;
                let (lo, hi) = patch.function.value().range();
                let straddles = |limit: f64| lo < limit - VALUE_TOL && hi > limit + VALUE_TOL;
                if straddles(lower) || straddles(upper) {
                    debug!(iu, iv, lo, hi, lower, upper, "patch range crosses a band limit");
                    return Ok(Uncut::Crossed);
                }
                if lo >= lower - VALUE_TOL && hi <= upper + VALUE_TOL {
                    inside += 1;
                } else {
                    outside += 1;
                }
            }
        }
        Ok(match (inside, outside) {
            (_, 0) => Uncut::Whole,
            (0, _) => Uncut::Empty,
            _ => Uncut::Crossed,
        })
    }

    fn curves_to_spline(&self, set: &CurveSet) -> Vec<WorldCurve> {
        set.curves
            .iter()
            .map(|c| WorldCurve {
                line: c.line.map(|p| self.spline.world_to_spline(p)),
                ..c.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(0.0, 0.0, 10.0, 10.0)
    }

    fn curve(points: &[(f64, f64)], entry: BoundaryEdge, exit: BoundaryEdge) -> WorldCurve {
        WorldCurve {
            line: Polyline::from_points(points.iter().map(|&(x, y)| Point2::new(x, y)).collect()),
            value: 0.0,
            entry,
            exit,
        }
    }

    fn circle(cx: f64, cy: f64, r: f64, ccw: bool) -> Vec<(f64, f64)> {
        let mut pts: Vec<_> = (0..=32)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / 32.0;
                (cx + r * t.cos(), cy + r * t.sin())
            })
            .collect();
        if !ccw {
            pts.reverse();
        }
        pts
    }

    #[test]
    fn test_vertical_band() {
        // field rises to the right; band between x = 3 and x = 7
        let upper = [curve(&[(7.0, 0.0), (7.0, 10.0)], BoundaryEdge::Bottom, BoundaryEdge::Top)];
        let lower = [curve(&[(3.0, 0.0), (3.0, 10.0)], BoundaryEdge::Bottom, BoundaryEdge::Top)];
        let build = areas_from_curves(&lower, &upper, &bounds());
        assert!(!build.failed);
        assert_eq!(build.areas.len(), 1);
        let area = &build.areas[0];
        assert!((area.size() - 40.0).abs() < 1e-9);
        assert!(!area.boundary.is_clockwise());
        assert!(area.contains_point(&Point2::new(5.0, 5.0)));
        assert!(!area.contains_point(&Point2::new(8.0, 5.0)));
    }

    #[test]
    fn test_single_curve_uses_corners() {
        // only the upper limit crosses; the band is everything left of it
        let upper = [curve(&[(6.0, 0.0), (6.0, 10.0)], BoundaryEdge::Bottom, BoundaryEdge::Top)];
        let build = areas_from_curves(&[], &upper, &bounds());
        assert_eq!(build.areas.len(), 1);
        assert!((build.areas[0].size() - 60.0).abs() < 1e-9);
        assert!(build.areas[0].contains_point(&Point2::new(1.0, 9.0)));
    }

    #[test]
    fn test_band_between_corner_cuts() {
        // lower cuts off the bottom-left corner, upper the top-right
        let lower = [curve(&[(2.0, 0.0), (0.0, 2.0)], BoundaryEdge::Bottom, BoundaryEdge::Left)];
        let upper = [curve(&[(10.0, 8.0), (8.0, 10.0)], BoundaryEdge::Right, BoundaryEdge::Top)];
        let build = areas_from_curves(&lower, &upper, &bounds());
        assert!(!build.failed);
        assert_eq!(build.areas.len(), 1);
        assert!((build.areas[0].size() - (100.0 - 2.0 - 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_hole_without_open_curves_uses_box() {
        // upper curve clockwise around a peak: everything but the peak
        let upper = [curve(&circle(5.0, 5.0, 2.0, false), BoundaryEdge::Closed, BoundaryEdge::Closed)];
        let build = areas_from_curves(&[], &upper, &bounds());
        assert_eq!(build.areas.len(), 1);
        assert_eq!(build.areas[0].holes.len(), 1);
        assert!(!build.areas[0].contains_point(&Point2::new(5.0, 5.0)));
        assert!(build.areas[0].contains_point(&Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_ring_around_peak() {
        // lower ring outside, upper ring inside, both clockwise around a peak
        let lower = [curve(&circle(5.0, 5.0, 4.0, false), BoundaryEdge::Closed, BoundaryEdge::Closed)];
        let upper = [curve(&circle(5.0, 5.0, 2.0, false), BoundaryEdge::Closed, BoundaryEdge::Closed)];
        let build = areas_from_curves(&lower, &upper, &bounds());
        assert!(!build.failed);
        assert_eq!(build.areas.len(), 1);
        let ring = &build.areas[0];
        assert_eq!(ring.holes.len(), 1);
        assert!(ring.contains_point(&Point2::new(5.0, 8.0)));
        assert!(!ring.contains_point(&Point2::new(5.0, 5.0)));
        assert!(!ring.contains_point(&Point2::new(0.5, 0.5)));
    }

    #[test]
    fn test_orphan_hole_fails() {
        let upper = [
            curve(&[(6.0, 0.0), (6.0, 10.0)], BoundaryEdge::Bottom, BoundaryEdge::Top),
            curve(&circle(8.0, 5.0, 1.0, false), BoundaryEdge::Closed, BoundaryEdge::Closed),
        ];
        let build = areas_from_curves(&[], &upper, &bounds());
        assert!(build.failed);
        assert_eq!(build.areas.len(), 1);
    }

    #[test]
    fn test_no_curves_no_areas() {
        let build = areas_from_curves(&[], &[], &bounds());
        assert!(build.areas.is_empty());
        assert!(!build.failed);
    }
}
