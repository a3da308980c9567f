//! Follow one contour of a patch function from an entry point on the
//! patch boundary to where it leaves.
//!
//! Contours are tracked with higher values on the right. Each step looks
//! for the function crossing the contour value on a small constraining
//! shape (a square in square mode, an arc in circle mode) centred on the
//! current point. Crossings where the function rises counter-clockwise
//! are exits; the tracker moves to the exit that continues the current
//! contour rather than a neighbouring one.

use std::f64::consts::PI;
use std::ops::BitOr;

use field_poly::{Axis, BiPoly, UniPoly};
use tracing::{debug, trace, warn};

use super::ilist::{sign, BoundaryRoot, PatchEdges, PatchSide};
use super::items::ContourFragment;
use super::spec::value_key;
use crate::config::TrackerParams;
use crate::geometry::curves::Polyline;
use crate::geometry::point::Point2;
use crate::Tolerance;

/// Circle mode halves a failed step down to this radius before giving up.
const MIN_ARC_RADIUS: f64 = 0.05;

/// Result of one tracking step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Next(Point2),
    /// No usable exit was found.
    Lost,
}

/// Sides of the constraining square a crossing lies on. Corners carry
/// two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SideSet(u8);

impl SideSet {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1);
    pub const RIGHT: Self = Self(2);
    pub const BOTTOM: Self = Self(4);
    pub const TOP: Self = Self(8);

    pub fn meets(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_corner(self) -> bool {
        (self.meets(Self::LEFT) || self.meets(Self::RIGHT)) && (self.meets(Self::BOTTOM) || self.meets(Self::TOP))
    }
}

impl BitOr for SideSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct SquareRoot {
    point: Point2,
    side: SideSet,
    entry: bool,
    /// Half of a double root (or a suspected one).
    dbl: bool,
}

/// One side of the constraining square, walked counter-clockwise.
struct SquareEdge {
    proj: UniPoly,
    side: SideSet,
    horizontal: bool,
    fixed: f64,
    lo: f64,
    hi: f64,
    tol: f64,
    /// +1 when walking towards `hi`, -1 towards `lo`.
    dir: f64,
}

impl SquareEdge {
    fn point(&self, a: f64) -> Point2 {
        if self.horizontal {
            Point2::new(a, self.fixed)
        } else {
            Point2::new(self.fixed, a)
        }
    }

    fn start(&self) -> f64 {
        if self.dir > 0.0 { self.lo } else { self.hi }
    }

    fn end(&self) -> f64 {
        if self.dir > 0.0 { self.hi } else { self.lo }
    }
}

/// Running state of the walk around the square.
#[derive(Debug, Clone, Copy)]
struct Walk {
    any: bool,
    aprev: f64,
    eprev: bool,
}

/// Value of `proj - cval` just inside an edge end at `at`. A value of
/// exactly zero is resampled halfway towards `limit`, or halfway to the
/// nearest root in that direction.
fn sample_side(proj: &UniPoly, cval: f64, at: f64, limit: f64) -> f64 {
    let f = proj.evaluate(at) - cval;
    if f != 0.0 {
        return f;
    }
    let toward = limit - at;
    let nearest = proj
        .roots(cval, at.min(limit), at.max(limit))
        .into_iter()
        .filter(|r| (r - at) * toward > 0.0)
        .min_by(|a, b| (a - at).abs().total_cmp(&(b - at).abs()));
    let resample = match nearest {
        Some(r) => 0.5 * (at + r),
        None => 0.5 * (at + limit),
    };
    proj.evaluate(resample) - cval
}

/// Walk one edge of the square, adding its crossings in walking order.
fn walk_edge(edge: &SquareEdge, cval: f64, r: f64, roots: &mut Vec<SquareRoot>) -> Walk {
    let mut found = edge.proj.roots(cval, edge.lo + edge.tol, edge.hi - edge.tol);
    if edge.dir < 0.0 {
        found.reverse();
    }
    let mut walk = Walk {
        any: false,
        aprev: edge.start() + edge.dir * edge.tol,
        eprev: false,
    };

    for acurr in found {
        let entry;
        let mut dbl = false;
        if walk.any && acurr == walk.aprev {
            // Repeated roots come back identical. The first repeat pairs
            // up with its predecessor; a third stays single.
            entry = !walk.eprev;
            if let Some(prev) = roots.last_mut() {
                if !prev.dbl {
                    prev.dbl = true;
                    dbl = true;
                }
            }
        } else {
            let amid = 0.5 * (walk.aprev + acurr);
            entry = sign(edge.proj.evaluate(amid) - cval) < 0;
            if walk.any && entry == walk.eprev {
                if (acurr - walk.aprev) * edge.dir <= edge.tol {
                    walk.aprev = acurr;
                    continue;
                }
                warn!(
                    entry,
                    spread = (acurr - walk.aprev).abs() / r,
                    "multiple crossings of the same sense on one edge"
                );
            }
        }
        roots.push(SquareRoot {
            point: edge.point(acurr),
            side: edge.side,
            entry,
            dbl,
        });
        walk = Walk {
            any: true,
            aprev: acurr,
            eprev: entry,
        };
    }
    walk
}

/// Look for a crossing hidden in the corner between `prev` and `next`.
fn check_corner(
    prev: &SquareEdge,
    next: &SquareEdge,
    corner: SideSet,
    cval: f64,
    walk: &mut Walk,
    roots: &mut Vec<SquareRoot>,
) {
    let end = prev.end();
    let fval = sample_side(&prev.proj, cval, end - prev.dir * prev.tol, end);
    let start = next.start();
    let gval = sample_side(&next.proj, cval, start + next.dir * next.tol, start);
    if sign(fval) == sign(gval) {
        return;
    }

    let entry = sign(fval) < 0;
    if walk.any && entry == walk.eprev {
        if (end - walk.aprev) * prev.dir <= prev.tol {
            walk.aprev = end;
            return;
        }
        warn!(entry, "multiple crossings of the same sense at a corner");
    }
    roots.push(SquareRoot {
        point: prev.point(end),
        side: corner,
        entry,
        dbl: false,
    });
    *walk = Walk {
        any: true,
        aprev: end,
        eprev: entry,
    };
}

/// Drop the root at `idx`, keeping `imin` pointing at the same entry.
fn remove_root(roots: &mut Vec<SquareRoot>, idx: usize, imin: &mut usize) {
    roots.remove(idx);
    if *imin > idx {
        *imin -= 1;
    }
}

/// Next point on the contour `func = cval` using a constraining square of
/// half-width `r` centred on `pcurr`, clipped to the patch.
///
/// `pprev` is the point the contour came from, which lies on the square's
/// boundary. `first` marks the first step into a patch.
pub fn square_step(func: &BiPoly, cval: f64, pprev: &Point2, pcurr: &Point2, r: f64, first: bool) -> StepOutcome {
    let yb = (pcurr.y - r).max(0.0);
    let xr = (pcurr.x + r).min(1.0);
    let yt = (pcurr.y + r).min(1.0);
    let xl = (pcurr.x - r).max(0.0);

    let eps = 0.05 * r;
    let mut xtol = 0.01 * r;
    let mut ytol = 0.01 * r;
    if xr - xl < 2.0 * xtol {
        xtol = 0.5 * (xr - xl);
        trace!("narrow square");
    }
    if yt - yb < 2.0 * ytol {
        ytol = 0.5 * (yt - yb);
        trace!("short square");
    }

    let horizontal = |side, fixed, dir| SquareEdge {
        proj: func.project(Axis::Y, fixed),
        side,
        horizontal: true,
        fixed,
        lo: xl,
        hi: xr,
        tol: xtol,
        dir,
    };
    let vertical = |side, fixed, dir| SquareEdge {
        proj: func.project(Axis::X, fixed),
        side,
        horizontal: false,
        fixed,
        lo: yb,
        hi: yt,
        tol: ytol,
        dir,
    };
    let bottom = horizontal(SideSet::BOTTOM, yb, 1.0);
    let right = vertical(SideSet::RIGHT, xr, 1.0);
    let top = horizontal(SideSet::TOP, yt, -1.0);
    let left = vertical(SideSet::LEFT, xl, -1.0);

    // Counter-clockwise from the bottom-left corner
    let mut roots = Vec::new();
    let mut walk = walk_edge(&bottom, cval, r, &mut roots);
    check_corner(&bottom, &right, SideSet::BOTTOM | SideSet::RIGHT, cval, &mut walk, &mut roots);
    let mut walk = walk_edge(&right, cval, r, &mut roots);
    check_corner(&right, &top, SideSet::TOP | SideSet::RIGHT, cval, &mut walk, &mut roots);
    let mut walk = walk_edge(&top, cval, r, &mut roots);
    check_corner(&top, &left, SideSet::TOP | SideSet::LEFT, cval, &mut walk, &mut roots);
    let mut walk = walk_edge(&left, cval, r, &mut roots);
    check_corner(&left, &bottom, SideSet::BOTTOM | SideSet::LEFT, cval, &mut walk, &mut roots);

    let mut ne = roots.iter().filter(|rt| rt.entry).count();
    let mut nx = roots.len() - ne;
    if ne != nx {
        let senses: String = roots.iter().map(|rt| if rt.entry { 'e' } else { 'x' }).collect();
        debug!(ne, nx, %senses, "entry/exit mismatch");
    }

    // Which side of the square did we come in through?
    let mut eside = SideSet::NONE;
    if pprev.x < xl + xtol {
        eside = SideSet::LEFT;
    } else if pprev.x > xr - xtol {
        eside = SideSet::RIGHT;
    }
    if pprev.y < yb + ytol {
        eside = eside | SideSet::BOTTOM;
    } else if pprev.y > yt - ytol {
        eside = eside | SideSet::TOP;
    }
    if eside == SideSet::NONE {
        warn!(
            px = pprev.x,
            py = pprev.y,
            cx = pcurr.x,
            cy = pcurr.y,
            r,
            "previous point not on the square"
        );
        return StepOutcome::Lost;
    }

    // Nearest entry and nearest exit, preferring the entry side
    let mut imin = None;
    let mut iminx = None;
    let mut dmin = f64::INFINITY;
    let mut dminx = f64::INFINITY;
    for (i, rt) in roots.iter().enumerate() {
        let mut dist = pprev.distance_to(&rt.point);
        if !eside.meets(rt.side) {
            dist += eps;
        }
        if rt.entry {
            if dist < dmin {
                imin = Some(i);
                dmin = dist;
            }
        } else if dist < dminx {
            iminx = Some(i);
            dminx = dist;
        }
    }
    if let (Some(ie), Some(ix)) = (imin, iminx) {
        // An exit closer than any entry: treat the pair as a double root
        if dminx < dmin && !roots[ix].dbl {
            roots[ie].dbl = true;
            roots[ix].dbl = true;
        }
    }

    let Some(mut imin) = imin else {
        if eside.is_corner() {
            let x = if eside.meets(SideSet::LEFT) { xl } else { xr };
            let y = if eside.meets(SideSet::BOTTOM) { yb } else { yt };
            debug!("no matching entry, hidden double root at corner");
            return StepOutcome::Next(Point2::new(x, y));
        }
        if roots.len() == 1 {
            debug!("no matching entry, using lone exit");
            return StepOutcome::Next(roots[0].point);
        }
        warn!(n = roots.len(), "no matching entry");
        return StepOutcome::Lost;
    };

    // Entered at a double root: its partner exit is not a way out
    if !first && nx > 1 && roots[imin].dbl {
        let n = roots.len();
        let iprev = (imin + n - 1) % n;
        let inext = (imin + 1) % n;
        let is_partner = |rt: &SquareRoot| rt.dbl && !rt.entry;
        let mut rprev = is_partner(&roots[iprev]);
        let mut rnext = is_partner(&roots[inext]) && iprev != inext;
        if rprev && rnext {
            let here = roots[imin].point;
            if here.distance_to(&roots[inext].point) < here.distance_to(&roots[iprev].point) {
                rprev = false;
            } else {
                rnext = false;
            }
        }

        if rprev {
            remove_root(&mut roots, iprev, &mut imin);
            nx -= 1;
            let n = roots.len();
            let iprev = (imin + n - 1) % n;
            if roots[iprev].entry {
                remove_root(&mut roots, iprev, &mut imin);
                ne -= 1;
            }
        } else if rnext {
            remove_root(&mut roots, inext, &mut imin);
            nx -= 1;
            let n = roots.len();
            let inext = (imin + 1) % n;
            if roots[inext].entry {
                remove_root(&mut roots, inext, &mut imin);
                ne -= 1;
            }
        }
        trace!(ne, nx, "removed double root partner");
    }

    match nx {
        0 => {
            debug!("no exit");
            StepOutcome::Lost
        }
        1 => roots
            .iter()
            .find(|rt| !rt.entry)
            .map_or(StepOutcome::Lost, |rt| StepOutcome::Next(rt.point)),
        _ => {
            // Several exits: sample between the centre and each following
            // entry. The first one with low values on the way is preceded
            // by our exit; otherwise take the exit just before our entry.
            let n = roots.len();
            let mut inext = (imin + n - 1) % n;
            for i in 1..n {
                let j = (imin + i) % n;
                if !roots[j].entry {
                    continue;
                }
                let q = roots[j].point;
                let low = [0.75, 0.5, 0.25].iter().any(|t| {
                    let pos = pcurr.lerp(&q, *t);
                    sign(func.evaluate(pos.x, pos.y) - cval) < 0
                });
                if low {
                    inext = (imin + i + n - 1) % n;
                    break;
                }
            }
            StepOutcome::Next(roots[inext].point)
        }
    }
}

/// Next point on the contour `func = cval` on the arc of radius `r` about
/// `pcurr` from angle `a_start` to `a_end`, sampled in `nseg` pieces.
#[allow(clippy::too_many_arguments)]
pub fn circle_step(
    func: &BiPoly,
    cval: f64,
    pcurr: &Point2,
    r: f64,
    a_start: f64,
    a_end: f64,
    nseg: usize,
    zero_tol: f64,
) -> StepOutcome {
    let nseg = nseg.max(1);
    let da = (a_end - a_start) / nseg as f64;
    let sd = sign(da);
    let at = |a: f64| func.evaluate(pcurr.x + r * a.cos(), pcurr.y + r * a.sin()) - cval;

    let mut entries = Vec::new();
    let mut exits = Vec::new();
    let mut a1 = a_start;
    let mut s1 = sign(at(a1));
    for _ in 0..nseg {
        let a2 = a1 + da;
        let s2 = sign(at(a2));
        if s1 != s2 {
            match func.zeroin_on_circle(cval, (pcurr.x, pcurr.y), r, a1, a2, zero_tol) {
                Ok(a) if s2 == sd => entries.push(a),
                Ok(a) => exits.push(a),
                Err(err) => trace!(%err, "arc segment without a bracketed crossing"),
            }
        }
        a1 = a2;
        s1 = s2;
    }

    let a = match (exits.as_slice(), entries.first()) {
        ([], _) => return StepOutcome::Lost,
        ([only], _) => *only,
        ([first, ..], None) => *first,
        ([first, .., last], Some(e)) => {
            if sign(at_half(func, cval, pcurr, r, *e)) == sd {
                *last
            } else {
                *first
            }
        }
    };
    StepOutcome::Next(Point2::new(pcurr.x + r * a.cos(), pcurr.y + r * a.sin()))
}

fn at_half(func: &BiPoly, cval: f64, pcurr: &Point2, r: f64, a: f64) -> f64 {
    func.evaluate(pcurr.x + 0.5 * r * a.cos(), pcurr.y + 0.5 * r * a.sin()) - cval
}

fn outside_unit(p: &Point2) -> bool {
    p.x < 0.0 || p.x > 1.0 || p.y < 0.0 || p.y > 1.0
}

fn at_unit_corner(p: &Point2) -> bool {
    (p.x == 0.0 || p.x == 1.0) && (p.y == 0.0 || p.y == 1.0)
}

/// Follow one contour from `start` until it leaves the patch.
fn track_one(func: &BiPoly, cval: f64, start: Point2, side: PatchSide, params: &TrackerParams) -> Polyline {
    let seg = params.seg_len;
    let mut line = Polyline::from_points(vec![start]);
    let mut p1 = start;
    let mut p2 = start;

    if params.square {
        let mut p0 = start;
        let mut r = 0.75 * seg;
        let mut first = true;
        loop {
            if line.len() >= params.max_points {
                debug!(max = params.max_points, "contour fragment too long, stopping");
                break;
            }
            p2 = match square_step(func, cval, &p0, &p1, r, first) {
                StepOutcome::Next(p) => p,
                StepOutcome::Lost => p1,
            };
            r = seg;

            if outside_unit(&p2) || at_unit_corner(&p2) || p2 == p1 {
                break;
            }
            let (dx, dy) = ((p2.x - p1.x).abs(), (p2.y - p1.y).abs());
            if p2.x == 0.0 || p2.x == 1.0 {
                if dx > dy {
                    break;
                }
                r = r.min(dy);
            }
            if p2.y == 0.0 || p2.y == 1.0 {
                if dy > dx {
                    break;
                }
                r = r.min(dx);
            }

            line.push(p2);
            p0 = p1;
            p1 = p2;
            first = false;
        }
    } else {
        let mut a_start = side.inward_arc_start();
        let mut a_end = a_start + PI;
        let mut r = seg;
        loop {
            if line.len() >= params.max_points {
                debug!(max = params.max_points, "contour fragment too long, stopping");
                break;
            }
            match circle_step(func, cval, &p1, r, a_start, a_end, params.num_arc, params.zero_tol) {
                StepOutcome::Next(p) => p2 = p,
                StepOutcome::Lost if r > MIN_ARC_RADIUS => {
                    r *= 0.5;
                    continue;
                }
                StepOutcome::Lost => p2 = p1,
            }
            r = seg;

            if outside_unit(&p2) || at_unit_corner(&p2) || p2 == p1 {
                break;
            }
            line.push(p2);

            // Search the next arc away from the way we came
            let back = (p1.y - p2.y).atan2(p1.x - p2.x);
            a_start = back + params.arc_gap;
            a_end = back + 2.0 * PI - params.arc_gap;
            p1 = p2;
        }
    }

    // Clip the last step to the patch boundary
    let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
    let (mut ax, mut ay) = (1.0, 1.0);
    if dx != 0.0 {
        if p2.x <= 0.0 {
            ax = -p1.x / dx;
        }
        if p2.x >= 1.0 {
            ax = (1.0 - p1.x) / dx;
        }
    }
    if dy != 0.0 {
        if p2.y <= 0.0 {
            ay = -p1.y / dy;
        }
        if p2.y >= 1.0 {
            ay = (1.0 - p1.y) / dy;
        }
    }
    if dx != 0.0 || dy != 0.0 {
        let end = if ax < ay {
            Point2::new(p2.x.clamp(0.0, 1.0), p1.y + ax * dy)
        } else {
            Point2::new(p1.x + ay * dx, p2.y.clamp(0.0, 1.0))
        };
        line.push(end);
    }
    line
}

fn on_unit_edge(p: &Point2) -> bool {
    p.x <= 0.0 || p.x >= 1.0 || p.y <= 0.0 || p.y >= 1.0
}

/// Follow the contour through the interior point `start` all the way
/// round, returning the closed line.
///
/// The contour sets off with higher values on its right and stops once it
/// comes back within a step of `start`. `None` if it reaches the patch
/// boundary, gets lost, or runs past the point limit.
pub fn track_loop(func: &BiPoly, cval: f64, start: Point2, params: &TrackerParams) -> Option<Polyline> {
    let gx = func.differentiate(Axis::X).evaluate(start.x, start.y);
    let gy = func.differentiate(Axis::Y).evaluate(start.x, start.y);
    let norm = gx.hypot(gy);
    if norm == 0.0 {
        debug!(cval, x = start.x, y = start.y, "flat start for interior contour");
        return None;
    }
    let (hx, hy) = (-gy / norm, gx / norm);
    let seg = params.seg_len;

    let mut line = Polyline::from_points(vec![start]);
    // Square mode needs a previous point on the square about `start`
    let back = seg / hx.abs().max(hy.abs());
    let mut p0 = Point2::new(start.x - back * hx, start.y - back * hy);
    let mut p1 = start;
    let mut a_start = hy.atan2(hx) - 0.5 * PI;
    let mut a_end = a_start + PI;

    loop {
        if line.len() > 2 && p1.distance_to(&start) <= seg {
            line.push(start);
            return Some(line);
        }
        if line.len() >= params.max_points {
            debug!(cval, max = params.max_points, "interior contour too long");
            return None;
        }

        let p2 = if params.square {
            square_step(func, cval, &p0, &p1, seg, line.len() == 1)
        } else {
            let mut r = seg;
            loop {
                match circle_step(func, cval, &p1, r, a_start, a_end, params.num_arc, params.zero_tol) {
                    StepOutcome::Lost if r > MIN_ARC_RADIUS => r *= 0.5,
                    outcome => break outcome,
                }
            }
        };
        let StepOutcome::Next(p2) = p2 else {
            debug!(cval, x = p1.x, y = p1.y, "lost interior contour");
            return None;
        };
        if on_unit_edge(&p2) || p2 == p1 {
            trace!(cval, x = p2.x, y = p2.y, "interior contour reached the patch edge");
            return None;
        }
        line.push(p2);

        let back = (p1.y - p2.y).atan2(p1.x - p2.x);
        a_start = back + params.arc_gap;
        a_end = back + 2.0 * PI - params.arc_gap;
        p0 = p1;
        p1 = p2;
    }
}

/// Track every contour entering the patch through `side`.
///
/// `roots` are that side's crossings of `func` (values, or zeros of a
/// derivative when `func` is one). Crossings where the contour leaves are
/// skipped. Fragments carry default styling.
pub fn track_from_side(func: &BiPoly, roots: &[BoundaryRoot], side: PatchSide, params: &TrackerParams) -> Vec<ContourFragment> {
    roots
        .iter()
        .filter(|root| root.enters(side.sense()))
        .map(|root| {
            let start = side.point_at(root.root);
            let line = track_one(func, root.cval, start, side, params);
            trace!(?side, root = root.root, cval = root.cval, npts = line.len(), "tracked contour");
            ContourFragment::new(line, root.cval, root.spec)
        })
        .collect()
}

/// Boundary side a fragment end is close to, if any.
fn end_side(pos: &Point2, tol: f64) -> Option<PatchSide> {
    if pos.y <= tol {
        Some(PatchSide::Bottom)
    } else if pos.x >= 1.0 - tol {
        Some(PatchSide::Right)
    } else if pos.y >= 1.0 - tol {
        Some(PatchSide::Top)
    } else if pos.x <= tol {
        Some(PatchSide::Left)
    } else {
        None
    }
}

/// The other side meeting `side` at the corner nearest `pos`.
fn corner_side(side: PatchSide, pos: &Point2, snap: f64) -> Option<PatchSide> {
    match side {
        PatchSide::Bottom | PatchSide::Top if pos.x <= snap => Some(PatchSide::Left),
        PatchSide::Bottom | PatchSide::Top if pos.x >= 1.0 - snap => Some(PatchSide::Right),
        PatchSide::Left | PatchSide::Right if pos.y <= snap => Some(PatchSide::Bottom),
        PatchSide::Left | PatchSide::Right if pos.y >= 1.0 - snap => Some(PatchSide::Top),
        _ => None,
    }
}

/// Snap the end of each fragment onto the closest exit crossing of the
/// same value on the boundary lists, so fragments in neighbouring patches
/// meet exactly.
pub fn tidy_fragments(fragments: &mut [ContourFragment], edges: &PatchEdges<'_>, tol: &Tolerance) {
    for frag in fragments.iter_mut() {
        let Some(pos) = frag.line.last().copied() else {
            continue;
        };
        let Some(side) = end_side(&pos, tol.tidy_end) else {
            continue;
        };
        let key = frag.key();

        let mut best: Option<(PatchSide, f64, f64)> = None;
        let mut search = |side: PatchSide| {
            let leave = side.param_of(&pos);
            for root in &edges.side(side).froots {
                if value_key(root.cval) != key || !root.leaves(side.sense()) {
                    continue;
                }
                let dist = (leave - root.root).abs();
                if dist > tol.tidy_snap {
                    continue;
                }
                if best.is_none_or(|(_, _, bdist)| dist < bdist) {
                    best = Some((side, root.root, dist));
                }
            }
        };
        search(side);
        if let Some(other) = corner_side(side, &pos, tol.tidy_snap) {
            search(other);
        }

        match best {
            Some((bside, broot, _)) => {
                if let Some(last) = frag.line.points.last_mut() {
                    *last = bside.point_at(broot);
                }
            }
            None => warn!(
                value = frag.value,
                x = pos.x,
                y = pos.y,
                "hyperspace: contour ends on the patch edge with no exit crossing to snap to"
            ),
        }
    }
}
