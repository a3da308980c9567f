//! Boundary root caches ("intersection lists") for patch edges.
//!
//! Each patch edge carries the places where the patch function meets a
//! requested contour value, plus the places where `df/dx` and `df/dy`
//! vanish. The tracker starts contours from the former and the extrema
//! search starts derivative curves from the latter.

use field_poly::{Axis, BiPoly, UniPoly, unipoly::MAX_EXPLICIT_ORDER};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::spec::ContourSpec;
use crate::geometry::point::Point2;

/// Slack on the edge range and on end-point roots.
const FTOL: f64 = 1e-6;

/// Sign convention used throughout tracking: zero counts as positive.
pub(crate) fn sign(x: f64) -> i8 {
    if x < 0.0 { -1 } else { 1 }
}

/// One side of a patch's unit square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchSide {
    Bottom,
    Right,
    Top,
    Left,
}

impl PatchSide {
    pub const ALL: [PatchSide; 4] = [Self::Bottom, Self::Right, Self::Top, Self::Left];

    /// +1 where the edge parameter runs counter-clockwise around the
    /// patch (bottom, right), -1 where it runs clockwise (top, left).
    pub fn sense(self) -> i8 {
        match self {
            Self::Bottom | Self::Right => 1,
            Self::Top | Self::Left => -1,
        }
    }

    /// Patch point at parameter `t` along this side.
    pub fn point_at(self, t: f64) -> Point2 {
        match self {
            Self::Bottom => Point2::new(t, 0.0),
            Self::Right => Point2::new(1.0, t),
            Self::Top => Point2::new(t, 1.0),
            Self::Left => Point2::new(0.0, t),
        }
    }

    /// Edge parameter of a point on (or near) this side.
    pub fn param_of(self, p: &Point2) -> f64 {
        match self {
            Self::Bottom | Self::Top => p.x,
            Self::Right | Self::Left => p.y,
        }
    }

    /// Angle (radians) where the counter-clockwise half circle of
    /// directions pointing into the patch begins.
    pub fn inward_arc_start(self) -> f64 {
        use std::f64::consts::{FRAC_PI_2, PI};
        match self {
            Self::Bottom => 0.0,
            Self::Right => FRAC_PI_2,
            Self::Top => PI,
            Self::Left => 3.0 * FRAC_PI_2,
        }
    }
}

/// The four boundary lists of one patch.
#[derive(Debug, Clone, Copy)]
pub struct PatchEdges<'a> {
    pub bottom: &'a IntersectionList,
    pub right: &'a IntersectionList,
    pub top: &'a IntersectionList,
    pub left: &'a IntersectionList,
}

impl<'a> PatchEdges<'a> {
    pub fn side(&self, side: PatchSide) -> &'a IntersectionList {
        match side {
            PatchSide::Bottom => self.bottom,
            PatchSide::Right => self.right,
            PatchSide::Top => self.top,
            PatchSide::Left => self.left,
        }
    }
}

/// One crossing of a contour value along a patch edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRoot {
    pub cval: f64,
    /// Position along the edge in `[0, 1]`.
    pub root: f64,
    /// Slope of the edge function at the root.
    pub slope: f64,
    /// Contour spec that asked for `cval`.
    pub spec: Option<usize>,
}

impl BoundaryRoot {
    /// True if a contour crossing here enters the patch from a side with
    /// sense `sside` (+1 for bottom and right, -1 for top and left).
    ///
    /// Looking into the patch, higher values lie to the right.
    pub fn enters(&self, sside: i8) -> bool {
        self.slope == 0.0 || sign(self.slope) == sside
    }

    /// True if a contour crossing here leaves the patch through that side.
    pub fn leaves(&self, sside: i8) -> bool {
        self.slope == 0.0 || sign(self.slope) != sside
    }
}

/// What the roots of an edge polynomial stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootKind {
    /// `f = c` for the contour values.
    Value,
    /// `df/dx = 0`.
    DfDx,
    /// `df/dy = 0`.
    DfDy,
}

/// Roots along one patch edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntersectionList {
    pub froots: Vec<BoundaryRoot>,
    pub xroots: Vec<BoundaryRoot>,
    pub yroots: Vec<BoundaryRoot>,
    pub defined: bool,
}

impl IntersectionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.froots.clear();
        self.xroots.clear();
        self.yroots.clear();
        self.defined = false;
    }

    pub fn roots(&self, kind: RootKind) -> &[BoundaryRoot] {
        match kind {
            RootKind::Value => &self.froots,
            RootKind::DfDx => &self.xroots,
            RootKind::DfDy => &self.yroots,
        }
    }

    /// Recompute from the patch function restricted to the edge
    /// `fixed = value` (`Axis::Y` for horizontal edges, `Axis::X` for
    /// vertical ones). No spec contributes more than `max_levels` values.
    pub fn compute(
        &mut self,
        func: &BiPoly,
        fixed: Axis,
        value: f64,
        specs: &[ContourSpec],
        zero_tol: f64,
        max_levels: usize,
    ) {
        self.clear();
        if specs.is_empty() {
            return;
        }
        let zero = [ContourSpec::zero()];

        self.froots = find_roots(&func.project(fixed, value), specs, true, zero_tol, max_levels);
        self.xroots = find_roots(
            &func.differentiate(Axis::X).project(fixed, value),
            &zero,
            false,
            zero_tol,
            max_levels,
        );
        self.yroots = find_roots(
            &func.differentiate(Axis::Y).project(fixed, value),
            &zero,
            false,
            zero_tol,
            max_levels,
        );
        self.defined = true;
        trace!(
            ?fixed,
            value,
            nf = self.froots.len(),
            nx = self.xroots.len(),
            ny = self.yroots.len(),
            "computed intersection list"
        );
    }
}

/// Roots of `proj = c` on `[0, 1]` for every contour value the specs ask
/// for within the edge's range, grouped by spec then value.
///
/// The edge is split into monotone pieces at the stationary points of
/// `proj`, so the range and the per-piece brackets only need the
/// derivative roots once. `tag_specs` records which spec asked for each
/// root.
pub fn find_roots(
    proj: &UniPoly,
    specs: &[ContourSpec],
    tag_specs: bool,
    zero_tol: f64,
    max_levels: usize,
) -> Vec<BoundaryRoot> {
    let (xstart, xend) = (0.0, 1.0);
    let dfdu = proj.differentiate();
    let stationary = dfdu.roots(0.0, xstart, xend);

    let fstart = proj.evaluate(xstart);
    let fend = proj.evaluate(xend);
    let fseg: Vec<f64> = stationary.iter().map(|x| proj.evaluate(*x)).collect();
    let vmin = fseg.iter().fold(fstart.min(fend), |a, f| a.min(*f)) - FTOL;
    let vmax = fseg.iter().fold(fstart.max(fend), |a, f| a.max(*f)) + FTOL;

    let mut out = Vec::new();
    for (ispec, spec) in specs.iter().enumerate() {
        let tag = tag_specs.then_some(ispec);
        for cval in spec.levels_in(vmin, vmax, max_levels) {
            let mut add = |root: f64| {
                out.push(BoundaryRoot {
                    cval,
                    root,
                    slope: dfdu.evaluate(root),
                    spec: tag,
                })
            };

            if proj.order() <= MAX_EXPLICIT_ORDER {
                proj.roots(cval, xstart, xend).into_iter().for_each(&mut add);
                continue;
            }

            let mut x1 = xstart;
            let mut f1 = fstart - cval;
            let ends = stationary.iter().copied().zip(fseg.iter().copied()).chain([(xend, fend)]);
            for (x2, fx2) in ends {
                let f2 = fx2 - cval;
                if sign(f1) != sign(f2) {
                    if let Ok(root) = proj.zeroin(cval, x1, x2, zero_tol) {
                        add(root);
                    }
                } else if f1.abs() <= FTOL {
                    add(x1);
                } else if f2.abs() <= FTOL {
                    add(x2);
                }
                x1 = x2;
                f1 = f2;
            }
        }
    }
    out
}
