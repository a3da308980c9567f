//! Joining per-patch contour fragments into whole world curves.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::Surface;
use crate::contour::ContourSpec;
use crate::error::FieldError;
use crate::geometry::curves::Polyline;
use crate::geometry::items::ItemKey;
use crate::geometry::point::Point2;
use crate::spline::Patch;

/// Edge of the spline domain a curve enters or leaves by.
///
/// The ordering is the anticlockwise walk used by the area builder,
/// starting from the bottom of the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoundaryEdge {
    Left,
    Top,
    Right,
    Bottom,
    /// The curve is a closed loop inside the domain.
    Closed,
}

/// One contour line in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldCurve {
    pub line: Polyline,
    pub value: f64,
    pub entry: BoundaryEdge,
    pub exit: BoundaryEdge,
}

impl WorldCurve {
    pub fn is_closed(&self) -> bool {
        self.entry == BoundaryEdge::Closed
    }
}

/// Every curve of one contour value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub curves: Vec<WorldCurve>,
    /// Set when a curve could not be followed cleanly. Curves that were
    /// kept are still usable.
    pub failed: bool,
}

impl CurveSet {
    pub fn open(&self) -> impl Iterator<Item = &WorldCurve> {
        self.curves.iter().filter(|c| !c.is_closed())
    }

    pub fn closed(&self) -> impl Iterator<Item = &WorldCurve> {
        self.curves.iter().filter(|c| c.is_closed())
    }
}

/// Which edges of its patch a fragment end lies on.
#[derive(Debug, Clone, Copy)]
struct Exits {
    left: bool,
    right: bool,
    bottom: bool,
    top: bool,
}

impl Exits {
    fn of(p: &Point2) -> Self {
        Self {
            left: p.x <= 0.0,
            right: p.x >= 1.0,
            bottom: p.y <= 0.0,
            top: p.y >= 1.0,
        }
    }

    fn any(&self) -> bool {
        self.left || self.right || self.bottom || self.top
    }

    fn edge(&self) -> Option<BoundaryEdge> {
        if self.left {
            Some(BoundaryEdge::Left)
        } else if self.top {
            Some(BoundaryEdge::Top)
        } else if self.right {
            Some(BoundaryEdge::Right)
        } else if self.bottom {
            Some(BoundaryEdge::Bottom)
        } else {
            None
        }
    }

    /// True if the exit lies on the outer boundary of a `nu x nv` grid.
    fn on_boundary(&self, iu: usize, iv: usize, nu: usize, nv: usize) -> bool {
        (self.left && iu == 0)
            || (self.right && iu + 1 == nu)
            || (self.bottom && iv == 0)
            || (self.top && iv + 1 == nv)
    }

    /// Neighbouring patches a curve leaving at `end` may continue into,
    /// with the entry point to look for. Corners first.
    fn neighbours(&self, end: &Point2) -> Vec<(isize, isize, Point2)> {
        let mut out = Vec::with_capacity(4);
        if self.left && self.top {
            out.push((-1, 1, Point2::new(1.0, 0.0)));
        }
        if self.top && self.right {
            out.push((1, 1, Point2::new(0.0, 0.0)));
        }
        if self.right && self.bottom {
            out.push((1, -1, Point2::new(0.0, 1.0)));
        }
        if self.bottom && self.left {
            out.push((-1, -1, Point2::new(1.0, 1.0)));
        }
        if self.left {
            out.push((-1, 0, Point2::new(1.0, end.y)));
        }
        if self.top {
            out.push((0, 1, Point2::new(end.x, 0.0)));
        }
        if self.right {
            out.push((1, 0, Point2::new(0.0, end.y)));
        }
        if self.bottom {
            out.push((0, -1, Point2::new(end.x, 1.0)));
        }
        out
    }
}

/// Result of following one curve to its end.
struct Traced {
    line: Polyline,
    exit: Option<BoundaryEdge>,
    at_boundary: bool,
}

impl Surface {
    /// Contour the surface at a single value and join the pieces into
    /// world curves.
    ///
    /// Open curves are collected by walking the domain boundary anticlockwise
    /// (left, top, right, bottom); anything left over is a closed loop.
    /// The surface itself is untouched.
    #[instrument(skip(self))]
    pub fn contour_curveset(&self, value: f64) -> Result<CurveSet, FieldError> {
        let mut work = self.clone();
        work.patches.iter_mut().flatten().for_each(Patch::clear_outputs);
        work.specs = vec![ContourSpec::list(vec![value])];
        work.contour_surface()?;

        let (nu, nv) = work.patch_dims();
        let mut set = CurveSet::default();

        let left = (0..nv).map(|iv| (0, iv));
        let top = (0..nu).map(|iu| (iu, nv - 1));
        let right = (0..nv).rev().map(|iv| (nu - 1, iv));
        let bottom = (0..nu).rev().map(|iu| (iu, 0));
        let starts: [(BoundaryEdge, Vec<(usize, usize)>, fn(&Point2) -> bool); 4] = [
            (BoundaryEdge::Left, left.collect(), |p| p.x == 0.0),
            (BoundaryEdge::Top, top.collect(), |p| p.y == 1.0),
            (BoundaryEdge::Right, right.collect(), |p| p.x == 1.0),
            (BoundaryEdge::Bottom, bottom.collect(), |p| p.y == 0.0),
        ];

        for (entry, patches, starts_here) in starts {
            for (iu, iv) in patches {
                while let Some(key) = work.find_fragment(iu as isize, iv as isize, |start| starts_here(start)) {
                    let traced = work.follow(iu, iv, key)?;
                    let Some(exit) = traced.exit else {
                        error!(?entry, iu, iv, value, "open contour has no exit point");
                        set.failed = true;
                        continue;
                    };
                    if !traced.at_boundary {
                        error!(?entry, ?exit, value, "contour enters but does not exit at the boundary");
                        set.failed = true;
                    }
                    let mut line = traced.line;
                    line.condense();
                    set.curves.push(WorldCurve { line, value, entry, exit });
                }
            }
        }

        let tol = work.config.tolerance;
        for iu in 0..nu {
            for iv in 0..nv {
                while let Some(key) = work.find_fragment(iu as isize, iv as isize, |_| true) {
                    let traced = work.follow(iu, iv, key)?;
                    if traced.exit.is_none() {
                        error!(iu, iv, value, "closed contour has no exit point");
                        set.failed = true;
                        continue;
                    }
                    let mut line = traced.line;
                    line.condense();
                    if !line.is_closed() {
                        error!(iu, iv, value, npts = line.len(), "interior contour is not closed");
                        set.failed = true;
                        continue;
                    }
                    let size = line.signed_area().abs();
                    if tol.discard_loop(size, || line.self_crossing()) {
                        warn!(value, size, npts = line.len(), "dropping degenerate closed contour");
                        continue;
                    }
                    set.curves.push(WorldCurve {
                        line,
                        value,
                        entry: BoundaryEdge::Closed,
                        exit: BoundaryEdge::Closed,
                    });
                }
            }
        }

        debug!(value, curves = set.curves.len(), failed = set.failed, "built curve set");
        Ok(set)
    }

    /// First fragment of patch `(iu, iv)` with at least two points whose
    /// start satisfies `starts`.
    fn find_fragment(&self, iu: isize, iv: isize, starts: impl Fn(&Point2) -> bool) -> Option<ItemKey> {
        let (iu, iv) = (usize::try_from(iu).ok()?, usize::try_from(iv).ok()?);
        self.get_patch(iu, iv)?
            .contours
            .find(|frag| frag.line.len() > 1 && frag.line.first().is_some_and(&starts))
    }

    /// Consume fragment `key` of patch `(iu, iv)` and every fragment it
    /// continues into, returning the joined world line.
    fn follow(&mut self, mut iu: usize, mut iv: usize, mut key: ItemKey) -> Result<Traced, FieldError> {
        let (nu, nv) = self.patch_dims();
        let mut line = Polyline::new();
        loop {
            let frag = self
                .patches
                .get_mut(iu, iv)
                .and_then(Option::as_mut)
                .and_then(|patch| patch.contours.remove(key));
            let Some((frag, end)) = frag.and_then(|f| f.line.last().copied().map(|end| (f, end))) else {
                return Ok(Traced { line, exit: None, at_boundary: false });
            };
            let world = frag
                .line
                .points
                .iter()
                .map(|p| self.spline.patch_to_world(p, iu, iv))
                .collect::<Result<Vec<_>, _>>()?;
            line.append(&Polyline::from_points(world));

            let exits = Exits::of(&end);
            if !exits.any() {
                if frag.line.is_closed() {
                    return Ok(Traced { line, exit: Some(BoundaryEdge::Closed), at_boundary: false });
                }
                error!(iu, iv, x = end.x, y = end.y, "contour fragment ends inside its patch");
            }
            let next = exits.neighbours(&end).into_iter().find_map(|(du, dv, at)| {
                let (ju, jv) = (iu as isize + du, iv as isize + dv);
                let k = self.find_fragment(ju, jv, |start| *start == at)?;
                Some((ju as usize, jv as usize, k))
            });
            match next {
                Some((ju, jv, k)) => (iu, iv, key) = (ju, jv, k),
                None => {
                    return Ok(Traced {
                        line,
                        exit: exits.edge(),
                        at_boundary: exits.on_boundary(iu, iv, nu, nv),
                    });
                }
            }
        }
    }
}
