//! Transforms between world, spline-local and patch coordinates.

use serde::{Deserialize, Serialize};

use super::{Spline, ORDER};
use crate::error::FieldError;
use crate::geometry::point::Point2;

/// Result of locating the patch that owns a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchLocation {
    pub iu: usize,
    pub iv: usize,
    /// The point in the patch's unit square.
    pub pp: Point2,
    /// Physical width and height of the patch.
    pub size: (f64, f64),
    /// False when the point lay outside the spline domain and was clamped
    /// onto its edge.
    pub inside: bool,
}

impl Spline {
    pub fn world_to_spline(&self, pw: &Point2) -> Point2 {
        self.xform.to_local(pw)
    }

    pub fn spline_to_world(&self, ps: &Point2) -> Point2 {
        self.xform.to_world(ps)
    }

    fn check_patch(&self, iu: usize, iv: usize) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        if iu >= nu || iv >= nv {
            return Err(FieldError::PatchOutOfRange { iu, iv, nu, nv });
        }
        Ok(())
    }

    /// Lower-left knot values and extent of patch `(iu, iv)`.
    fn patch_frame(&self, iu: usize, iv: usize) -> Result<(Point2, (f64, f64)), FieldError> {
        self.check_patch(iu, iv)?;
        let (iuk, ivk) = (iu + ORDER - 1, iv + ORDER - 1);
        let corner = Point2::new(self.uknots[iuk], self.vknots[ivk]);
        let size = (
            self.uknots[iuk + 1] - self.uknots[iuk],
            self.vknots[ivk + 1] - self.vknots[ivk],
        );
        Ok((corner, size))
    }

    /// Spline-local point into the unit square of patch `(iu, iv)`,
    /// together with the patch extent.
    pub fn spline_to_patch(
        &self,
        ps: &Point2,
        iu: usize,
        iv: usize,
    ) -> Result<(Point2, (f64, f64)), FieldError> {
        let (corner, (dx, dy)) = self.patch_frame(iu, iv)?;
        let pp = Point2::new((ps.x - corner.x) / dx, (ps.y - corner.y) / dy);
        Ok((pp, (dx, dy)))
    }

    /// Patch point to spline-local. Points on a patch edge land exactly on
    /// the knot line, so neighbouring patches agree on shared edge points.
    pub fn patch_to_spline(&self, pp: &Point2, iu: usize, iv: usize) -> Result<Point2, FieldError> {
        let (corner, (dx, dy)) = self.patch_frame(iu, iv)?;
        let (iuk, ivk) = (iu + ORDER - 1, iv + ORDER - 1);
        let x = if pp.x == 1.0 { self.uknots[iuk + 1] } else { corner.x + pp.x * dx };
        let y = if pp.y == 1.0 { self.vknots[ivk + 1] } else { corner.y + pp.y * dy };
        Ok(Point2::new(x, y))
    }

    pub fn world_to_patch(
        &self,
        pw: &Point2,
        iu: usize,
        iv: usize,
    ) -> Result<(Point2, (f64, f64)), FieldError> {
        self.spline_to_patch(&self.world_to_spline(pw), iu, iv)
    }

    pub fn patch_to_world(&self, pp: &Point2, iu: usize, iv: usize) -> Result<Point2, FieldError> {
        Ok(self.spline_to_world(&self.patch_to_spline(pp, iu, iv)?))
    }

    /// Locate the patch owning a world point.
    pub fn find_patch(&self, pw: &Point2) -> PatchLocation {
        self.find_patch_unmapped(&self.world_to_spline(pw))
    }

    /// Locate the patch owning a spline-local point.
    ///
    /// Scans down from the last knot for the first one at or below the
    /// coordinate. Points beyond the domain are clamped to the nearest edge
    /// patch and onto its outer edge, and flagged as not inside.
    pub fn find_patch_unmapped(&self, ps: &Point2) -> PatchLocation {
        let (nu, nv) = self.patch_dims();
        let (iu, x, in_u) = locate_axis(&self.uknots, ps.x, nu);
        let (iv, y, in_v) = locate_axis(&self.vknots, ps.y, nv);
        let (iuk, ivk) = (iu + ORDER - 1, iv + ORDER - 1);
        let (dx, dy) = (
            self.uknots[iuk + 1] - self.uknots[iuk],
            self.vknots[ivk + 1] - self.vknots[ivk],
        );
        PatchLocation {
            iu,
            iv,
            pp: Point2::new((x - self.uknots[iuk]) / dx, (y - self.vknots[ivk]) / dy),
            size: (dx, dy),
            inside: in_u && in_v,
        }
    }

    /// Centre of the spline domain in spline-local coordinates.
    pub fn domain_centre(&self) -> Point2 {
        let (nu, nv) = self.patch_dims();
        Point2::new(
            0.5 * (self.uknots[ORDER - 1] + self.uknots[nu + ORDER - 1]),
            0.5 * (self.vknots[ORDER - 1] + self.vknots[nv + ORDER - 1]),
        )
    }
}

/// Patch index along one axis, the (possibly clamped) coordinate, and
/// whether the coordinate was within the domain.
fn locate_axis(knots: &[f64], coord: f64, npatch: usize) -> (usize, f64, bool) {
    let lo = knots[ORDER - 1];
    let hi = knots[npatch + ORDER - 1];
    let ik = knots.iter().rposition(|k| *k <= coord);
    match ik {
        Some(ik) if ik >= ORDER - 1 && ik - (ORDER - 1) < npatch => (ik + 1 - ORDER, coord, true),
        Some(ik) if ik >= ORDER - 1 => (npatch - 1, hi, coord <= hi),
        _ => (0, lo, false),
    }
}
