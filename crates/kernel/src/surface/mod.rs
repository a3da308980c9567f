//! A spline together with its patches, boundary lists and contour specs.
//!
//! Patches and intersection lists are materialised according to the
//! surface's [`AllocationPolicy`]; everything derived from the control
//! vertices is recomputed on demand after an edit.

pub mod areas;
pub mod eval;
pub mod memory;
pub mod stitch;

use field_poly::Axis;
use tracing::{debug, info, instrument, warn};

use crate::config::{AllocationPolicy, SurfaceConfig, TrackerParams};
use crate::contour::{contour_patch, patch_vectors, reset_patch_styles, ContourSpec, IntersectionList, PatchEdges, SpecKind};
use crate::error::FieldError;
use crate::grid::Grid;
use crate::spline::{Patch, PatchMask, Spline, ORDER};

pub use areas::{areas_from_curves, AreaBuild, AreaSet, RetryOutcome};
pub use eval::{Component, Curvature, Evaluation};
pub use memory::prepare_list;
pub use stitch::{BoundaryEdge, CurveSet, WorldCurve};

/// Contouring engine state for one field.
#[derive(Debug, Clone)]
pub struct Surface {
    spline: Spline,
    config: SurfaceConfig,
    specs: Vec<ContourSpec>,
    patches: Grid<Option<Patch>>,
    /// Horizontal patch edges, `nu x (nv + 1)`.
    ulist: Grid<Option<IntersectionList>>,
    /// Vertical patch edges, `(nu + 1) x nv`.
    vlist: Grid<Option<IntersectionList>>,
    params: TrackerParams,
    bands: Vec<AreaSet>,
}

impl Surface {
    pub fn new(spline: Spline, config: SurfaceConfig) -> Result<Self, FieldError> {
        config.validate()?;
        let (nu, nv) = spline.patch_dims();
        let mut surface = Self {
            params: config.tracker.tuned_for(nu, nv),
            spline,
            config,
            specs: Vec::new(),
            patches: Grid::new(nu, nv),
            ulist: Grid::new(nu, nv + 1),
            vlist: Grid::new(nu + 1, nv),
            bands: Vec::new(),
        };
        if config.policy == AllocationPolicy::Eager {
            surface.allocate_all()?;
        }
        info!(nu, nv, policy = ?config.policy, "created surface");
        Ok(surface)
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn specs(&self) -> &[ContourSpec] {
        &self.specs
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn bands(&self) -> &[AreaSet] {
        &self.bands
    }

    /// Patch grid dimensions `(nu, nv)`.
    pub fn patch_dims(&self) -> (usize, usize) {
        (self.patches.rows(), self.patches.cols())
    }

    pub(crate) fn check_patch(&self, iu: usize, iv: usize) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        if iu >= nu || iv >= nv {
            return Err(FieldError::PatchOutOfRange { iu, iv, nu, nv });
        }
        Ok(())
    }

    /// Replace the spline, resizing the patch and list grids to match.
    ///
    /// Patches kept by the resize are invalidated and every list cleared.
    pub fn define_spline(&mut self, spline: Spline) -> Result<(), FieldError> {
        let (nu, nv) = spline.patch_dims();
        self.spline = spline;
        self.patches.resize(nu, nv);
        self.ulist.resize(nu, nv + 1);
        self.vlist.resize(nu + 1, nv);
        self.patches.iter_mut().flatten().for_each(Patch::invalidate);
        self.ulist.iter_mut().chain(self.vlist.iter_mut()).flatten().for_each(IntersectionList::clear);
        self.params = self.config.tracker.tuned_for(nu, nv);
        if self.config.policy == AllocationPolicy::Eager {
            self.allocate_all()?;
        }
        debug!(nu, nv, "redefined surface spline");
        Ok(())
    }

    /// Replace the contour specs, checking each range spec's density.
    ///
    /// Existing contours keep their geometry until the next contouring
    /// call; use [`Surface::reset_styles`] to restyle them in place.
    pub fn set_specs(&mut self, specs: Vec<ContourSpec>) -> Result<(), FieldError> {
        self.specs.clear();
        for spec in specs {
            self.add_spec(spec)?;
        }
        Ok(())
    }

    pub fn add_spec(&mut self, mut spec: ContourSpec) -> Result<(), FieldError> {
        self.check_contour_density(&mut spec)?;
        self.specs.push(spec);
        Ok(())
    }

    /// Patches whose 4x4 control window contains vertex `(iu, iv)`.
    fn affected_patches(&self, iu: usize, iv: usize) -> Vec<(usize, usize)> {
        let (nu, nv) = self.patch_dims();
        let us = iu.saturating_sub(ORDER - 1)..=iu.min(nu.saturating_sub(1));
        let vs = iv.saturating_sub(ORDER - 1)..=iv.min(nv.saturating_sub(1));
        us.flat_map(|u| vs.clone().map(move |v| (u, v))).collect()
    }

    pub fn set_control_vertex(&mut self, iu: usize, iv: usize, value: f64) -> Result<(), FieldError> {
        self.spline.set_control_vertex(iu, iv, value)?;
        for (pu, pv) in self.affected_patches(iu, iv) {
            self.redefine_patch(pu, pv, false)?;
        }
        Ok(())
    }

    /// Set one vector control vertex. Magnitudes are reconciled across the
    /// whole grid, so every patch is redefined.
    pub fn set_vector_control_vertex(&mut self, iu: usize, iv: usize, u: f64, v: f64) -> Result<(), FieldError> {
        self.spline.set_vector_control_vertex(iu, iv, u, v)?;
        self.redefine_patches()
    }

    /// Redefine every patch under the allocation policy.
    pub fn redefine_patches(&mut self) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        for iu in 0..nu {
            for iv in 0..nv {
                self.redefine_patch(iu, iv, false)?;
            }
        }
        Ok(())
    }

    pub fn contour_surface(&mut self) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        // One past each side so the outer lists are recomputed too
        self.contour_surface_partial(-1, nu as isize, -1, nv as isize)
    }

    /// Recontour the block of patches `ipl..=ipr` by `ipb..=ipt`.
    ///
    /// Ranges are clamped to the patch grid. Patch functions in the block
    /// are regenerated and the lists on and inside its boundary recomputed.
    #[instrument(skip(self))]
    pub fn contour_surface_partial(&mut self, ipl: isize, ipr: isize, ipb: isize, ipt: isize) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        let (nui, nvi) = (nu as isize, nv as isize);
        let ul = ipl.max(0) as usize;
        let ur = ipr.min(nui - 1);
        let vb = ipb.max(0) as usize;
        let vt = ipt.min(nvi - 1);
        if ur < ul as isize || vt < vb as isize {
            debug!("nothing to contour");
            return Ok(());
        }
        let (ur, vt) = (ur as usize, vt as usize);

        self.params = self.config.tracker.tuned_for(nu, nv);
        for iu in ul..=ur {
            for iv in vb..=vt {
                self.redefine_patch(iu, iv, true)?;
            }
        }

        let tol = self.params.zero_tol;
        let max_levels = self.config.limits.max_levels;
        for iu in ul..=ur {
            for iv in vb..=vt + 1 {
                let (pv, y) = if iv <= vt { (iv, 0.0) } else { (vt, 1.0) };
                let Some(Some(patch)) = self.patches.get(iu, pv) else {
                    continue;
                };
                let func = *patch.function.value();
                prepare_list(&mut self.ulist, iu, iv)?.compute(&func, Axis::Y, y, &self.specs, tol, max_levels);
            }
        }
        for iv in vb..=vt {
            for iu in ul..=ur + 1 {
                let (pu, x) = if iu <= ur { (iu, 0.0) } else { (ur, 1.0) };
                let Some(Some(patch)) = self.patches.get(pu, iv) else {
                    continue;
                };
                let func = *patch.function.value();
                prepare_list(&mut self.vlist, iu, iv)?.compute(&func, Axis::X, x, &self.specs, tol, max_levels);
            }
        }

        for iu in ul..=ur {
            for iv in vb..=vt {
                let lists = (
                    self.ulist.get(iu, iv),
                    self.vlist.get(iu + 1, iv),
                    self.ulist.get(iu, iv + 1),
                    self.vlist.get(iu, iv),
                );
                let (Some(Some(bottom)), Some(Some(right)), Some(Some(top)), Some(Some(left))) = lists else {
                    warn!(iu, iv, "patch is missing a boundary list");
                    continue;
                };
                let edges = PatchEdges { bottom, right, top, left };
                let Some(Some(patch)) = self.patches.get_mut(iu, iv) else {
                    continue;
                };
                contour_patch(patch, &edges, &self.specs, &self.params, &self.config.tolerance, max_levels);
                patch_vectors(patch, &self.specs);
            }
        }

        if self.config.policy == AllocationPolicy::AllocateAndFree {
            self.release_lists();
        }
        debug!(ul, ur, vb, vt, "contoured patches");
        Ok(())
    }

    /// Lowest and highest value anywhere on the surface, including
    /// extrema inside patches.
    pub fn find_surface_range(&mut self) -> Result<(f64, f64), FieldError> {
        let (nu, nv) = self.patch_dims();
        let mut range: Option<(f64, f64)> = None;
        for iu in 0..nu {
            for iv in 0..nv {
                let (lo, hi) = self.prepare_patch(iu, iv)?.function.value().range();
                range = Some(match range {
                    Some((a, b)) => (a.min(lo), b.max(hi)),
                    None => (lo, hi),
                });
                self.dispose_patch(iu, iv);
            }
        }
        Ok(range.unwrap_or((0.0, 0.0)))
    }

    /// Warn when a range spec would give too few or too many contours
    /// over the surface, widening its step if the limits allow.
    pub fn check_contour_density(&mut self, spec: &mut ContourSpec) -> Result<(), FieldError> {
        let SpecKind::Range { min, max, step, .. } = spec.kind else {
            return Ok(());
        };
        if step <= 0.0 {
            return Ok(());
        }
        let (vmin, vmax) = self.find_surface_range()?;
        if vmax <= vmin {
            return Ok(());
        }
        if ((vmax - vmin) / step) as i64 <= 0 {
            warn!(vmin, vmax, step, "too few contours");
        }

        let (cmin, cmax) = (vmin.max(min), vmax.min(max));
        if cmax <= cmin {
            return Ok(());
        }
        let count = ((cmax - cmin) / step) as u64;
        let factor = density_factor(count, self.config.limits.max_levels);
        if factor > 1.0 {
            warn!(vmin, vmax, cmin, cmax, step, factor, "too many contours");
            if self.config.limits.adjust_step
                && let SpecKind::Range { step, .. } = &mut spec.kind
            {
                *step *= factor;
            }
        }
        Ok(())
    }

    /// Re-apply the current specs to every allocated patch's output.
    pub fn reset_styles(&mut self) {
        for patch in self.patches.iter_mut().flatten() {
            reset_patch_styles(patch, &self.specs);
        }
    }

    pub fn reset_mask(&mut self) {
        for patch in self.patches.iter_mut().flatten() {
            patch.mask = PatchMask::All;
        }
    }

    /// Mask one patch. Takes effect at the next contouring.
    pub fn set_patch_mask(&mut self, iu: usize, iv: usize, mask: PatchMask) -> Result<(), FieldError> {
        self.prepare_patch(iu, iv)?.mask = mask;
        Ok(())
    }

    /// Convert the field's units: `value * factor + offset`.
    pub fn change_units(&mut self, factor: f64, offset: f64) -> Result<(), FieldError> {
        self.spline.change_units(factor, offset);
        self.redefine_patches()
    }

    /// Compute and keep the areas of each `(lower, upper)` band.
    pub fn compute_bands(&mut self, levels: &[(f64, f64)]) -> Result<(), FieldError> {
        let bands = levels
            .iter()
            .map(|(lower, upper)| self.contour_areaset(*lower, *upper, None))
            .collect::<Result<Vec<_>, _>>()?;
        self.bands = bands;
        Ok(())
    }
}

/// How much to widen a range step giving `count` contours so that around
/// `max_levels` or fewer remain. Counts below 100 are left alone.
pub fn density_factor(count: u64, max_levels: usize) -> f64 {
    let digits = count.checked_ilog10().map_or(1, |d| d + 1);
    if digits <= 2 {
        return 1.0;
    }
    let fact = 10f64.powi(digits as i32 - 3);
    let over = (count as f64 / fact / max_levels.max(1) as f64) as u64;
    fact * (over + 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ContourSpec;
    use crate::geometry::transform::Xform;

    /// 6x6 grid with `cv = iu`, three patches across.
    pub(crate) fn ramp_surface(policy: AllocationPolicy) -> Surface {
        let values = (0..6).flat_map(|iu| (0..6).map(move |_| iu as f64)).collect();
        let spline = Spline::scalar(6, 6, Xform::identity(), 1.0, values).unwrap();
        Surface::new(spline, SurfaceConfig::default().with_policy(policy)).unwrap()
    }

    #[test]
    fn test_density_factor() {
        assert_eq!(density_factor(99, 250), 1.0);
        assert_eq!(density_factor(200, 250), 1.0);
        assert_eq!(density_factor(300, 250), 2.0);
        assert_eq!(density_factor(1000, 250), 10.0);
        assert_eq!(density_factor(0, 250), 1.0);
    }

    #[test]
    fn test_grids_follow_spline() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        assert_eq!(sfc.patch_dims(), (3, 3));
        assert_eq!((sfc.ulist.rows(), sfc.ulist.cols()), (3, 4));
        assert_eq!((sfc.vlist.rows(), sfc.vlist.cols()), (4, 3));

        let bigger = Spline::uniform(8, 5, Xform::identity(), 1.0, 0.0).unwrap();
        sfc.define_spline(bigger).unwrap();
        assert_eq!(sfc.patch_dims(), (5, 2));
        assert_eq!((sfc.ulist.rows(), sfc.ulist.cols()), (5, 3));
        assert_eq!((sfc.vlist.rows(), sfc.vlist.cols()), (6, 2));
    }

    #[test]
    fn test_surface_range() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        let (lo, hi) = sfc.find_surface_range().unwrap();
        assert!((lo - 1.0).abs() < 1e-9);
        assert!((hi - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_surface_range_sees_interior_dip() {
        // a 2x2 block of low vertices dips below every edge value
        let values = (0..5)
            .flat_map(|iu| (0..5).map(move |iv| if (1..=2).contains(&iu) && (1..=2).contains(&iv) { 3.85 } else { 5.0 }))
            .collect();
        let spline = Spline::scalar(5, 5, Xform::identity(), 1.0, values).unwrap();
        let mut sfc = Surface::new(spline, SurfaceConfig::default().with_policy(AllocationPolicy::Lazy)).unwrap();
        let (lo, hi) = sfc.find_surface_range().unwrap();
        // 5 - 1.15 * (23 / 24)^2 at the centre of patch (0, 0)
        assert!((lo - (5.0 - 1.15 * (23.0f64 / 24.0).powi(2))).abs() < 1e-9, "lo = {lo}");
        assert!(hi <= 5.0 + 1e-9);
    }

    #[test]
    fn test_add_spec_widens_dense_range() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        // range 1..4 with step 0.01 gives 300 contours
        sfc.add_spec(ContourSpec::range(0.0, 10.0, 0.0, 0.01)).unwrap();
        let SpecKind::Range { step, .. } = sfc.specs()[0].kind else {
            panic!("range spec expected");
        };
        assert!((step - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_contour_ramp_surface() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        sfc.set_specs(vec![ContourSpec::list(vec![1.5, 2.5])]).unwrap();
        sfc.contour_surface().unwrap();
        let mut count = 0;
        for patch in sfc.patches.iter().flatten() {
            assert!(patch.is_contoured());
            for frag in patch.contours.iter() {
                let value = patch.value_at(frag.line.first().unwrap());
                assert!((value - frag.value).abs() < 1e-6);
                count += 1;
            }
        }
        // each value crosses one column of three patches
        assert_eq!(count, 6);
    }

    #[test]
    fn test_vertex_edit_invalidates_window() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        sfc.find_surface_range().unwrap();
        sfc.set_control_vertex(1, 1, 10.0).unwrap();
        assert!(!sfc.get_patch(0, 0).unwrap().defined);
        assert!(!sfc.get_patch(1, 1).unwrap().defined);
        assert!(sfc.get_patch(2, 2).unwrap().defined);
    }

    #[test]
    fn test_partial_range_is_clamped() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        sfc.set_specs(vec![ContourSpec::list(vec![2.5])]).unwrap();
        sfc.contour_surface_partial(1, 7, -3, 0).unwrap();
        assert!(sfc.get_patch(0, 0).is_none());
        assert!(sfc.get_patch(1, 0).unwrap().is_contoured());
        assert!(sfc.get_patch(2, 0).unwrap().is_contoured());
        assert!(sfc.get_patch(1, 1).is_none());
        // empty block
        sfc.contour_surface_partial(2, 1, 0, 0).unwrap();
    }

    #[test]
    fn test_change_units_recontours_values() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        sfc.change_units(10.0, 0.0).unwrap();
        let (lo, hi) = sfc.find_surface_range().unwrap();
        assert!((lo - 10.0).abs() < 1e-9);
        assert!((hi - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_patch_mask_hides_contours() {
        let mut sfc = ramp_surface(AllocationPolicy::Lazy);
        sfc.set_specs(vec![ContourSpec::list(vec![2.5])]).unwrap();
        sfc.set_patch_mask(1, 1, PatchMask::Nothing).unwrap();
        sfc.contour_surface().unwrap();
        assert!(sfc.get_patch(1, 1).unwrap().contours.is_empty());
        assert_eq!(sfc.get_patch(1, 0).unwrap().contours.len(), 1);

        sfc.reset_mask();
        sfc.contour_surface().unwrap();
        assert_eq!(sfc.get_patch(1, 1).unwrap().contours.len(), 1);
    }
}
