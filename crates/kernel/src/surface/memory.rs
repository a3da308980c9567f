//! Patch and boundary list lifetimes under each [`AllocationPolicy`].

use tracing::trace;

use super::Surface;
use crate::config::AllocationPolicy;
use crate::contour::IntersectionList;
use crate::error::FieldError;
use crate::grid::Grid;
use crate::spline::Patch;

/// The list at `(iu, iv)` of an edge grid, allocated on first use.
pub fn prepare_list(
    grid: &mut Grid<Option<IntersectionList>>,
    iu: usize,
    iv: usize,
) -> Result<&mut IntersectionList, FieldError> {
    let (rows, cols) = (grid.rows(), grid.cols());
    grid.get_mut(iu, iv)
        .map(|slot| slot.get_or_insert_with(IntersectionList::new))
        .ok_or(FieldError::EdgeOutOfRange { iu, iv, rows, cols })
}

impl Surface {
    /// The patch at `(iu, iv)` if it is currently allocated.
    pub fn get_patch(&self, iu: usize, iv: usize) -> Option<&Patch> {
        self.patches.get(iu, iv)?.as_ref()
    }

    /// Allocate patch `(iu, iv)` if needed and bring its function up to
    /// date with the spline.
    pub fn prepare_patch(&mut self, iu: usize, iv: usize) -> Result<&mut Patch, FieldError> {
        self.check_patch(iu, iv)?;
        let (nu, nv) = self.patch_dims();
        let slot = self
            .patches
            .get_mut(iu, iv)
            .ok_or(FieldError::PatchOutOfRange { iu, iv, nu, nv })?;
        let patch = slot.get_or_insert_with(|| Patch::new(iu, iv));
        if patch.define(&self.spline)? {
            trace!(iu, iv, "prepared patch");
        }
        Ok(patch)
    }

    /// Called when a caller is done with a patch. Under allocate-and-free
    /// the patch is released unless it holds contour output.
    pub fn dispose_patch(&mut self, iu: usize, iv: usize) {
        if self.config.policy != AllocationPolicy::AllocateAndFree {
            return;
        }
        if let Some(slot) = self.patches.get_mut(iu, iv)
            && slot.as_ref().is_some_and(|p| !p.is_contoured())
        {
            *slot = None;
        }
    }

    pub fn destroy_patch(&mut self, iu: usize, iv: usize) {
        if let Some(slot) = self.patches.get_mut(iu, iv) {
            *slot = None;
        }
    }

    /// React to a change in the control vertices under patch `(iu, iv)`.
    ///
    /// Unless `force` is set, lazy surfaces only mark the patch stale,
    /// allocate-and-free surfaces drop it, and eager surfaces regenerate
    /// it at once. Forced redefinition always regenerates.
    pub fn redefine_patch(&mut self, iu: usize, iv: usize, force: bool) -> Result<(), FieldError> {
        self.check_patch(iu, iv)?;
        if !force {
            match self.config.policy {
                AllocationPolicy::Lazy => {
                    if let Some(Some(patch)) = self.patches.get_mut(iu, iv) {
                        patch.invalidate();
                    }
                    return Ok(());
                }
                AllocationPolicy::AllocateAndFree => {
                    self.destroy_patch(iu, iv);
                    return Ok(());
                }
                AllocationPolicy::Eager => {}
            }
        }
        if let Some(Some(patch)) = self.patches.get_mut(iu, iv) {
            patch.invalidate();
        }
        self.prepare_patch(iu, iv)?;
        Ok(())
    }

    /// Run `f` on a prepared patch, disposing of it afterwards.
    pub fn with_patch<R>(&mut self, iu: usize, iv: usize, f: impl FnOnce(&Patch) -> R) -> Result<R, FieldError> {
        let result = f(self.prepare_patch(iu, iv)?);
        self.dispose_patch(iu, iv);
        Ok(result)
    }

    pub fn destroy_ulist(&mut self, iu: usize, iv: usize) {
        if let Some(slot) = self.ulist.get_mut(iu, iv) {
            *slot = None;
        }
    }

    pub fn destroy_vlist(&mut self, iu: usize, iv: usize) {
        if let Some(slot) = self.vlist.get_mut(iu, iv) {
            *slot = None;
        }
    }

    /// Number of allocated patches and boundary lists.
    pub fn allocated(&self) -> (usize, usize) {
        let patches = self.patches.iter().flatten().count();
        let lists = self.ulist.iter().chain(self.vlist.iter()).flatten().count();
        (patches, lists)
    }

    pub(crate) fn release_lists(&mut self) {
        self.ulist.iter_mut().chain(self.vlist.iter_mut()).for_each(|slot| *slot = None);
    }

    /// Allocate and define every patch and list up front.
    pub(crate) fn allocate_all(&mut self) -> Result<(), FieldError> {
        let (nu, nv) = self.patch_dims();
        for iu in 0..nu {
            for iv in 0..nv {
                self.prepare_patch(iu, iv)?;
            }
        }
        for slot in self.ulist.iter_mut().chain(self.vlist.iter_mut()) {
            slot.get_or_insert_with(IntersectionList::new);
        }
        Ok(())
    }
}
