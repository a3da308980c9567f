//! Per-cell polynomial patches and the contour geometry they own.

use field_poly::BiPoly;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{patch_function, Dimension, Spline};
use crate::contour::items::{ContourFragment, ExtremumMark, VectorBarb};
use crate::error::FieldError;
use crate::geometry::curves::Polyline;
use crate::geometry::items::ItemSet;
use crate::geometry::point::Point2;

/// The polynomial(s) valid on one patch, in unit patch coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchFunction {
    Scalar(BiPoly),
    /// Magnitude comes from the reconciled magnitude control vertices,
    /// `u` and `v` from the component arrays.
    Vector { mag: BiPoly, u: BiPoly, v: BiPoly },
}

impl Default for PatchFunction {
    fn default() -> Self {
        Self::Scalar(BiPoly::zero())
    }
}

impl PatchFunction {
    /// The function that gets contoured: the scalar value or the magnitude.
    pub fn value(&self) -> &BiPoly {
        match self {
            Self::Scalar(f) => f,
            Self::Vector { mag, .. } => mag,
        }
    }

    /// Component functions of a vector patch.
    pub fn components(&self) -> Option<(&BiPoly, &BiPoly)> {
        match self {
            Self::Vector { u, v, .. } => Some((u, v)),
            Self::Scalar(_) => None,
        }
    }
}

/// Which part of a patch takes part in contouring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PatchMask {
    #[default]
    All,
    Nothing,
    /// Polygons in patch coordinates. Fragments entirely outside all of
    /// them are hidden.
    Partial(Vec<Polyline>),
}

impl PatchMask {
    pub fn admits_point(&self, p: &Point2) -> bool {
        match self {
            Self::All => true,
            Self::Nothing => false,
            Self::Partial(polys) => polys.iter().any(|poly| poly.contains_point(p)),
        }
    }

    /// True if any point of `line` falls inside the mask.
    pub fn admits(&self, line: &Polyline) -> bool {
        matches!(self, Self::All) || line.points.iter().any(|p| self.admits_point(p))
    }
}

/// One cell of the spline domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub iu: usize,
    pub iv: usize,
    pub function: PatchFunction,
    /// False until `function` matches the current control vertices.
    pub defined: bool,
    pub mask: PatchMask,
    pub contours: ItemSet<ContourFragment>,
    pub extrema: ItemSet<ExtremumMark>,
    pub vectors: ItemSet<VectorBarb>,
    contoured: bool,
}

impl Patch {
    pub fn new(iu: usize, iv: usize) -> Self {
        Self {
            iu,
            iv,
            function: PatchFunction::default(),
            defined: false,
            mask: PatchMask::All,
            contours: ItemSet::new(),
            extrema: ItemSet::new(),
            vectors: ItemSet::new(),
            contoured: false,
        }
    }

    /// Generate the patch function from the spline if it is stale.
    ///
    /// Returns whether the function was regenerated.
    pub fn define(&mut self, spline: &Spline) -> Result<bool, FieldError> {
        if self.defined {
            return Ok(false);
        }
        let (nu, nv) = spline.patch_dims();
        if self.iu >= nu || self.iv >= nv {
            return Err(FieldError::PatchOutOfRange {
                iu: self.iu,
                iv: self.iv,
                nu,
                nv,
            });
        }
        let (iu, iv) = (self.iu, self.iv);
        self.function = match &spline.dim {
            Dimension::Scalar { cv } => PatchFunction::Scalar(patch_function(&Spline::window(cv, iu, iv))),
            Dimension::Vector2D { cv, cvx, cvy } => PatchFunction::Vector {
                mag: patch_function(&Spline::window(cv, iu, iv)),
                u: patch_function(&Spline::window(cvx, iu, iv)),
                v: patch_function(&Spline::window(cvy, iu, iv)),
            },
        };
        self.defined = true;
        trace!(iu, iv, "defined patch function");
        Ok(true)
    }

    /// Mark the function stale and drop anything derived from it.
    pub fn invalidate(&mut self) {
        self.defined = false;
        self.clear_outputs();
    }

    pub fn clear_outputs(&mut self) {
        self.contours.clear();
        self.extrema.clear();
        self.vectors.clear();
        self.contoured = false;
    }

    pub(crate) fn mark_contoured(&mut self) {
        self.contoured = true;
    }

    /// True once contouring has produced output for this patch. Such
    /// patches survive disposal under the allocate-and-free policy.
    pub fn is_contoured(&self) -> bool {
        self.contoured
            || !self.contours.is_empty()
            || !self.extrema.is_empty()
            || !self.vectors.is_empty()
    }

    /// Value of the contoured function at a patch point.
    pub fn value_at(&self, pp: &Point2) -> f64 {
        self.function.value().evaluate(pp.x, pp.y)
    }
}
