//! Bicubic B-spline fields over a uniform knot grid.

pub mod basis;
pub mod coords;
pub mod patch;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FieldError;
use crate::geometry::transform::{Projection, Xform};
use crate::grid::Grid;

pub use basis::{evaluate_basis, evaluate_basis_deriv, patch_function, ORDER};
pub use coords::PatchLocation;
pub use patch::{Patch, PatchFunction, PatchMask};

/// Control vertex payload of a spline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    Scalar {
        cv: Grid<f64>,
    },
    /// Two-component field. `cv` holds the magnitude control vertices,
    /// kept consistent with `cvx`/`cvy` on every edit.
    Vector2D {
        cv: Grid<f64>,
        cvx: Grid<f64>,
        cvy: Grid<f64>,
    },
}

/// A bicubic B-spline over an `m x n` control vertex grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub m: usize,
    pub n: usize,
    /// Uniform knot spacing.
    pub gridlen: f64,
    /// Placement of the spline frame in world coordinates.
    pub xform: Xform,
    /// Projection used to correct derivatives.
    pub projection: Projection,
    pub uknots: Vec<f64>,
    pub vknots: Vec<f64>,
    pub dim: Dimension,
}

fn uniform_knots(count: usize, gridlen: f64) -> Vec<f64> {
    (0..count + ORDER)
        .map(|i| gridlen * (i as f64 - (ORDER - 1) as f64))
        .collect()
}

fn check_shape(m: usize, n: usize, gridlen: f64) -> Result<(), FieldError> {
    if m < ORDER || n < ORDER {
        return Err(FieldError::InvalidGrid { m, n });
    }
    if !(gridlen > 0.0) {
        return Err(FieldError::InvalidGridLength { gridlen });
    }
    Ok(())
}

fn control_grid(m: usize, n: usize, values: Vec<f64>) -> Result<Grid<f64>, FieldError> {
    let got = values.len();
    Grid::from_vec(m, n, values).ok_or(FieldError::ControlArrayMismatch {
        expected: m * n,
        got,
    })
}

impl Spline {
    /// Scalar spline from row-major control vertices (`values[iu * n + iv]`).
    pub fn scalar(
        m: usize,
        n: usize,
        xform: Xform,
        gridlen: f64,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        check_shape(m, n, gridlen)?;
        let cv = control_grid(m, n, values)?;
        debug!(m, n, gridlen, "defined scalar spline");
        Ok(Self {
            m,
            n,
            gridlen,
            xform,
            projection: Projection::Plain,
            uknots: uniform_knots(m, gridlen),
            vknots: uniform_knots(n, gridlen),
            dim: Dimension::Scalar { cv },
        })
    }

    /// Scalar spline with every control vertex set to `value`.
    pub fn uniform(
        m: usize,
        n: usize,
        xform: Xform,
        gridlen: f64,
        value: f64,
    ) -> Result<Self, FieldError> {
        Self::scalar(m, n, xform, gridlen, vec![value; m * n])
    }

    /// Vector spline from row-major component control vertices.
    pub fn vector(
        m: usize,
        n: usize,
        xform: Xform,
        gridlen: f64,
        u: Vec<f64>,
        v: Vec<f64>,
    ) -> Result<Self, FieldError> {
        check_shape(m, n, gridlen)?;
        let cvx = control_grid(m, n, u)?;
        let cvy = control_grid(m, n, v)?;
        let cv = magnitude_control_vertices(&cvx, &cvy);
        debug!(m, n, gridlen, "defined vector spline");
        Ok(Self {
            m,
            n,
            gridlen,
            xform,
            projection: Projection::Plain,
            uknots: uniform_knots(m, gridlen),
            vknots: uniform_knots(n, gridlen),
            dim: Dimension::Vector2D { cv, cvx, cvy },
        })
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Patch grid dimensions `(m - 3, n - 3)`.
    pub fn patch_dims(&self) -> (usize, usize) {
        (self.m + 1 - ORDER, self.n + 1 - ORDER)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.dim, Dimension::Vector2D { .. })
    }

    /// Scalar (or magnitude) control vertices.
    pub fn cv(&self) -> &Grid<f64> {
        match &self.dim {
            Dimension::Scalar { cv } | Dimension::Vector2D { cv, .. } => cv,
        }
    }

    fn check_vertex(&self, iu: usize, iv: usize) -> Result<(), FieldError> {
        if iu >= self.m || iv >= self.n {
            return Err(FieldError::VertexOutOfRange {
                iu,
                iv,
                m: self.m,
                n: self.n,
            });
        }
        Ok(())
    }

    pub fn control_vertex(&self, iu: usize, iv: usize) -> Result<f64, FieldError> {
        self.check_vertex(iu, iv)?;
        Ok(self.cv().at(iu, iv))
    }

    pub fn vector_control_vertex(&self, iu: usize, iv: usize) -> Result<(f64, f64), FieldError> {
        self.check_vertex(iu, iv)?;
        match &self.dim {
            Dimension::Vector2D { cvx, cvy, .. } => Ok((cvx.at(iu, iv), cvy.at(iu, iv))),
            Dimension::Scalar { .. } => Err(FieldError::NotVector),
        }
    }

    pub fn set_control_vertex(&mut self, iu: usize, iv: usize, value: f64) -> Result<(), FieldError> {
        self.check_vertex(iu, iv)?;
        match &mut self.dim {
            Dimension::Scalar { cv } => {
                cv.set(iu, iv, value);
                Ok(())
            }
            Dimension::Vector2D { .. } => Err(FieldError::NotScalar),
        }
    }

    /// Set one vector control vertex and reconcile the magnitudes.
    pub fn set_vector_control_vertex(
        &mut self,
        iu: usize,
        iv: usize,
        u: f64,
        v: f64,
    ) -> Result<(), FieldError> {
        self.check_vertex(iu, iv)?;
        match &mut self.dim {
            Dimension::Vector2D { cv, cvx, cvy } => {
                cvx.set(iu, iv, u);
                cvy.set(iu, iv, v);
                *cv = magnitude_control_vertices(cvx, cvy);
                Ok(())
            }
            Dimension::Scalar { .. } => Err(FieldError::NotVector),
        }
    }

    /// Rescale every control vertex: `cv * factor + offset`.
    ///
    /// Vector components are rescaled the same way and the magnitudes are
    /// reconciled afterwards.
    pub fn change_units(&mut self, factor: f64, offset: f64) {
        if factor == 1.0 && offset == 0.0 {
            return;
        }
        let rescale = |g: &mut Grid<f64>| g.iter_mut().for_each(|c| *c = *c * factor + offset);
        match &mut self.dim {
            Dimension::Scalar { cv } => rescale(cv),
            Dimension::Vector2D { cv, cvx, cvy } => {
                rescale(cvx);
                rescale(cvy);
                *cv = magnitude_control_vertices(cvx, cvy);
            }
        }
        debug!(factor, offset, "changed spline units");
    }

    /// The 4x4 window of control vertices feeding patch `(iu, iv)`, taken
    /// from `grid` (one of the spline's control arrays).
    pub(crate) fn window(grid: &Grid<f64>, iu: usize, iv: usize) -> [[f64; ORDER]; ORDER] {
        let mut w = [[0.0; ORDER]; ORDER];
        for (lu, row) in w.iter_mut().enumerate() {
            for (lv, c) in row.iter_mut().enumerate() {
                *c = grid.at(iu + lu, iv + lv);
            }
        }
        w
    }
}

/// Magnitude control vertices for a vector field.
///
/// The component interpolants are sampled at every interior grid point and
/// the magnitude vertices solved for so that the interpolated magnitude
/// equals `hypot(u, v)` there exactly. Edge rows copy their inner
/// neighbours for a free boundary, which keeps the system a tensor product
/// of two tridiagonal ones. A zero vector yields magnitude 0.
pub fn magnitude_control_vertices(cvx: &Grid<f64>, cvy: &Grid<f64>) -> Grid<f64> {
    let (m, n) = (cvx.rows(), cvx.cols());
    let mut cv = Grid::filled(m, n, 0.0);
    let b = evaluate_basis(0.0);

    // hypot of the interpolated components at each interior grid point
    let mut mags = vec![vec![0.0; n - 2]; m - 2];
    for (iu, row) in (1..m - 1).zip(mags.iter_mut()) {
        for (iv, mag) in (1..n - 1).zip(row.iter_mut()) {
            let mut u = 0.0;
            let mut v = 0.0;
            for ju in 0..ORDER - 1 {
                for jv in 0..ORDER - 1 {
                    let w = b[ju] * b[jv];
                    u += cvx.at(iu - 1 + ju, iv - 1 + jv) * w;
                    v += cvy.at(iu - 1 + ju, iv - 1 + jv) * w;
                }
            }
            *mag = u.hypot(v);
        }
    }

    for row in mags.iter_mut() {
        solve_collocation(row, b[1], b[0]);
    }
    let mut column = vec![0.0; m - 2];
    for jv in 0..n - 2 {
        column.iter_mut().zip(&mags).for_each(|(c, row)| *c = row[jv]);
        solve_collocation(&mut column, b[1], b[0]);
        column.iter().zip(mags.iter_mut()).for_each(|(c, row)| row[jv] = *c);
    }

    for iu in 0..m {
        for iv in 0..n {
            let ku = iu.clamp(1, m - 2) - 1;
            let kv = iv.clamp(1, n - 2) - 1;
            cv.set(iu, iv, mags[ku][kv]);
        }
    }
    cv
}

/// Solve in place for the vertices whose interpolant at each grid point
/// gives `rhs`, with the end vertices copied from their neighbours.
///
/// The system is tridiagonal with `centre` on the diagonal (plus `side`
/// at either end for the copied vertex) and `side` off it.
fn solve_collocation(rhs: &mut [f64], centre: f64, side: f64) {
    let n = rhs.len();
    let diag = |k: usize| centre + if k == 0 { side } else { 0.0 } + if k + 1 == n { side } else { 0.0 };
    let mut upper = vec![0.0; n];
    let mut prev_upper = 0.0;
    let mut prev = 0.0;
    for k in 0..n {
        let beta = diag(k) - side * prev_upper;
        rhs[k] = (rhs[k] - side * prev) / beta;
        upper[k] = side / beta;
        prev_upper = upper[k];
        prev = rhs[k];
    }
    for k in (0..n.saturating_sub(1)).rev() {
        rhs[k] -= upper[k] * rhs[k + 1];
    }
}
