use serde::{Deserialize, Serialize};

use crate::unipoly::UniPoly;
use crate::zeroin::{zeroin, PolyError};

/// Terms per axis of a bicubic polynomial.
pub const MAX_TERMS: usize = 4;

/// Newton starts per axis when searching for stationary points.
const NEWTON_STARTS: usize = 5;
const NEWTON_STEPS: usize = 40;
const NEWTON_TOL: f64 = 1e-12;
/// Stationary points closer than this are the same point.
const SAME_POINT: f64 = 1e-7;

/// Coordinate axis of a bivariate polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// A bivariate polynomial of at most cubic order in each variable.
///
/// `coeffs[i][j]` multiplies `x^i * y^j`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiPoly {
    pub coeffs: [[f64; MAX_TERMS]; MAX_TERMS],
}

impl Default for BiPoly {
    fn default() -> Self {
        Self::zero()
    }
}

impl BiPoly {
    pub fn zero() -> Self {
        Self {
            coeffs: [[0.0; MAX_TERMS]; MAX_TERMS],
        }
    }

    pub fn constant(value: f64) -> Self {
        let mut p = Self::zero();
        p.coeffs[0][0] = value;
        p
    }

    /// Build from rows of coefficients (`rows[i][j]` multiplies `x^i y^j`).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, PolyError> {
        if rows.len() > MAX_TERMS {
            return Err(PolyError::TooManyTerms {
                max: MAX_TERMS,
                got: rows.len(),
            });
        }
        let mut p = Self::zero();
        for (i, row) in rows.iter().enumerate() {
            if row.len() > MAX_TERMS {
                return Err(PolyError::TooManyTerms {
                    max: MAX_TERMS,
                    got: row.len(),
                });
            }
            p.coeffs[i][..row.len()].copy_from_slice(row);
        }
        Ok(p)
    }

    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, row| {
            let ry = row.iter().rev().fold(0.0, |a, c| a * y + c);
            acc * x + ry
        })
    }

    /// Partial derivative with respect to `axis`.
    pub fn differentiate(&self, axis: Axis) -> BiPoly {
        let mut d = Self::zero();
        for i in 0..MAX_TERMS {
            for j in 0..MAX_TERMS {
                match axis {
                    Axis::X if i > 0 => d.coeffs[i - 1][j] = i as f64 * self.coeffs[i][j],
                    Axis::Y if j > 0 => d.coeffs[i][j - 1] = j as f64 * self.coeffs[i][j],
                    _ => {}
                }
            }
        }
        d
    }

    /// Restrict the polynomial to the line `fixed = value`.
    ///
    /// Fixing `Axis::Y` yields a polynomial in `x`; fixing `Axis::X` yields
    /// a polynomial in `y`.
    pub fn project(&self, fixed: Axis, value: f64) -> UniPoly {
        let powers = powers_of(value);
        let coeffs = (0..MAX_TERMS)
            .map(|k| match fixed {
                Axis::Y => (0..MAX_TERMS).map(|j| self.coeffs[k][j] * powers[j]).sum(),
                Axis::X => (0..MAX_TERMS).map(|i| self.coeffs[i][k] * powers[i]).sum(),
            })
            .collect();
        UniPoly::new(coeffs)
    }

    /// Angle on the circle of radius `r` about `centre`, between `a1` and `a2`,
    /// where the polynomial takes the value `c`.
    pub fn zeroin_on_circle(
        &self,
        c: f64,
        centre: (f64, f64),
        r: f64,
        a1: f64,
        a2: f64,
        tol: f64,
    ) -> Result<f64, PolyError> {
        let (xc, yc) = centre;
        zeroin(
            |a| self.evaluate(xc + r * a.cos(), yc + r * a.sin()) - c,
            a1,
            a2,
            tol,
        )
    }

    /// Points of the unit square where both partial derivatives vanish.
    ///
    /// Found by Newton iteration from a regular grid of starts. Degenerate
    /// stationary sets (a flat valley line, say) are not reported.
    pub fn stationary_points(&self) -> Vec<(f64, f64)> {
        let fx = self.differentiate(Axis::X);
        let fy = self.differentiate(Axis::Y);
        let fxx = fx.differentiate(Axis::X);
        let fxy = fx.differentiate(Axis::Y);
        let fyy = fy.differentiate(Axis::Y);

        let mut found: Vec<(f64, f64)> = Vec::new();
        let starts = (0..NEWTON_STARTS).flat_map(|i| (0..NEWTON_STARTS).map(move |j| (i, j)));
        for (i, j) in starts {
            let mut x = (i as f64 + 0.5) / NEWTON_STARTS as f64;
            let mut y = (j as f64 + 0.5) / NEWTON_STARTS as f64;
            let mut converged = false;
            for _ in 0..NEWTON_STEPS {
                let (gx, gy) = (fx.evaluate(x, y), fy.evaluate(x, y));
                let (hxx, hxy, hyy) = (fxx.evaluate(x, y), fxy.evaluate(x, y), fyy.evaluate(x, y));
                let det = hxx * hyy - hxy * hxy;
                if det.abs() < f64::EPSILON {
                    break;
                }
                let dx = (hyy * gx - hxy * gy) / det;
                let dy = (hxx * gy - hxy * gx) / det;
                x -= dx;
                y -= dy;
                if !(-0.5..=1.5).contains(&x) || !(-0.5..=1.5).contains(&y) {
                    break;
                }
                if dx.abs() + dy.abs() < NEWTON_TOL {
                    converged = true;
                    break;
                }
            }
            let inside = (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y);
            if converged && inside && !found.iter().any(|p| (p.0 - x).hypot(p.1 - y) < SAME_POINT) {
                found.push((x, y));
            }
        }
        found
    }

    /// Minimum and maximum over the unit square.
    pub fn range(&self) -> (f64, f64) {
        let edges = [(Axis::Y, 0.0), (Axis::X, 1.0), (Axis::Y, 1.0), (Axis::X, 0.0)];
        let (mut vmin, mut vmax) = (f64::INFINITY, f64::NEG_INFINITY);
        for (fixed, value) in edges {
            let (lo, hi) = self.project(fixed, value).range(0.0, 1.0);
            vmin = vmin.min(lo);
            vmax = vmax.max(hi);
        }
        for (x, y) in self.stationary_points() {
            let f = self.evaluate(x, y);
            vmin = vmin.min(f);
            vmax = vmax.max(f);
        }
        (vmin, vmax)
    }
}

fn powers_of(value: f64) -> [f64; MAX_TERMS] {
    let mut p = [1.0; MAX_TERMS];
    for k in 1..MAX_TERMS {
        p[k] = p[k - 1] * value;
    }
    p
}
