use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::zeroin::zeroin;

/// Highest order solved in closed form. Anything above is bracketed
/// between the stationary points of the polynomial and solved numerically.
pub const MAX_EXPLICIT_ORDER: usize = 3;

/// Relative size below which a leading coefficient is treated as zero,
/// and absolute residual accepted as a root at an interval end.
const ROOT_TOL: f64 = 1e-6;

/// Bracket width used when solving above [`MAX_EXPLICIT_ORDER`].
const BRACKET_TOL: f64 = 1e-4;

/// A univariate polynomial `c0 + c1*x + c2*x^2 + ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniPoly {
    /// Coefficients, lowest power first.
    pub coeffs: Vec<f64>,
}

impl UniPoly {
    pub fn new(coeffs: Vec<f64>) -> Self {
        if coeffs.is_empty() {
            return Self::constant(0.0);
        }
        Self { coeffs }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            coeffs: vec![value],
        }
    }

    /// Stored order (highest power with a slot, zero or not).
    pub fn order(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Order after discarding exactly-zero leading coefficients.
    pub fn effective_order(&self) -> usize {
        let mut order = self.order();
        while order > 0 && self.coeffs[order] == 0.0 {
            order -= 1;
        }
        order
    }

    /// Evaluate with Horner's rule.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x == 0.0 {
            return self.coeffs[0];
        }
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn differentiate(&self) -> UniPoly {
        let order = self.effective_order();
        if order < 1 {
            return UniPoly::constant(0.0);
        }
        let coeffs = (1..=order)
            .map(|term| term as f64 * self.coeffs[term])
            .collect();
        UniPoly { coeffs }
    }

    /// All real roots of `f(x) = cval` on `[xs, xe]`, in ascending order.
    ///
    /// Repeated roots from the closed-form solutions are returned as
    /// identical values so callers can pair them up. A constant polynomial
    /// has no roots, even if it equals `cval` everywhere.
    pub fn roots(&self, cval: f64, xs: f64, xe: f64) -> Vec<f64> {
        let mut roots = Vec::new();
        let in_range = |r: f64| r >= xs && r <= xe;

        // Shed leading coefficients that are negligible next to the one below
        let mut order = self.order();
        let mut a = 0.0;
        let mut b = 0.0;
        while order > 0 {
            a = self.coeffs[order];
            b = self.coeffs[order - 1];
            if order == 1 {
                b -= cval;
            }
            if a.abs() > ROOT_TOL * b.abs() {
                break;
            }
            order -= 1;
        }

        match order {
            0 => {}
            1 => {
                let r = -b / a;
                if in_range(r) {
                    roots.push(r);
                }
            }
            2 => {
                let c = self.coeffs[0] - cval;
                let rbar = -b / (2.0 * a);
                let det = rbar * rbar - c / a;
                if det >= 0.0 {
                    let rdif = det.sqrt();
                    roots.extend([rbar - rdif, rbar + rdif].into_iter().filter(|r| in_range(*r)));
                }
            }
            3 => {
                let c = self.coeffs[1] / a;
                let d = (self.coeffs[0] - cval) / a;
                let b = b / a;
                roots.extend(cubic_roots(b, c, d).into_iter().filter(|r| in_range(*r)));
            }
            _ => {
                let stationary = self.differentiate().roots(0.0, xs, xe);
                let f = |x: f64| self.evaluate(x) - cval;
                let mut x1 = xs;
                let mut f1 = f(x1);
                for x2 in stationary.into_iter().chain(std::iter::once(xe)) {
                    let f2 = f(x2);
                    if f1.signum() != f2.signum() {
                        match zeroin(&f, x1, x2, BRACKET_TOL) {
                            Ok(r) => roots.push(r),
                            Err(err) => debug!(%err, x1, x2, "skipping segment without a bracketed root"),
                        }
                    } else if f1.abs() <= ROOT_TOL {
                        roots.push(x1);
                    } else if f2.abs() <= ROOT_TOL {
                        roots.push(x2);
                    }
                    x1 = x2;
                    f1 = f2;
                }
            }
        }
        roots
    }

    /// Minimum and maximum of the polynomial on `[xs, xe]`.
    pub fn range(&self, xs: f64, xe: f64) -> (f64, f64) {
        let fs = self.evaluate(xs);
        let fe = self.evaluate(xe);
        let mut vmin = fs.min(fe);
        let mut vmax = fs.max(fe);
        for x in self.differentiate().roots(0.0, xs, xe) {
            let fx = self.evaluate(x);
            vmin = vmin.min(fx);
            vmax = vmax.max(fx);
        }
        (vmin, vmax)
    }

    /// Root of `f(x) = cval` bracketed by `[x1, x2]`.
    pub fn zeroin(&self, cval: f64, x1: f64, x2: f64, tol: f64) -> Result<f64, crate::PolyError> {
        zeroin(|x| self.evaluate(x) - cval, x1, x2, tol)
    }
}

/// Real roots of the monic cubic `x^3 + b x^2 + c x + d`, ascending.
fn cubic_roots(b: f64, c: f64, d: f64) -> Vec<f64> {
    // Depressed cubic t^3 + p t + q with x = t - b/3
    let asub = b / 3.0;
    let p = c - b * asub;
    let q = asub * (2.0 * asub * asub - c) + d;

    let t1 = p / 3.0;
    let t2 = q / 2.0;
    let det = t1 * t1 * t1 + t2 * t2;

    if det > 0.0 {
        let t3 = det.sqrt();
        let u = (-t2 + t3).cbrt();
        let v = (-t2 - t3).cbrt();
        vec![u + v - asub]
    } else if det == 0.0 {
        let t3 = t2.cbrt();
        let single = -2.0 * t3 - asub;
        let double = t3 - asub;
        if double < single {
            vec![double, double, single]
        } else {
            vec![single, double, double]
        }
    } else {
        let t3 = (-t1).sqrt();
        let cang = (t2 / (t1 * t3)).clamp(-1.0, 1.0);
        let ang = cang.acos() / 3.0;
        let third = 2.0 * std::f64::consts::PI / 3.0;
        let mut r = [
            2.0 * t3 * ang.cos() - asub,
            2.0 * t3 * (ang + third).cos() - asub,
            2.0 * t3 * (ang + 2.0 * third).cos() - asub,
        ];
        r.sort_by(|a, b| a.total_cmp(b));
        r.to_vec()
    }
}
