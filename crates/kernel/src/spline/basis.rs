//! Uniform cubic B-spline basis and patch function generation.
//!
//! On one patch, with `U` in `[0, 1]`, the four contributing basis pieces are
//!
//! ```text
//! b0(U) = (1 - 3U + 3U^2 -  U^3) / 6
//! b1(U) = (4      - 6U^2 + 3U^3) / 6
//! b2(U) = (1 + 3U + 3U^2 - 3U^3) / 6
//! b3(U) =                   U^3  / 6
//! ```

use field_poly::BiPoly;
use nalgebra::Matrix4;

/// Cubic order (4 basis pieces per patch).
pub const ORDER: usize = 4;

const SIXTH: f64 = 1.0 / 6.0;

/// `BASIS[i][k]` is the coefficient of `U^k` in basis piece `b_i`.
pub const BASIS: [[f64; ORDER]; ORDER] = [
    [SIXTH, -0.5, 0.5, -SIXTH],
    [4.0 * SIXTH, 0.0, -1.0, 0.5],
    [SIXTH, 0.5, 0.5, -0.5],
    [0.0, 0.0, 0.0, SIXTH],
];

/// `SHIFT[d][j]` is the factor picked up by the coefficient of `U^(j+d)`
/// after `d` differentiations, i.e. `(j+d)! / j!`.
const SHIFT: [[f64; ORDER]; ORDER] = [
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 2.0, 3.0, 0.0],
    [2.0, 6.0, 0.0, 0.0],
    [6.0, 0.0, 0.0, 0.0],
];

/// Values of the four basis pieces at `u`. Outside `[0, 1]` the end values
/// are returned.
pub fn evaluate_basis(u: f64) -> [f64; ORDER] {
    let mut b = [0.0; ORDER];
    for (i, out) in b.iter_mut().enumerate() {
        *out = if u <= 0.0 {
            BASIS[i][0]
        } else if u >= 1.0 {
            BASIS[ORDER - 1 - i][0]
        } else {
            BASIS[i].iter().rev().fold(0.0, |acc, c| acc * u + c)
        };
    }
    b
}

/// `deriv`-th derivatives of the basis pieces at `u`, clamped to `[0, 1]`.
pub fn evaluate_basis_deriv(deriv: usize, u: f64) -> [f64; ORDER] {
    if deriv == 0 {
        return evaluate_basis(u);
    }
    let mut b = [0.0; ORDER];
    if deriv >= ORDER {
        return b;
    }
    let u = u.clamp(0.0, 1.0);
    for (i, out) in b.iter_mut().enumerate() {
        *out = (0..ORDER - deriv)
            .rev()
            .fold(0.0, |acc, j| acc * u + SHIFT[deriv][j] * BASIS[i][j + deriv]);
    }
    b
}

/// Bivariate power series of one patch from its 4x4 control vertex window.
///
/// `window[iu][iv]` is the control vertex `iu` columns right and `iv` rows
/// up from the patch's lower-left contributor. The coefficient of
/// `U^du V^dv` is `sum_iu sum_iv B[iu][du] * window[iu][iv] * B[iv][dv]`,
/// i.e. the matrix product `Bt * CV * B`.
pub fn patch_function(window: &[[f64; ORDER]; ORDER]) -> BiPoly {
    let b = Matrix4::from_fn(|i, k| BASIS[i][k]);
    let cv = Matrix4::from_fn(|i, j| window[i][j]);
    let f = b.transpose() * cv * b;
    let mut poly = BiPoly::zero();
    for (du, row) in poly.coeffs.iter_mut().enumerate() {
        for (dv, c) in row.iter_mut().enumerate() {
            *c = f[(du, dv)];
        }
    }
    poly
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_end_values() {
        let b0 = evaluate_basis(0.0);
        let b1 = evaluate_basis(1.0);
        assert!((b0[0] - SIXTH).abs() < 1e-15);
        assert!((b0[1] - 4.0 * SIXTH).abs() < 1e-15);
        assert!(b0[3].abs() < 1e-15);
        assert!(b1[0].abs() < 1e-15);
        assert!((b1[2] - 4.0 * SIXTH).abs() < 1e-15);
    }

    #[test]
    fn test_basis_partition_of_unity_interior() {
        for k in 1..10 {
            let u = k as f64 / 10.0;
            let sum: f64 = evaluate_basis(u).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_basis_derivatives_sum_to_zero() {
        for d in 1..ORDER {
            for u in [0.0, 0.3, 0.8, 1.0] {
                let sum: f64 = evaluate_basis_deriv(d, u).iter().sum();
                assert!(sum.abs() < 1e-12, "d={d} u={u} sum={sum}");
            }
        }
    }

    #[test]
    fn test_first_derivative_matches_difference() {
        let u = 0.37;
        let h = 1e-6;
        let d = evaluate_basis_deriv(1, u);
        let (lo, hi) = (evaluate_basis(u - h), evaluate_basis(u + h));
        for i in 0..ORDER {
            assert!((d[i] - (hi[i] - lo[i]) / (2.0 * h)).abs() < 1e-6);
        }
        // end of the patch: b3'(1) = 1/2
        assert!((evaluate_basis_deriv(1, 1.0)[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_patch_function_constant_window() {
        let f = patch_function(&[[5.0; ORDER]; ORDER]);
        for (x, y) in [(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)] {
            assert!((f.evaluate(x, y) - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_patch_function_matches_tensor_basis() {
        let mut w = [[0.0; ORDER]; ORDER];
        for (i, row) in w.iter_mut().enumerate() {
            for (j, c) in row.iter_mut().enumerate() {
                *c = (i * 3 + j * j) as f64 - 2.0;
            }
        }
        let f = patch_function(&w);
        let (x, y) = (0.3, 0.6);
        let (bu, bv) = (evaluate_basis(x), evaluate_basis(y));
        let mut direct = 0.0;
        for i in 0..ORDER {
            for j in 0..ORDER {
                direct += bu[i] * bv[j] * w[i][j];
            }
        }
        assert!((f.evaluate(x, y) - direct).abs() < 1e-12);
    }
}
