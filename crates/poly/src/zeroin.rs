use thiserror::Error;

/// Upper bound on bracketing iterations.
pub const MAX_STEPS: usize = 500;

#[derive(Debug, Error, PartialEq)]
pub enum PolyError {
    #[error("Root is not bracketed on [{start}, {end}] (f = {f_start}, {f_end})")]
    NotBracketed {
        start: f64,
        end: f64,
        f_start: f64,
        f_end: f64,
    },
    #[error("Bivariate polynomial supports at most {max} terms per axis, got {got}")]
    TooManyTerms { max: usize, got: usize },
}

/// Find a root of `f` bracketed by `[a, b]` using Brent's method.
///
/// The function values at the two ends must differ in sign (or one of them
/// must be exactly zero). The search stops once the bracket is narrower than
/// `tol`, or after [`MAX_STEPS`] iterations.
pub fn zeroin<F>(f: F, a: f64, b: f64, tol: f64) -> Result<f64, PolyError>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a);
    let mut fb = f(b);

    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(PolyError::NotBracketed {
            start: a,
            end: b,
            f_start: fa,
            f_end: fb,
        });
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_STEPS {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Secant or inverse quadratic interpolation
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            let bound = (3.0 * xm * q - (tol1 * q).abs()).min((e * q).abs());
            if 2.0 * p < bound {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += tol1.copysign(xm);
        }
        fb = f(b);
    }

    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroin_linear() {
        let root = zeroin(|x| 2.0 * x - 1.0, 0.0, 1.0, 1e-10).unwrap();
        assert!((root - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zeroin_cosine() {
        let root = zeroin(f64::cos, 0.0, 3.0, 1e-10).unwrap();
        assert!((root - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_zeroin_exact_endpoint() {
        let root = zeroin(|x| x - 1.0, 0.0, 1.0, 1e-6).unwrap();
        assert_eq!(root, 1.0);
    }

    #[test]
    fn test_zeroin_not_bracketed() {
        let err = zeroin(|x| x * x + 1.0, -1.0, 1.0, 1e-6).unwrap_err();
        assert!(matches!(err, PolyError::NotBracketed { .. }));
    }

    #[test]
    fn test_zeroin_reversed_bracket() {
        let root = zeroin(|x| x * x * x - 0.125, 1.0, 0.0, 1e-10).unwrap();
        assert!((root - 0.5).abs() < 1e-8);
    }
}
