//! Point evaluation of a surface and its derivatives.
//!
//! Every evaluation reports whether the point fell inside the spline
//! domain. Points outside are clamped onto the nearest edge patch and
//! still produce a value.

use field_poly::{Axis, BiPoly};
use serde::{Deserialize, Serialize};

use super::Surface;
use crate::error::FieldError;
use crate::geometry::point::Point2;
use crate::geometry::transform::MapProjection;
use crate::spline::{Patch, PatchFunction, PatchLocation};

/// A value together with whether it was evaluated inside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation<T> {
    pub value: T,
    pub inside: bool,
}

impl<T> Evaluation<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Evaluation<U> {
        Evaluation {
            value: f(self.value),
            inside: self.inside,
        }
    }
}

/// Which function of a vector field to differentiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Component {
    #[default]
    Magnitude,
    U,
    V,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Curvature {
    /// Signed curvature of the isoline through the point.
    pub curvature: f64,
    /// Centre of the osculating circle. Equal to the evaluation point where
    /// the curvature is zero or undefined.
    pub centre: Point2,
}

fn select(function: &PatchFunction, component: Component) -> Result<&BiPoly, FieldError> {
    match (component, function.components()) {
        (Component::Magnitude, _) => Ok(function.value()),
        (Component::U, Some((u, _))) => Ok(u),
        (Component::V, Some((_, v))) => Ok(v),
        (_, None) => Err(FieldError::NotVector),
    }
}

impl Surface {
    /// Patch function owning a spline-local point. Uses the allocated patch
    /// when it is current, otherwise defines a scratch copy.
    fn locate(&self, ps: &Point2) -> Result<(PatchLocation, PatchFunction), FieldError> {
        let loc = self.spline.find_patch_unmapped(ps);
        let function = match self.get_patch(loc.iu, loc.iv) {
            Some(patch) if patch.defined => patch.function.clone(),
            _ => {
                let mut patch = Patch::new(loc.iu, loc.iv);
                patch.define(&self.spline)?;
                patch.function
            }
        };
        Ok((loc, function))
    }

    /// Patch extent at a world point, corrected for map distortion.
    fn effective_size(&self, loc: &PatchLocation, pw: &Point2) -> (f64, f64) {
        let (cx, cy) = self.spline.projection.distortion(pw);
        (loc.size.0 / cx, loc.size.1 / cy)
    }

    pub fn eval(&self, pw: &Point2) -> Result<Evaluation<f64>, FieldError> {
        self.eval_unmapped(&self.spline.world_to_spline(pw))
    }

    pub fn eval_unmapped(&self, ps: &Point2) -> Result<Evaluation<f64>, FieldError> {
        let (loc, function) = self.locate(ps)?;
        Ok(Evaluation {
            value: function.value().evaluate(loc.pp.x, loc.pp.y),
            inside: loc.inside,
        })
    }

    /// World-frame gradient of the contoured function.
    pub fn eval_first_deriv(&self, pw: &Point2) -> Result<Evaluation<(f64, f64)>, FieldError> {
        self.eval_component_first_deriv(pw, Component::Magnitude)
    }

    pub fn eval_component_first_deriv(
        &self,
        pw: &Point2,
        component: Component,
    ) -> Result<Evaluation<(f64, f64)>, FieldError> {
        let (loc, function) = self.locate(&self.spline.world_to_spline(pw))?;
        let f = select(&function, component)?;
        let (dx, dy) = self.effective_size(&loc, pw);
        let gx = f.differentiate(Axis::X).evaluate(loc.pp.x, loc.pp.y) / dx;
        let gy = f.differentiate(Axis::Y).evaluate(loc.pp.x, loc.pp.y) / dy;
        Ok(Evaluation {
            value: self.spline.xform.gradient_to_world(gx, gy),
            inside: loc.inside,
        })
    }

    /// World-frame second derivatives `(xx, xy, yy)`.
    pub fn eval_second_deriv(&self, pw: &Point2) -> Result<Evaluation<(f64, f64, f64)>, FieldError> {
        self.eval_component_second_deriv(pw, Component::Magnitude)
    }

    pub fn eval_component_second_deriv(
        &self,
        pw: &Point2,
        component: Component,
    ) -> Result<Evaluation<(f64, f64, f64)>, FieldError> {
        let (loc, function) = self.locate(&self.spline.world_to_spline(pw))?;
        let f = select(&function, component)?;
        let (dx, dy) = self.effective_size(&loc, pw);
        let (fx, fy) = (f.differentiate(Axis::X), f.differentiate(Axis::Y));
        let (x, y) = (loc.pp.x, loc.pp.y);
        let gxx = fx.differentiate(Axis::X).evaluate(x, y) / dx / dx;
        let gxy = fx.differentiate(Axis::Y).evaluate(x, y) / dx / dy;
        let gyy = fy.differentiate(Axis::Y).evaluate(x, y) / dy / dy;
        Ok(Evaluation {
            value: self.spline.xform.hessian_to_world(gxx, gxy, gyy),
            inside: loc.inside,
        })
    }

    /// Curvature of the isoline through a world point.
    pub fn eval_curvature(&self, pw: &Point2) -> Result<Evaluation<Curvature>, FieldError> {
        let grad = self.eval_first_deriv(pw)?;
        let (vx, vy) = grad.value;
        let (vxx, vxy, vyy) = self.eval_second_deriv(pw)?.value;

        let top = vxx * vy * vy - 2.0 * vxy * vx * vy + vyy * vx * vx;
        let bottom = vx.hypot(vy);
        let mut centre = *pw;
        let curvature = if bottom == 0.0 {
            if top == 0.0 { 0.0 } else { top.signum() * f64::MAX }
        } else {
            if top != 0.0 {
                let r = bottom * bottom / top;
                centre = Point2::new(pw.x - vx * r, pw.y - vy * r);
            }
            top / (bottom * bottom * bottom)
        };
        Ok(grad.map(|_| Curvature { curvature, centre }))
    }

    /// Vector components at a world point.
    pub fn eval_uv(&self, pw: &Point2) -> Result<Evaluation<(f64, f64)>, FieldError> {
        self.eval_uv_unmapped(&self.spline.world_to_spline(pw))
    }

    pub fn eval_uv_unmapped(&self, ps: &Point2) -> Result<Evaluation<(f64, f64)>, FieldError> {
        let (loc, function) = self.locate(ps)?;
        let (u, v) = function.components().ok_or(FieldError::NotVector)?;
        Ok(Evaluation {
            value: (u.evaluate(loc.pp.x, loc.pp.y), v.evaluate(loc.pp.x, loc.pp.y)),
            inside: loc.inside,
        })
    }

    /// Speed and direction (degrees anticlockwise from +x) at a world point.
    pub fn eval_speed_direction(&self, pw: &Point2) -> Result<Evaluation<(f64, f64)>, FieldError> {
        Ok(self.eval_uv(pw)?.map(speed_direction))
    }

    pub fn eval_speed_direction_unmapped(&self, ps: &Point2) -> Result<Evaluation<(f64, f64)>, FieldError> {
        Ok(self.eval_uv_unmapped(ps)?.map(speed_direction))
    }
}

fn speed_direction((u, v): (f64, f64)) -> (f64, f64) {
    (u.hypot(v), v.atan2(u).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationPolicy, SurfaceConfig};
    use crate::geometry::transform::{Projection, Xform};
    use crate::spline::Spline;

    fn surface(spline: Spline) -> Surface {
        Surface::new(spline, SurfaceConfig::default().with_policy(AllocationPolicy::Lazy)).unwrap()
    }

    /// `cv = gridlen * iu`, so the field rises by one per unit of x.
    fn slope(gridlen: f64, xform: Xform) -> Spline {
        let values = (0..6).flat_map(|iu| (0..6).map(move |_| gridlen * iu as f64)).collect();
        Spline::scalar(6, 6, xform, gridlen, values).unwrap()
    }

    /// `cv = (iu - 2.5)^2 + (iv - 2.5)^2` over a 6x6 grid.
    fn bowl() -> Spline {
        let values = (0..6)
            .flat_map(|iu| (0..6).map(move |iv| (iu as f64 - 2.5).powi(2) + (iv as f64 - 2.5).powi(2)))
            .collect();
        Spline::scalar(6, 6, Xform::identity(), 1.0, values).unwrap()
    }

    #[test]
    fn test_eval_inside_and_outside() {
        let sfc = surface(slope(2.0, Xform::identity()));
        let e = sfc.eval(&Point2::new(3.0, 1.0)).unwrap();
        assert!(e.inside);
        // value at x is gridlen * (1 + x / gridlen)
        assert!((e.value - 5.0).abs() < 1e-9);

        let e = sfc.eval(&Point2::new(-1.0, 1.0)).unwrap();
        assert!(!e.inside);
        assert!((e.value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_rotates_with_frame() {
        let sfc = surface(slope(2.0, Xform::new(Point2::new(10.0, 0.0), 90.0)));
        let pw = sfc.spline().spline_to_world(&Point2::new(3.0, 3.0));
        let (gx, gy) = sfc.eval_first_deriv(&pw).unwrap().value;
        assert!(gx.abs() < 1e-9);
        assert!((gy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_scales_with_distortion() {
        let spline = slope(1.0, Xform::identity()).with_projection(Projection::Scaled { sx: 2.0, sy: 1.0 });
        let sfc = surface(spline);
        let (gx, _) = sfc.eval_first_deriv(&Point2::new(1.5, 1.5)).unwrap().value;
        assert!((gx - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_second_deriv_of_bowl() {
        let sfc = surface(bowl());
        let (gxx, gxy, gyy) = sfc.eval_second_deriv(&Point2::new(1.5, 1.5)).unwrap().value;
        // cubic B-splines reproduce quadratics exactly
        assert!((gxx - 2.0).abs() < 1e-9);
        assert!(gxy.abs() < 1e-9);
        assert!((gyy - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_curvature_of_circular_isolines() {
        let sfc = surface(bowl());
        // bowl minimum sits at spline point (1.5, 1.5)
        let p = Point2::new(2.5, 1.5);
        let c = sfc.eval_curvature(&p).unwrap().value;
        assert!((c.curvature - 1.0).abs() < 1e-9);
        assert!((c.centre.x - 1.5).abs() < 1e-9);
        assert!((c.centre.y - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_straight_isolines_have_no_curvature() {
        let sfc = surface(slope(1.0, Xform::identity()));
        let c = sfc.eval_curvature(&Point2::new(1.4, 0.6)).unwrap().value;
        assert!(c.curvature.abs() < 1e-9);
    }

    #[test]
    fn test_vector_evaluation() {
        let spline = Spline::vector(4, 4, Xform::identity(), 1.0, vec![0.0; 16], vec![2.0; 16]).unwrap();
        let sfc = surface(spline);
        let (u, v) = sfc.eval_uv(&Point2::new(0.5, 0.5)).unwrap().value;
        assert!(u.abs() < 1e-12 && (v - 2.0).abs() < 1e-12);
        let (speed, dir) = sfc.eval_speed_direction(&Point2::new(0.5, 0.5)).unwrap().value;
        assert!((speed - 2.0).abs() < 1e-12);
        assert!((dir - 90.0).abs() < 1e-12);
        let unmapped = sfc.eval_speed_direction_unmapped(&Point2::new(0.5, 0.5)).unwrap();
        assert_eq!(unmapped.value, (speed, dir));
        let (gx, gy) = sfc
            .eval_component_first_deriv(&Point2::new(0.5, 0.5), Component::V)
            .unwrap()
            .value;
        assert!(gx.abs() < 1e-12 && gy.abs() < 1e-12);
    }

    #[test]
    fn test_scalar_has_no_components() {
        let sfc = surface(bowl());
        assert!(matches!(sfc.eval_uv(&Point2::ORIGIN), Err(FieldError::NotVector)));
        assert!(matches!(
            sfc.eval_component_first_deriv(&Point2::ORIGIN, Component::U),
            Err(FieldError::NotVector)
        ));
    }
}
