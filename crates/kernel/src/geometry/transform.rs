use nalgebra::{Matrix2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use super::point::Point2;

/// Rigid placement of a spline's local frame in world coordinates.
///
/// `origin` is the world position of the local origin and `orient` the
/// counter-clockwise rotation of the local axes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xform {
    pub origin: Point2,
    pub orient: f64,
}

impl Default for Xform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Xform {
    pub fn identity() -> Self {
        Self {
            origin: Point2::ORIGIN,
            orient: 0.0,
        }
    }

    pub fn new(origin: Point2, orient: f64) -> Self {
        Self { origin, orient }
    }

    fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(self.orient.to_radians())
    }

    /// World point to local (origin and orientation removed).
    pub fn to_local(&self, pw: &Point2) -> Point2 {
        let d = Vector2::new(pw.x - self.origin.x, pw.y - self.origin.y);
        let v = self.rotation().inverse() * d;
        Point2::new(v.x, v.y)
    }

    /// Local point to world.
    pub fn to_world(&self, ps: &Point2) -> Point2 {
        let v = self.rotation() * Vector2::new(ps.x, ps.y);
        Point2::new(v.x + self.origin.x, v.y + self.origin.y)
    }

    /// Rotate a gradient expressed along the local axes into the world frame.
    pub fn gradient_to_world(&self, gx: f64, gy: f64) -> (f64, f64) {
        let v = self.rotation() * Vector2::new(gx, gy);
        (v.x, v.y)
    }

    /// Rotate a symmetric second-derivative tensor `(xx, xy, yy)` from the
    /// local axes into the world frame.
    pub fn hessian_to_world(&self, gxx: f64, gxy: f64, gyy: f64) -> (f64, f64, f64) {
        let r = *self.rotation().matrix();
        let h = Matrix2::new(gxx, gxy, gxy, gyy);
        let w = r * h * r.transpose();
        (w[(0, 0)], w[(0, 1)], w[(1, 1)])
    }
}

// ─── Map projections ───

/// The narrow projection interface the field code depends on.
pub trait MapProjection {
    /// Local stretch of the projection at a world point, per axis.
    /// A value of 1 means distances are true to scale.
    fn distortion(&self, p: &Point2) -> (f64, f64);

    /// World point to a projection-neutral position.
    fn to_geographic(&self, p: &Point2) -> Point2;

    /// Projection-neutral position to a world point.
    fn from_geographic(&self, g: &Point2) -> Point2;
}

/// Move a point expressed in one projection into another.
pub fn reproject(p: &Point2, from: &dyn MapProjection, to: &dyn MapProjection) -> Point2 {
    to.from_geographic(&from.to_geographic(p))
}

/// Projections a spline can be defined on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Projection {
    /// Undistorted plane; world and geographic positions coincide.
    #[default]
    Plain,
    /// Plane stretched by constant factors along each axis.
    Scaled { sx: f64, sy: f64 },
}

impl MapProjection for Projection {
    fn distortion(&self, _p: &Point2) -> (f64, f64) {
        match self {
            Projection::Plain => (1.0, 1.0),
            Projection::Scaled { sx, sy } => (*sx, *sy),
        }
    }

    fn to_geographic(&self, p: &Point2) -> Point2 {
        match self {
            Projection::Plain => *p,
            Projection::Scaled { sx, sy } => Point2::new(p.x / sx, p.y / sy),
        }
    }

    fn from_geographic(&self, g: &Point2) -> Point2 {
        match self {
            Projection::Plain => *g,
            Projection::Scaled { sx, sy } => Point2::new(g.x * sx, g.y * sy),
        }
    }
}
