use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point in the plane.
///
/// Used for world, spline-local and patch-normalized coordinates alike;
/// the coordinate frame is implied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: (self.x + other.x) * 0.5,
            y: (self.y + other.y) * 0.5,
        }
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }

    /// True if the point lies in the closed unit square.
    pub fn in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl Add for Point2 {
    type Output = Point2;
    fn add(self, rhs: Self) -> Self::Output {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;
    fn sub(self, rhs: Self) -> Self::Output {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl AbsDiffEq for Point2 {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

impl RelativeEq for Point2 {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
    }
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Rectangle spanned by two opposite corners.
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            left: a.x.min(b.x),
            bottom: a.y.min(b.y),
            right: a.x.max(b.x),
            top: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn is_valid(&self) -> bool {
        self.left < self.right && self.bottom < self.top
    }

    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }

    /// Overlap of two rectangles (may be invalid if they are disjoint).
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            left: self.left.max(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.min(other.right),
            top: self.top.min(other.top),
        }
    }

    pub fn bottom_left(&self) -> Point2 {
        Point2::new(self.left, self.bottom)
    }

    pub fn bottom_right(&self) -> Point2 {
        Point2::new(self.right, self.bottom)
    }

    pub fn top_right(&self) -> Point2 {
        Point2::new(self.right, self.top)
    }

    pub fn top_left(&self) -> Point2 {
        Point2::new(self.left, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(4.0, 5.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_lerp_and_midpoint() {
        let a = Point2::ORIGIN;
        let b = Point2::new(2.0, -4.0);
        let m = a.midpoint(&b);
        let q = a.lerp(&b, 0.25);
        assert!((m.x - 1.0).abs() < 1e-12 && (m.y + 2.0).abs() < 1e-12);
        assert!((q.x - 0.5).abs() < 1e-12 && (q.y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_approx_eq() {
        let a = Point2::new(0.1 + 0.2, 1.0);
        let b = Point2::new(0.3, 1.0);
        approx::assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_square() {
        assert!(Point2::new(0.0, 1.0).in_unit_square());
        assert!(!Point2::new(-1e-9, 0.5).in_unit_square());
    }

    #[test]
    fn test_bounds_intersect_and_area() {
        let a = Bounds::new(0.0, 0.0, 10.0, 5.0);
        let b = Bounds::new(2.0, -1.0, 12.0, 3.0);
        let c = a.intersect(&b);
        assert_eq!(c, Bounds::new(2.0, 0.0, 10.0, 3.0));
        assert!((c.area() - 24.0).abs() < 1e-12);
        assert!(c.contains(&Point2::new(2.0, 3.0)));
        assert!(!c.contains(&Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_bounds_from_corners() {
        let b = Bounds::from_corners(Point2::new(3.0, -1.0), Point2::new(-2.0, 4.0));
        assert_eq!(b, Bounds::new(-2.0, -1.0, 3.0, 4.0));
        assert!(b.is_valid());
    }
}
