use serde::{Deserialize, Serialize};

use super::curves::Polyline;
use super::point::{Bounds, Point2};

/// A closed region: an outer boundary with zero or more holes.
///
/// The boundary is counter-clockwise and holes are clockwise when built by
/// the band builder, but nothing here depends on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub boundary: Polyline,
    pub holes: Vec<Polyline>,
}

impl Area {
    pub fn new(mut boundary: Polyline) -> Self {
        boundary.close();
        Self {
            boundary,
            holes: Vec::new(),
        }
    }

    pub fn add_hole(&mut self, mut hole: Polyline) {
        hole.close();
        self.holes.push(hole);
    }

    /// Enclosed area: outer boundary less the holes.
    pub fn size(&self) -> f64 {
        let outer = self.boundary.signed_area().abs();
        let holes: f64 = self.holes.iter().map(|h| h.signed_area().abs()).sum();
        outer - holes
    }

    /// Apply `f` to the boundary and every hole.
    pub fn map(&self, f: impl Fn(&Point2) -> Point2) -> Area {
        Area {
            boundary: self.boundary.map(&f),
            holes: self.holes.iter().map(|h| h.map(&f)).collect(),
        }
    }

    /// The part of the area inside `bounds`, if any.
    pub fn clip_to(&self, bounds: &Bounds) -> Option<Area> {
        let boundary = self.boundary.clip_to(bounds);
        if boundary.is_empty() {
            return None;
        }
        let holes = self
            .holes
            .iter()
            .map(|h| h.clip_to(bounds))
            .filter(|h| !h.is_empty())
            .collect();
        Some(Area { boundary, holes })
    }

    /// Inside the boundary and outside every hole.
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.boundary.contains_point(p) && !self.holes.iter().any(|h| h.contains_point(p))
    }

    /// True if `p` lies within `tol` of the boundary or of a hole.
    pub fn on_boundary(&self, p: &Point2, tol: f64) -> bool {
        self.boundary.distance_to(p) <= tol || self.holes.iter().any(|h| h.distance_to(p) <= tol)
    }
}

/// Index of the smallest area whose outer boundary encloses `p`.
pub fn enclosing_area(areas: &[Area], p: &Point2) -> Option<usize> {
    areas
        .iter()
        .enumerate()
        .filter(|(_, a)| a.boundary.contains_point(p))
        .min_by(|(_, a), (_, b)| {
            a.boundary
                .signed_area()
                .abs()
                .total_cmp(&b.boundary.signed_area().abs())
        })
        .map(|(i, _)| i)
}
