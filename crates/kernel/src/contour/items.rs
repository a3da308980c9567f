//! Geometry produced by contouring one patch, in patch coordinates.

use serde::{Deserialize, Serialize};

use super::spec::{value_key, value_label, BarbStyle, LineStyle, MarkStyle};
use crate::geometry::curves::Polyline;
use crate::geometry::point::Point2;

/// One piece of a contour line crossing a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourFragment {
    pub line: Polyline,
    pub value: f64,
    /// Index of the contour spec that asked for this value.
    pub spec: Option<usize>,
    pub style: LineStyle,
    pub visible: bool,
}

impl ContourFragment {
    pub fn new(line: Polyline, value: f64, spec: Option<usize>) -> Self {
        Self {
            line,
            value,
            spec,
            style: LineStyle::default(),
            visible: true,
        }
    }

    /// Matching key of the contour value.
    pub fn key(&self) -> String {
        value_key(self.value)
    }

    pub fn label(&self) -> String {
        value_label(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtremumKind {
    Maxima,
    Minima,
    Saddle,
}

/// A located maximum, minimum or saddle point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremumMark {
    pub kind: ExtremumKind,
    pub point: Point2,
    pub value: f64,
    pub style: MarkStyle,
    pub visible: bool,
}

impl ExtremumMark {
    pub fn new(kind: ExtremumKind, point: Point2, value: f64) -> Self {
        Self {
            kind,
            point,
            value,
            style: MarkStyle::default(),
            visible: true,
        }
    }
}

/// A wind-style barb: direction in degrees and speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorBarb {
    pub point: Point2,
    pub direction: f64,
    pub speed: f64,
    pub style: BarbStyle,
    pub visible: bool,
}

impl VectorBarb {
    pub fn new(point: Point2, direction: f64, speed: f64) -> Self {
        Self {
            point,
            direction,
            speed,
            style: BarbStyle::default(),
            visible: true,
        }
    }
}
