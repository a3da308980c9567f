pub mod config;
pub mod contour;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod spline;
pub mod surface;

// Re-export the main entry points at crate root for convenience.
pub use config::{AllocationPolicy, RetryPolicy, SurfaceConfig, TrackMode, TrackerConfig};
pub use contour::{ContourSpec, SpecKind};
pub use error::FieldError;
pub use geometry::{Area, Point2, Polyline, Xform};
pub use spline::Spline;
pub use surface::{AreaSet, CurveSet, Evaluation, RetryOutcome, Surface};

use serde::{Deserialize, Serialize};

/// Tolerances used when tidying and assembling contour geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Fragment ends within this distance of a patch edge (patch units)
    /// are treated as lying on it.
    pub tidy_end: f64,
    /// Furthest an end may be moved onto a matching boundary root.
    pub tidy_snap: f64,
    /// Closed world curves enclosing less than this are dropped.
    pub min_area: f64,
    /// Closed world curves smaller than this are dropped if they cross
    /// themselves.
    pub crossover_area: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            tidy_end: 0.001,
            tidy_snap: 0.5,
            min_area: 1e-6,
            crossover_area: 25.0,
        }
    }
}

impl Tolerance {
    /// True if a closed curve of the given size, which may or may not cross
    /// itself, is too small to keep.
    pub fn discard_loop(&self, size: f64, self_crossing: impl FnOnce() -> bool) -> bool {
        size < self.min_area || (size < self.crossover_area && self_crossing())
    }
}
