//! Configuration for contour tracking and surface memory management.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FieldError;
use crate::Tolerance;

/// Environment variable naming the tracking mode.
pub const TRACK_CONTROL_ENV: &str = "FIELD_TRACK_CONTROL";

/// Surfaces with at most this many patches across (`nu + nv`) use the
/// shortest segments and tightest zero tolerance.
const N_MIN: usize = 25;
/// ... and at least this many the longest and loosest.
const N_MAX: usize = 100;

/// How the tracker steps along a contour inside a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackMode {
    /// Bounding squares, normal segment lengths.
    #[default]
    Square,
    /// Bounding squares, short segments.
    TightSquare,
    /// Arcs of a circle, normal segment lengths.
    Circle,
    /// Arcs of a circle, short segments.
    TightCircle,
}

impl TrackMode {
    /// Parse a mode name, case-insensitively. Unknown names give `Square`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "TIGHT_SQUARE" => Self::TightSquare,
            "CIRCLE" => Self::Circle,
            "TIGHT_CIRCLE" => Self::TightCircle,
            _ => Self::Square,
        }
    }

    pub fn is_square(&self) -> bool {
        matches!(self, Self::Square | Self::TightSquare)
    }

    pub fn is_tight(&self) -> bool {
        matches!(self, Self::TightSquare | Self::TightCircle)
    }
}

/// Tracker tuning. Step lengths are in unit patch coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub mode: TrackMode,
    /// Segment length range interpolated over the surface size.
    pub seg_min: f64,
    pub seg_max: f64,
    /// Zero-finding tolerance range interpolated the same way.
    pub tol_min: f64,
    pub tol_max: f64,
    /// Sign-change sampling resolution around a circle.
    pub num_arc: usize,
    /// Angle kept clear either side of the way back in circle mode (radians).
    pub arc_gap: f64,
    /// Most points one tracked fragment may have.
    pub max_points: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::square()
    }
}

impl TrackerConfig {
    pub fn square() -> Self {
        Self {
            mode: TrackMode::Square,
            seg_min: 0.10,
            seg_max: 0.30,
            tol_min: 0.005,
            tol_max: 0.02,
            num_arc: 12,
            arc_gap: PI / 36.0,
            max_points: 50,
        }
    }

    pub fn tight_square() -> Self {
        Self {
            mode: TrackMode::TightSquare,
            seg_min: 0.05,
            seg_max: 0.10,
            ..Self::square()
        }
    }

    pub fn circle() -> Self {
        Self {
            mode: TrackMode::Circle,
            ..Self::square()
        }
    }

    pub fn tight_circle() -> Self {
        Self {
            mode: TrackMode::TightCircle,
            ..Self::tight_square()
        }
    }

    pub fn for_mode(mode: TrackMode) -> Self {
        match mode {
            TrackMode::Square => Self::square(),
            TrackMode::TightSquare => Self::tight_square(),
            TrackMode::Circle => Self::circle(),
            TrackMode::TightCircle => Self::tight_circle(),
        }
    }

    /// Configuration named by [`TRACK_CONTROL_ENV`], square when unset.
    pub fn from_env() -> Self {
        Self::from_control(std::env::var(TRACK_CONTROL_ENV).ok().as_deref())
    }

    /// Configuration for an optional track control name.
    pub fn from_control(name: Option<&str>) -> Self {
        let mode = name.map(TrackMode::from_name).unwrap_or_default();
        debug!(?mode, "tracking mode");
        Self::for_mode(mode)
    }

    /// Parameters for a surface of `nu x nv` patches.
    pub fn tuned_for(&self, nu: usize, nv: usize) -> TrackerParams {
        let n = nu + nv;
        let fact = if n <= N_MIN {
            0.0
        } else if n >= N_MAX {
            1.0
        } else {
            (n - N_MIN) as f64 / (N_MAX - N_MIN) as f64
        };
        let params = TrackerParams {
            seg_len: self.seg_min + (self.seg_max - self.seg_min) * fact,
            zero_tol: self.tol_min + (self.tol_max - self.tol_min) * fact,
            square: self.mode.is_square(),
            num_arc: self.num_arc.max(1),
            arc_gap: self.arc_gap,
            max_points: self.max_points,
        };
        debug!(
            seg_len = params.seg_len,
            zero_tol = params.zero_tol,
            square = params.square,
            "patch control"
        );
        params
    }
}

/// Tracker parameters resolved for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerParams {
    pub seg_len: f64,
    pub zero_tol: f64,
    pub square: bool,
    pub num_arc: usize,
    pub arc_gap: f64,
    pub max_points: usize,
}

impl Default for TrackerParams {
    fn default() -> Self {
        TrackerConfig::default().tuned_for(0, 0)
    }
}

/// When patches and intersection lists are materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationPolicy {
    /// Every cell allocated up front and kept.
    Eager,
    /// Allocated on first use and kept.
    #[default]
    Lazy,
    /// Allocated for one call and freed afterwards, unless contoured.
    AllocateAndFree,
}

/// Bounded retry used when building band areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: usize,
    /// Each retry widens the band by this fraction of its width.
    pub nudge_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 100,
            nudge_fraction: 1.0 / 1000.0,
        }
    }
}

/// Sanity limits on how many contour levels a range spec may produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContourLimits {
    pub max_levels: usize,
    /// Widen the step of a range spec that exceeds `max_levels`.
    pub adjust_step: bool,
}

impl Default for ContourLimits {
    fn default() -> Self {
        Self {
            max_levels: 250,
            adjust_step: true,
        }
    }
}

/// Everything a surface needs to know beyond its spline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub tracker: TrackerConfig,
    pub policy: AllocationPolicy,
    pub retry: RetryPolicy,
    pub limits: ContourLimits,
    pub tolerance: Tolerance,
}

impl SurfaceConfig {
    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    /// Parse from JSON. Missing sections take their defaults.
    pub fn from_json(text: &str) -> Result<Self, FieldError> {
        let config: Self = serde_json::from_str(text).map_err(|e| FieldError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        let t = &self.tracker;
        if !(t.seg_min > 0.0 && t.seg_max >= t.seg_min) {
            return Err(FieldError::InvalidConfig {
                reason: format!("segment range {}..{} is not positive and ordered", t.seg_min, t.seg_max),
            });
        }
        if !(t.tol_min > 0.0 && t.tol_max >= t.tol_min) {
            return Err(FieldError::InvalidConfig {
                reason: format!("tolerance range {}..{} is not positive and ordered", t.tol_min, t.tol_max),
            });
        }
        let tol = &self.tolerance;
        if !(tol.tidy_end >= 0.0 && tol.tidy_snap >= tol.tidy_end) {
            return Err(FieldError::InvalidConfig {
                reason: format!("tidy tolerances {} / {} are not ordered", tol.tidy_end, tol.tidy_snap),
            });
        }
        if !(self.retry.nudge_fraction > 0.0) {
            return Err(FieldError::InvalidConfig {
                reason: "retry nudge fraction must be positive".into(),
            });
        }
        Ok(())
    }
}
