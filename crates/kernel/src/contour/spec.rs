use serde::{Deserialize, Serialize};
use tracing::warn;

/// Slack applied when deciding which contour values fall in a range.
pub const VALUE_TOL: f64 = 1e-6;

/// Line styling for contours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub colour: String,
    pub width: f64,
    pub pattern: String,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            colour: "black".into(),
            width: 1.0,
            pattern: "solid".into(),
        }
    }
}

/// Styling for extremum marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkStyle {
    pub colour: String,
    pub symbol: String,
    pub size: f64,
}

impl Default for MarkStyle {
    fn default() -> Self {
        Self {
            colour: "black".into(),
            symbol: "cross".into(),
            size: 1.0,
        }
    }
}

/// Styling for vector barbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarbStyle {
    pub colour: String,
    pub length: f64,
}

impl Default for BarbStyle {
    fn default() -> Self {
        Self {
            colour: "black".into(),
            length: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecStyle {
    pub line: LineStyle,
    pub mark: MarkStyle,
    pub barb: BarbStyle,
}

/// What a contour specification asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpecKind {
    /// Every `std + k * step` within `[min, max]`. A zero step means the
    /// single value `std`.
    Range { min: f64, max: f64, std: f64, step: f64 },
    /// Explicit values.
    List { values: Vec<f64> },
    Maxima { min: f64, max: f64 },
    Minima { min: f64, max: f64 },
    Saddle { min: f64, max: f64 },
    /// Vector barbs. `mult > 0` draws a `mult x mult` grid per patch,
    /// `mult < 0` one barb every `|mult|` patches.
    Vector { mult: i32 },
}

/// A contour specification plus its styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourSpec {
    pub kind: SpecKind,
    #[serde(default)]
    pub style: SpecStyle,
}

impl ContourSpec {
    pub fn new(kind: SpecKind) -> Self {
        Self {
            kind,
            style: SpecStyle::default(),
        }
    }

    pub fn range(min: f64, max: f64, std: f64, step: f64) -> Self {
        Self::new(SpecKind::Range { min, max, std, step })
    }

    pub fn list(values: Vec<f64>) -> Self {
        Self::new(SpecKind::List { values })
    }

    pub fn maxima(min: f64, max: f64) -> Self {
        Self::new(SpecKind::Maxima { min, max })
    }

    pub fn minima(min: f64, max: f64) -> Self {
        Self::new(SpecKind::Minima { min, max })
    }

    pub fn saddle(min: f64, max: f64) -> Self {
        Self::new(SpecKind::Saddle { min, max })
    }

    pub fn vector(mult: i32) -> Self {
        Self::new(SpecKind::Vector { mult })
    }

    /// Spec used for the derivative-zero root lists.
    pub fn zero() -> Self {
        Self::range(0.0, 0.0, 0.0, 0.0)
    }

    pub fn with_style(mut self, style: SpecStyle) -> Self {
        self.style = style;
        self
    }

    /// True for specs that produce value contours.
    pub fn is_level_spec(&self) -> bool {
        matches!(self.kind, SpecKind::Range { .. } | SpecKind::List { .. })
    }

    /// Contour values this spec asks for within `[vmin, vmax]`, at most
    /// `max_levels` of them.
    ///
    /// Range limits are widened by [`VALUE_TOL`] before clipping to the
    /// interval. List values must lie strictly inside it.
    pub fn levels_in(&self, vmin: f64, vmax: f64, max_levels: usize) -> Vec<f64> {
        match &self.kind {
            SpecKind::Range { min, max, std, step } => {
                let cmin = (min - VALUE_TOL).max(vmin);
                let cmax = (max + VALUE_TOL).min(vmax);
                let step = step.abs();
                if step == 0.0 {
                    return if *std >= cmin && *std <= cmax { vec![*std] } else { Vec::new() };
                }
                let kmin = ((cmin - std) / step).ceil() as i64;
                let kmax = ((cmax - std) / step).floor() as i64;
                let count = kmax.saturating_sub(kmin).saturating_add(1);
                let wanted = usize::try_from(count).unwrap_or(0);
                if wanted > max_levels {
                    warn!(cmin, cmax, step, count, max_levels, "range spec asks for too many levels, truncating");
                }
                (kmin..=kmax).take(max_levels).map(|k| std + step * k as f64).collect()
            }
            SpecKind::List { values } => values
                .iter()
                .copied()
                .filter(|v| *v > vmin && *v < vmax)
                .take(max_levels)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True if a contour of value `v` belongs to this spec, compared at
    /// label (nearest integer) precision.
    pub fn matches_level(&self, v: f64) -> bool {
        let label = v.round();
        match &self.kind {
            SpecKind::Range { min, max, std, step } => {
                if v < *min || v > *max {
                    return false;
                }
                let cval = if *step != 0.0 {
                    std + step * ((v - std) / step).ceil()
                } else {
                    *std
                };
                cval.round() == label
            }
            SpecKind::List { values } => values.iter().any(|c| c.round() == label),
            _ => false,
        }
    }
}

/// Key used to match roots and fragments of the same contour value.
pub fn value_key(v: f64) -> String {
    format!("{v:.2}")
}

/// Display label of a contour value (nearest integer).
pub fn value_label(v: f64) -> String {
    format!("{}", v.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 250;

    #[test]
    fn test_range_levels() {
        let spec = ContourSpec::range(0.0, 10.0, 0.0, 2.0);
        assert_eq!(spec.levels_in(3.0, 9.5, MAX), vec![4.0, 6.0, 8.0]);
        assert_eq!(spec.levels_in(-5.0, 50.0, MAX).len(), 6);
        assert!(spec.levels_in(4.5, 5.5, MAX).is_empty());
    }

    #[test]
    fn test_range_with_offset_standard() {
        let spec = ContourSpec::range(-100.0, 100.0, 1.0, 4.0);
        assert_eq!(spec.levels_in(0.0, 10.0, MAX), vec![1.0, 5.0, 9.0]);
    }

    #[test]
    fn test_zero_step_is_single_value() {
        assert_eq!(ContourSpec::zero().levels_in(-3.0, 3.0, MAX), vec![0.0]);
        assert!(ContourSpec::zero().levels_in(2.0, 3.0, MAX).is_empty());
        let spec = ContourSpec::range(0.0, 10.0, 4.0, 0.0);
        assert_eq!(spec.levels_in(3.0, 5.0, MAX), vec![4.0]);
        assert!(spec.levels_in(4.5, 9.0, MAX).is_empty());
    }

    #[test]
    fn test_level_count_is_capped() {
        let spec = ContourSpec::range(-1e9, 1e9, 0.0, 1e-6);
        let levels = spec.levels_in(-1e9, 1e9, MAX);
        assert_eq!(levels.len(), MAX);
        assert!(levels.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(ContourSpec::list(vec![1.0, 2.0, 3.0]).levels_in(0.0, 5.0, 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_list_levels_strictly_inside() {
        let spec = ContourSpec::list(vec![1.0, 2.0, 3.0]);
        assert_eq!(spec.levels_in(1.0, 3.0, MAX), vec![2.0]);
        assert!(ContourSpec::maxima(0.0, 1.0).levels_in(-1.0, 2.0, MAX).is_empty());
        assert!(spec.is_level_spec());
        assert!(!ContourSpec::vector(2).is_level_spec());
    }

    #[test]
    fn test_matches_level() {
        let spec = ContourSpec::range(0.0, 20.0, 0.0, 5.0);
        assert!(spec.matches_level(10.0));
        assert!(!spec.matches_level(12.0));
        assert!(!spec.matches_level(25.0));
        assert!(ContourSpec::list(vec![3.2]).matches_level(3.0));
    }

    #[test]
    fn test_key_and_label() {
        assert_eq!(value_key(5.0), "5.00");
        assert_eq!(value_key(2.345678), "2.35");
        assert_eq!(value_label(4.6), "5");
        assert_eq!(value_label(-2.4), "-2");
    }

    #[test]
    fn test_spec_json() {
        let spec: ContourSpec =
            serde_json::from_str(r#"{"kind":{"type":"range","min":0,"max":10,"std":0,"step":1}}"#).unwrap();
        assert_eq!(spec.kind, SpecKind::Range { min: 0.0, max: 10.0, std: 0.0, step: 1.0 });
        assert_eq!(spec.style, SpecStyle::default());
    }
}
