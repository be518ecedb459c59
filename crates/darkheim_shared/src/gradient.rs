//! # Biome Gradients
//!
//! A gradient is a biome-relative horizontal position in `[0, 1]`: 0 at the
//! biome's west edge, 1 at its east edge. Spawn densities are blended
//! across it so content thins out or thickens toward a neighbouring biome.

use serde::{Deserialize, Serialize};

use crate::constants::CHUNK_PIXEL_SIZE;

/// Shaping curve applied to the raw gradient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradientCurve {
    /// `t`
    #[default]
    Linear,
    /// `t²` - slow start, fast finish.
    EaseIn,
    /// `1 - (1 - t)²` - fast start, slow finish.
    EaseOut,
    /// Quadratic in, quadratic out, joined at 0.5.
    EaseInOut,
}

impl GradientCurve {
    /// Applies the curve to `t` (expected in `[0, 1]`).
    #[inline]
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
        }
    }
}

/// Normalises a world pixel X into the span of chunk columns
/// `[start_chunk_x, end_chunk_x)` and applies `curve`.
///
/// The result is clamped to `[0, 1]`. A degenerate span yields 0.5 and a
/// non-finite position yields 0.
#[must_use]
pub fn biome_gradient(world_x: f64, start_chunk_x: i32, end_chunk_x: i32, curve: GradientCurve) -> f64 {
    let start = f64::from(start_chunk_x) * f64::from(CHUNK_PIXEL_SIZE);
    let end = f64::from(end_chunk_x) * f64::from(CHUNK_PIXEL_SIZE);
    let range = end - start;
    if range <= 0.0 {
        return 0.5;
    }
    let t = (world_x - start) / range;
    if t.is_nan() {
        return 0.0;
    }
    curve.apply(t.clamp(0.0, 1.0))
}

/// Linearly interpolates a density between its west and east values.
#[inline]
#[must_use]
pub fn gradient_density(gradient: f64, density_at_left: f64, density_at_right: f64) -> f64 {
    density_at_left + (density_at_right - density_at_left) * gradient
}

/// Returns true if `gradient` lies in `[min, max]` (inclusive).
#[inline]
#[must_use]
pub fn in_gradient_range(gradient: f64, min: f64, max: f64) -> bool {
    gradient >= min && gradient <= max
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_curves_fix_endpoints() {
        for curve in [
            GradientCurve::Linear,
            GradientCurve::EaseIn,
            GradientCurve::EaseOut,
            GradientCurve::EaseInOut,
        ] {
            assert!(curve.apply(0.0).abs() < EPS, "{curve:?} at 0");
            assert!((curve.apply(1.0) - 1.0).abs() < EPS, "{curve:?} at 1");
        }
    }

    #[test]
    fn test_curve_shapes() {
        assert!((GradientCurve::EaseIn.apply(0.5) - 0.25).abs() < EPS);
        assert!((GradientCurve::EaseOut.apply(0.5) - 0.75).abs() < EPS);
        assert!((GradientCurve::EaseInOut.apply(0.5) - 0.5).abs() < EPS);
        assert!((GradientCurve::EaseInOut.apply(0.25) - 0.125).abs() < EPS);
        assert!((GradientCurve::EaseInOut.apply(0.75) - 0.875).abs() < EPS);
    }

    #[test]
    fn test_biome_gradient_clamps() {
        // Span of chunk columns 0..10 = pixels 0..5120.
        let curve = GradientCurve::Linear;
        assert!((biome_gradient(2560.0, 0, 10, curve) - 0.5).abs() < EPS);
        assert_eq!(biome_gradient(-100.0, 0, 10, curve), 0.0);
        assert_eq!(biome_gradient(99_999.0, 0, 10, curve), 1.0);
        assert_eq!(biome_gradient(100.0, 5, 5, curve), 0.5);
        assert_eq!(biome_gradient(f64::NAN, 0, 10, curve), 0.0);
    }

    #[test]
    fn test_density_interpolation() {
        assert!((gradient_density(0.0, 0.2, 0.6) - 0.2).abs() < EPS);
        assert!((gradient_density(1.0, 0.2, 0.6) - 0.6).abs() < EPS);
        assert!((gradient_density(0.5, 0.2, 0.6) - 0.4).abs() < EPS);
    }

    #[test]
    fn test_range_is_inclusive() {
        assert!(in_gradient_range(0.0, 0.0, 1.0));
        assert!(in_gradient_range(1.0, 0.0, 1.0));
        assert!(!in_gradient_range(0.31, 0.0, 0.3));
    }

    #[test]
    fn test_curve_config_names() {
        #[derive(Deserialize)]
        struct Doc {
            curve: GradientCurve,
        }
        let doc: Doc = toml::from_str("curve = \"ease-in-out\"").unwrap();
        assert_eq!(doc.curve, GradientCurve::EaseInOut);
        assert!(toml::from_str::<Doc>("curve = \"wobbly\"").is_err());
    }
}
