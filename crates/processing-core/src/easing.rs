//! Easing curve evaluation.
//!
//! An [`EasingSpec`] is resolved once into a [`Curve`]; evaluation is then a
//! plain match with no allocation. Every curve maps `0 → 0` and `1 → 1`
//! exactly, and inputs outside `[0, 1]` are clamped (NaN counts as 0).

use curvecut_project_model::easing::{EasingPreset, EasingSpec};
use serde::Serialize;

/// Newton-Raphson iterations before falling back to bisection.
const NEWTON_ITERATIONS: usize = 8;
/// Convergence tolerance on X, and the derivative floor for Newton steps.
const EPSILON: f64 = 1e-6;
/// Upper bound on bisection steps (2^-64 is far below `EPSILON`).
const BISECTION_ITERATIONS: usize = 64;

/// Polynomial/transcendental families shared by the `in`, `out`, and
/// `in_out` forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Quad,
    Cubic,
    Quart,
    Quint,
    Sine,
    Expo,
    Circ,
}

impl Family {
    /// Ease-in form on `[0, 1]`.
    fn ease_in(self, t: f64) -> f64 {
        match self {
            Family::Quad => t * t,
            Family::Cubic => t * t * t,
            Family::Quart => t.powi(4),
            Family::Quint => t.powi(5),
            Family::Sine => 1.0 - (t * std::f64::consts::FRAC_PI_2).cos(),
            Family::Expo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Family::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        }
    }

    fn ease_out(self, t: f64) -> f64 {
        1.0 - self.ease_in(1.0 - t)
    }

    fn ease_in_out(self, t: f64) -> f64 {
        if t < 0.5 {
            self.ease_in(2.0 * t) / 2.0
        } else {
            1.0 - self.ease_in(2.0 - 2.0 * t) / 2.0
        }
    }
}

/// Cubic bezier with endpoints pinned at (0,0) and (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    ax: f64,
    bx: f64,
    cx: f64,
    ay: f64,
    by: f64,
    cy: f64,
}

impl CubicBezier {
    /// Control points are expected in `[0, 1]`, as [`EasingSpec::bezier`] guarantees.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn x_at(&self, s: f64) -> f64 {
        ((self.ax * s + self.bx) * s + self.cx) * s
    }

    fn y_at(&self, s: f64) -> f64 {
        ((self.ay * s + self.by) * s + self.cy) * s
    }

    fn dx_at(&self, s: f64) -> f64 {
        (3.0 * self.ax * s + 2.0 * self.bx) * s + self.cx
    }

    /// Curve parameter whose X equals `x`.
    fn solve_parameter(&self, x: f64) -> f64 {
        let mut s = x;
        for _ in 0..NEWTON_ITERATIONS {
            let error = self.x_at(s) - x;
            if error.abs() < EPSILON {
                return s;
            }
            let slope = self.dx_at(s);
            if slope.abs() < EPSILON {
                break;
            }
            s -= error / slope;
        }
        self.bisect(x)
    }

    fn bisect(&self, x: f64) -> f64 {
        let (mut lo, mut hi) = (0.0, 1.0);
        let mut s = x;
        for _ in 0..BISECTION_ITERATIONS {
            let current = self.x_at(s);
            if (current - x).abs() < EPSILON {
                break;
            }
            if current < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) / 2.0;
        }
        s
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let s = self.solve_parameter(x);
        self.y_at(s).clamp(0.0, 1.0)
    }
}

/// A resolved easing function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    In(Family),
    Out(Family),
    InOut(Family),
    /// `first` eased in over `[0, 0.5]`, `second` eased out over `[0.5, 1]`.
    Hybrid { first: Family, second: Family },
    Bezier(CubicBezier),
}

impl Curve {
    /// The steep front-loaded hybrid used for high-quality sources.
    pub const HARSH: Curve = Curve::Hybrid {
        first: Family::Expo,
        second: Family::Cubic,
    };

    /// The softer hybrid used otherwise.
    pub const GENTLE: Curve = Curve::Hybrid {
        first: Family::Cubic,
        second: Family::Quad,
    };

    /// Resolve a spec. `Auto` resolves to the gentle hybrid; callers that know
    /// the clip adapt it first (see [`crate::curve_choice`]).
    pub fn from_spec(spec: EasingSpec) -> Self {
        match spec.normalized() {
            EasingSpec::Preset(preset) => Self::from_preset(preset),
            EasingSpec::Bezier([x1, y1, x2, y2]) => {
                Curve::Bezier(CubicBezier::new(x1, y1, x2, y2))
            }
        }
    }

    pub fn from_preset(preset: EasingPreset) -> Self {
        use EasingPreset as P;
        match preset {
            P::Linear => Curve::Linear,
            P::EaseInQuad => Curve::In(Family::Quad),
            P::EaseOutQuad => Curve::Out(Family::Quad),
            P::EaseInOutQuad => Curve::InOut(Family::Quad),
            P::EaseInCubic => Curve::In(Family::Cubic),
            P::EaseOutCubic => Curve::Out(Family::Cubic),
            P::EaseInOutCubic => Curve::InOut(Family::Cubic),
            P::EaseInQuart => Curve::In(Family::Quart),
            P::EaseOutQuart => Curve::Out(Family::Quart),
            P::EaseInOutQuart => Curve::InOut(Family::Quart),
            P::EaseInQuint => Curve::In(Family::Quint),
            P::EaseOutQuint => Curve::Out(Family::Quint),
            P::EaseInOutQuint => Curve::InOut(Family::Quint),
            P::EaseInSine => Curve::In(Family::Sine),
            P::EaseOutSine => Curve::Out(Family::Sine),
            P::EaseInOutSine => Curve::InOut(Family::Sine),
            P::EaseInExpo => Curve::In(Family::Expo),
            P::EaseOutExpo => Curve::Out(Family::Expo),
            P::EaseInOutExpo => Curve::InOut(Family::Expo),
            P::EaseInCirc => Curve::In(Family::Circ),
            P::EaseOutCirc => Curve::Out(Family::Circ),
            P::EaseInOutCirc => Curve::InOut(Family::Circ),
            P::InExpoOutCubic => Curve::HARSH,
            P::InCubicOutQuad | P::Auto => Curve::GENTLE,
        }
    }

    /// Evaluate at `t`, clamped to `[0, 1]`.
    pub fn evaluate(&self, t: f64) -> f64 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match *self {
            Curve::Linear => t,
            Curve::In(family) => family.ease_in(t),
            Curve::Out(family) => family.ease_out(t),
            Curve::InOut(family) => family.ease_in_out(t),
            Curve::Hybrid { first, second } => {
                if t < 0.5 {
                    first.ease_in(t * 2.0) * 0.5
                } else {
                    0.5 + second.ease_out(t * 2.0 - 1.0) * 0.5
                }
            }
            Curve::Bezier(bezier) => bezier.evaluate(t),
        }
    }

    /// `count` evenly spaced samples over `[0, 1]`, endpoints included.
    pub fn sample(&self, count: usize) -> Vec<CurvePoint> {
        let count = count.max(2);
        (0..count)
            .map(|i| {
                let t = i as f64 / (count - 1) as f64;
                CurvePoint {
                    t,
                    value: self.evaluate(t),
                }
            })
            .collect()
    }
}

/// Evaluate a spec once. Resolve with [`Curve::from_spec`] for repeated use.
pub fn evaluate(spec: EasingSpec, t: f64) -> f64 {
    Curve::from_spec(spec).evaluate(t)
}

/// One sampled point of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub t: f64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact_for_every_preset() {
        for preset in EasingPreset::ALL {
            let curve = Curve::from_preset(preset);
            assert_eq!(curve.evaluate(0.0), 0.0, "{preset}");
            assert_eq!(curve.evaluate(1.0), 1.0, "{preset}");
        }
    }

    #[test]
    fn test_known_midpoints() {
        assert!((evaluate(EasingSpec::Preset(EasingPreset::Linear), 0.3) - 0.3).abs() < 1e-12);
        assert!(
            (evaluate(EasingSpec::Preset(EasingPreset::EaseInQuad), 0.5) - 0.25).abs() < 1e-12
        );
        assert!(
            (evaluate(EasingSpec::Preset(EasingPreset::EaseOutCubic), 0.5) - 0.875).abs() < 1e-12
        );
        for preset in [
            EasingPreset::EaseInOutSine,
            EasingPreset::EaseInOutExpo,
            EasingPreset::InExpoOutCubic,
            EasingPreset::InCubicOutQuad,
        ] {
            let mid = evaluate(EasingSpec::Preset(preset), 0.5);
            assert!((mid - 0.5).abs() < 1e-9, "{preset}: {mid}");
        }
    }

    #[test]
    fn test_out_of_range_inputs_clamp() {
        let curve = Curve::from_preset(EasingPreset::EaseInOutCubic);
        assert_eq!(curve.evaluate(-0.5), 0.0);
        assert_eq!(curve.evaluate(2.0), 1.0);
        assert_eq!(curve.evaluate(f64::NAN), 0.0);
    }

    #[test]
    fn test_linear_bezier_is_identity() {
        let curve = Curve::from_spec(EasingSpec::bezier(0.0, 0.0, 1.0, 1.0));
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert!((curve.evaluate(t) - t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_css_ease_matches_reference_values() {
        // cubic-bezier(0.25, 0.1, 0.25, 1.0) at x = 0.5 is ~0.8024.
        let curve = Curve::from_spec(EasingSpec::bezier(0.25, 0.1, 0.25, 1.0));
        assert!((curve.evaluate(0.5) - 0.8024).abs() < 1e-3);
    }

    #[test]
    fn test_flat_derivative_falls_back_to_bisection() {
        // dX/ds is zero at s = 0.5 for this curve.
        let curve = Curve::from_spec(EasingSpec::bezier(1.0, 0.0, 0.0, 1.0));
        let y = curve.evaluate(0.5);
        assert!((y - 0.5).abs() < 1e-4);
        let low = curve.evaluate(0.45);
        let high = curve.evaluate(0.55);
        assert!(low <= y && y <= high);
    }

    #[test]
    fn test_sample_includes_endpoints() {
        let points = Curve::Linear.sample(5);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].value, 0.0);
        assert_eq!(points[4].value, 1.0);
        assert!((points[2].t - 0.5).abs() < 1e-12);
    }
}
