//! Easing specifications attached to segments.
//!
//! A segment carries exactly one active spec: a named preset or a custom
//! cubic bezier. Evaluation lives in the processing core; this module only
//! defines the data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named easing presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EasingPreset {
    /// The default curve: the processor picks a hybrid from clip metadata.
    #[default]
    Auto,
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    /// Exponential ease-in on the first half, cubic ease-out on the second.
    InExpoOutCubic,
    /// Cubic ease-in on the first half, quadratic ease-out on the second.
    InCubicOutQuad,
}

impl EasingPreset {
    /// Every preset, in declaration order.
    pub const ALL: [EasingPreset; 25] = [
        EasingPreset::Auto,
        EasingPreset::Linear,
        EasingPreset::EaseInQuad,
        EasingPreset::EaseOutQuad,
        EasingPreset::EaseInOutQuad,
        EasingPreset::EaseInCubic,
        EasingPreset::EaseOutCubic,
        EasingPreset::EaseInOutCubic,
        EasingPreset::EaseInQuart,
        EasingPreset::EaseOutQuart,
        EasingPreset::EaseInOutQuart,
        EasingPreset::EaseInQuint,
        EasingPreset::EaseOutQuint,
        EasingPreset::EaseInOutQuint,
        EasingPreset::EaseInSine,
        EasingPreset::EaseOutSine,
        EasingPreset::EaseInOutSine,
        EasingPreset::EaseInExpo,
        EasingPreset::EaseOutExpo,
        EasingPreset::EaseInOutExpo,
        EasingPreset::EaseInCirc,
        EasingPreset::EaseOutCirc,
        EasingPreset::EaseInOutCirc,
        EasingPreset::InExpoOutCubic,
        EasingPreset::InCubicOutQuad,
    ];

    /// Stable snake_case name, identical to the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            EasingPreset::Auto => "auto",
            EasingPreset::Linear => "linear",
            EasingPreset::EaseInQuad => "ease_in_quad",
            EasingPreset::EaseOutQuad => "ease_out_quad",
            EasingPreset::EaseInOutQuad => "ease_in_out_quad",
            EasingPreset::EaseInCubic => "ease_in_cubic",
            EasingPreset::EaseOutCubic => "ease_out_cubic",
            EasingPreset::EaseInOutCubic => "ease_in_out_cubic",
            EasingPreset::EaseInQuart => "ease_in_quart",
            EasingPreset::EaseOutQuart => "ease_out_quart",
            EasingPreset::EaseInOutQuart => "ease_in_out_quart",
            EasingPreset::EaseInQuint => "ease_in_quint",
            EasingPreset::EaseOutQuint => "ease_out_quint",
            EasingPreset::EaseInOutQuint => "ease_in_out_quint",
            EasingPreset::EaseInSine => "ease_in_sine",
            EasingPreset::EaseOutSine => "ease_out_sine",
            EasingPreset::EaseInOutSine => "ease_in_out_sine",
            EasingPreset::EaseInExpo => "ease_in_expo",
            EasingPreset::EaseOutExpo => "ease_out_expo",
            EasingPreset::EaseInOutExpo => "ease_in_out_expo",
            EasingPreset::EaseInCirc => "ease_in_circ",
            EasingPreset::EaseOutCirc => "ease_out_circ",
            EasingPreset::EaseInOutCirc => "ease_in_out_circ",
            EasingPreset::InExpoOutCubic => "in_expo_out_cubic",
            EasingPreset::InCubicOutQuad => "in_cubic_out_quad",
        }
    }
}

impl fmt::Display for EasingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown preset name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown easing preset: {0}")]
pub struct UnknownPreset(pub String);

impl FromStr for EasingPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EasingPreset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// The active easing curve of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingSpec {
    /// A named, closed-form preset.
    Preset(EasingPreset),
    /// Custom cubic bezier `(x1, y1, x2, y2)`, endpoints pinned at (0,0) and (1,1).
    Bezier([f64; 4]),
}

impl Default for EasingSpec {
    fn default() -> Self {
        EasingSpec::Preset(EasingPreset::Auto)
    }
}

impl EasingSpec {
    /// Custom bezier with every control component clamped to `[0, 1]`.
    pub fn bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        EasingSpec::Bezier([clamp01(x1), clamp01(y1), clamp01(x2), clamp01(y2)])
    }

    /// Whether this spec is a custom curve rather than a preset.
    pub fn is_custom(&self) -> bool {
        matches!(self, EasingSpec::Bezier(_))
    }

    /// Whether the processor should adapt the curve to the clip.
    pub fn is_auto(&self) -> bool {
        matches!(self, EasingSpec::Preset(EasingPreset::Auto))
    }

    /// Copy with bezier components re-clamped (deserialized specs bypass `bezier()`).
    pub fn normalized(self) -> Self {
        match self {
            EasingSpec::Bezier([x1, y1, x2, y2]) => EasingSpec::bezier(x1, y1, x2, y2),
            preset => preset,
        }
    }
}

impl fmt::Display for EasingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EasingSpec::Preset(preset) => write!(f, "{preset}"),
            EasingSpec::Bezier([x1, y1, x2, y2]) => {
                write!(f, "cubic-bezier({x1:.3}, {y1:.3}, {x2:.3}, {y2:.3})")
            }
        }
    }
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip_through_from_str() {
        for preset in EasingPreset::ALL {
            assert_eq!(preset.name().parse::<EasingPreset>().unwrap(), preset);
        }
        assert_eq!(
            "Ease-In-Out-Cubic".parse::<EasingPreset>().unwrap(),
            EasingPreset::EaseInOutCubic
        );
        assert!("wobble".parse::<EasingPreset>().is_err());
    }

    #[test]
    fn test_serde_names_match_name() {
        for preset in EasingPreset::ALL {
            let json = serde_json::to_string(&preset).unwrap();
            assert_eq!(json, format!("\"{}\"", preset.name()));
        }
    }

    #[test]
    fn test_bezier_components_are_clamped() {
        let spec = EasingSpec::bezier(-0.5, 1.7, f64::NAN, 0.4);
        assert_eq!(spec, EasingSpec::Bezier([0.0, 1.0, 0.0, 0.4]));

        let raw: EasingSpec = serde_json::from_str(r#"{"bezier":[2.0,0.1,0.2,-1.0]}"#).unwrap();
        assert_eq!(raw.normalized(), EasingSpec::Bezier([1.0, 0.1, 0.2, 0.0]));
    }

    #[test]
    fn test_spec_json_shape() {
        let spec = EasingSpec::Preset(EasingPreset::EaseOutExpo);
        assert_eq!(
            serde_json::to_string(&spec).unwrap(),
            r#"{"preset":"ease_out_expo"}"#
        );
        assert!(EasingSpec::default().is_auto());
        assert!(EasingSpec::bezier(0.2, 0.0, 0.8, 1.0).is_custom());
    }
}
