//! CurveCut Processing Core
//!
//! Pure computation behind speed-curved clips:
//! - **Easing:** Preset and custom-bezier curve evaluation
//! - **Time Warp:** Remapping decoded samples onto a target duration
//! - **Tiers:** Encode tier ladders and capability-driven selection
//! - **Envelope:** Audio loop-fill and fade envelopes
//! - **Curve Choice:** Adapting the default curve to a clip
//!
//! This crate is pure computation: no I/O and no media engine.
//! All inputs are data; all outputs are data.

pub mod curve_choice;
pub mod easing;
pub mod envelope;
pub mod tiers;
pub mod time_warp;

pub use easing::{evaluate, Curve, CurvePoint};
pub use envelope::FadePlan;
pub use tiers::{build_ladder, select_tier, TierLimits};
pub use time_warp::{PositionModel, TimeWarp, WarpEmitter, WarpStats};
