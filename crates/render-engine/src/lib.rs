//! CurveCut Render Engine
//!
//! Turns ordered segments into one speed-curved, audio-mixed container.
//!
//! # Pipeline Architecture
//!
//! ```text
//! clip_1 ──► SpeedCurveProcessor ──┐
//! clip_2 ──► SpeedCurveProcessor ──┤ (cached per segment)
//! clip_n ──► SpeedCurveProcessor ──┤
//!                                  ├──► Stitcher ──► output container
//! audio ───► AudioPreparer ────────┘
//! ```
//!
//! All codec work goes through the [`MediaEngine`] trait; [`MemoryEngine`]
//! is the in-process reference implementation.

pub mod audio;
pub mod clip;
pub mod config;
pub mod engine;
pub mod finalize;
pub mod memory;
pub mod progress;
pub mod stitch;

pub use audio::AudioPreparer;
pub use clip::{ClipJob, SpeedCurveProcessor};
pub use config::PipelineConfig;
pub use engine::*;
pub use finalize::*;
pub use memory::{MemoryCapabilities, MemoryContainer, MemoryEngine};
pub use progress::*;
pub use stitch::{StitchOutput, Stitcher};
