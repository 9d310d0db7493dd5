//! CurveCut Project Model
//!
//! Defines the core data contracts for CurveCut finalize runs:
//! - **Segments:** Source clips with their target duration and easing curve
//! - **Media:** Decoded samples, audio buffers, clip metadata, encode tiers
//! - **Cache:** Fingerprinted speed-curved clips reused across runs
//! - **Requests:** What changed since the last run and which stages must run
//!
//! Sample timestamps are integer microseconds; user-facing durations are
//! seconds as `f64`.

pub mod cache;
pub mod easing;
pub mod media;
pub mod project;
pub mod request;
pub mod segment;

pub use cache::*;
pub use easing::*;
pub use media::*;
pub use project::*;
pub use request::*;
pub use segment::*;
