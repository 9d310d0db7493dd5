//! CurveCut Common Utilities
//!
//! Shared infrastructure for all CurveCut crates:
//! - Error taxonomy and result aliases
//! - Cooperative cancellation flag for long-running finalize runs
//! - Tracing/logging initialization
//! - Configuration loading

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;

pub use cancel::*;
pub use config::*;
pub use error::*;
