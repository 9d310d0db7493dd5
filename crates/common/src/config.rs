//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CurvecutError, CurvecutResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline tuning shared by the processor, preparer, and stitcher.
    #[serde(default)]
    pub pipeline: PipelineDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How decoded sample positions are mapped onto the output timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarpModel {
    /// Trust the decoder's per-sample timestamps.
    Timestamp,
    /// Treat each decoded sample as slot `i` of an expected sample count.
    #[default]
    Elastic,
}

/// Pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    /// Position model used by the time-warp engine.
    pub warp_model: WarpModel,

    /// Shortest sample the warp engine may emit (seconds).
    pub min_sample_duration_secs: f64,

    /// Floor applied to invalid segment target durations (seconds).
    pub min_segment_duration_secs: f64,

    /// Prepared audio buffers are never shorter than this (seconds).
    pub min_audio_duration_secs: f64,

    /// Bitrate floor for the native tier (bits per second).
    pub native_bitrate_floor: u32,

    /// Long/short edge caps and bitrate ceiling for the 1080p tier.
    pub hd_long_edge: u32,
    pub hd_short_edge: u32,
    pub hd_max_bitrate: u32,

    /// Long/short edge caps and bitrate ceiling for the 720p tier.
    pub sd_long_edge: u32,
    pub sd_short_edge: u32,
    pub sd_max_bitrate: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "curvecut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            warp_model: WarpModel::Elastic,
            min_sample_duration_secs: 0.004,
            min_segment_duration_secs: 0.1,
            min_audio_duration_secs: 1.0,
            native_bitrate_floor: 2_000_000,
            hd_long_edge: 1920,
            hd_short_edge: 1080,
            hd_max_bitrate: 8_000_000,
            sd_long_edge: 1280,
            sd_short_edge: 720,
            sd_max_bitrate: 5_000_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl PipelineDefaults {
    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> CurvecutResult<()> {
        if !(self.min_sample_duration_secs > 0.0) {
            return Err(CurvecutError::config(
                "min_sample_duration_secs must be positive",
            ));
        }
        if !(self.min_segment_duration_secs > 0.0) {
            return Err(CurvecutError::config(
                "min_segment_duration_secs must be positive",
            ));
        }
        if self.min_audio_duration_secs < 0.0 {
            return Err(CurvecutError::config(
                "min_audio_duration_secs must not be negative",
            ));
        }
        if self.hd_long_edge < self.hd_short_edge || self.sd_long_edge < self.sd_short_edge {
            return Err(CurvecutError::config(
                "tier long edge must be at least the short edge",
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.pipeline.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring invalid config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("curvecut").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.pipeline.validate().is_ok());
        assert_eq!(config.pipeline.warp_model, WarpModel::Elastic);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"warp_model": "timestamp"}}"#).unwrap();
        assert_eq!(config.pipeline.warp_model, WarpModel::Timestamp);
        assert!((config.pipeline.min_segment_duration_secs - 0.1).abs() < 1e-12);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_validate_rejects_zero_sample_floor() {
        let pipeline = PipelineDefaults {
            min_sample_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            pipeline.validate(),
            Err(CurvecutError::Config { .. })
        ));
    }
}
