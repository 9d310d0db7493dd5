//! Error types shared across CurveCut crates.

/// Top-level error type for CurveCut operations.
#[derive(Debug, thiserror::Error)]
pub enum CurvecutError {
    #[error("No decodable video track: {message}")]
    NoVideoTrack { message: String },

    #[error("No decodable audio track: {message}")]
    NoAudioTrack { message: String },

    #[error("Unreadable source {source_id}: {message}")]
    UnreadableSource { source_id: String, message: String },

    #[error("No supported encode tier for {width}x{height} (tried {tried} candidates)")]
    NoSupportedEncodeTier {
        width: u32,
        height: u32,
        tried: usize,
    },

    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    #[error("Encode failure: {message}")]
    EncodeFailure { message: String },

    #[error("Decode failure: {message}")]
    DecodeFailure { message: String },

    #[error("Operation cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CurvecutError.
pub type CurvecutResult<T> = Result<T, CurvecutError>;

impl CurvecutError {
    pub fn no_video_track(msg: impl Into<String>) -> Self {
        Self::NoVideoTrack {
            message: msg.into(),
        }
    }

    pub fn no_audio_track(msg: impl Into<String>) -> Self {
        Self::NoAudioTrack {
            message: msg.into(),
        }
    }

    pub fn unreadable(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UnreadableSource {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailure {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: msg.into(),
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the pipeline may degrade to video-only output instead of failing.
    pub fn is_audio_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoAudioTrack { .. }
                | Self::DecodeFailure { .. }
                | Self::UnreadableSource { .. }
                | Self::EncodeFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = CurvecutError::NoSupportedEncodeTier {
            width: 3840,
            height: 2160,
            tried: 3,
        };
        assert_eq!(
            err.to_string(),
            "No supported encode tier for 3840x2160 (tried 3 candidates)"
        );

        let err = CurvecutError::unreadable("clip-7", "no media in source");
        assert!(err.to_string().contains("clip-7"));
    }

    #[test]
    fn test_audio_recoverable_classification() {
        assert!(CurvecutError::no_audio_track("silent").is_audio_recoverable());
        assert!(!CurvecutError::cancelled("stitching").is_audio_recoverable());
        assert!(!CurvecutError::empty_input("no clips").is_audio_recoverable());
    }
}
