//! Progress events.
//!
//! The pipeline reports through an unbounded channel. Sends never block, and
//! a dropped receiver is not an error: progress is best effort.

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Stages of a finalize run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeStage {
    ApplyingCurves,
    MixingAudio,
    Stitching,
    Complete,
    Error,
}

impl FinalizeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalizeStage::ApplyingCurves => "applying_curves",
            FinalizeStage::MixingAudio => "mixing_audio",
            FinalizeStage::Stitching => "stitching",
            FinalizeStage::Complete => "complete",
            FinalizeStage::Error => "error",
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: FinalizeStage,
    pub message: String,
    /// Overall progress in `[0, 100]`.
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl ProgressEvent {
    pub fn new(stage: FinalizeStage, percent: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            percent: percent.clamp(0.0, 100.0),
            current_index: None,
            total: None,
        }
    }

    pub fn with_position(mut self, current_index: usize, total: usize) -> Self {
        self.current_index = Some(current_index);
        self.total = Some(total);
        self
    }
}

/// Sending half handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        tracing::trace!(
            stage = event.stage.as_str(),
            percent = event.percent,
            "{}",
            event.message
        );
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

/// Maps a stage-local `0..=100` onto a slice of the overall range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSpan {
    pub start: f64,
    pub end: f64,
}

impl ProgressSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn at(&self, local_percent: f64) -> f64 {
        let local = local_percent.clamp(0.0, 100.0) / 100.0;
        if local >= 1.0 {
            return self.end;
        }
        self.start + (self.end - self.start) * local
    }
}
