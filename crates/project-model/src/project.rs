//! Project files.
//!
//! A project directory holds a `project.json` describing the ordered segments
//! and optional background audio, plus the source media it references by
//! relative path.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::easing::EasingSpec;
use crate::request::{AudioTrack, FinalizeRequest, UpdateReason};
use crate::segment::{MediaSource, Segment, SegmentId};

/// Name of the project file inside a project directory.
pub const PROJECT_FILE_NAME: &str = "project.json";

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Segments in output order.
    #[serde(default)]
    pub segments: Vec<SegmentEntry>,

    /// Background audio.
    #[serde(default)]
    pub audio: Option<AudioEntry>,
}

/// One segment as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub id: u64,

    /// Path to the source clip, relative to the project root.
    pub source: String,

    pub target_duration_secs: f64,

    #[serde(default)]
    pub easing: EasingSpec,

    #[serde(default)]
    pub loop_iteration: u32,

    /// Source length in seconds, used when the clip's container declares none.
    #[serde(default)]
    pub source_duration_secs: Option<f64>,
}

/// Background audio as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioEntry {
    /// Path to the audio source, relative to the project root.
    pub source: String,

    #[serde(default)]
    pub fade_in_secs: f64,

    #[serde(default)]
    pub fade_out_secs: f64,

    #[serde(default)]
    pub offset_secs: f64,
}

impl ProjectFile {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            created_at: Utc::now(),
            segments: Vec::new(),
            audio: None,
        }
    }

    /// Append a segment with the next free id.
    pub fn push_segment(
        &mut self,
        source: impl Into<String>,
        target_duration_secs: f64,
        easing: EasingSpec,
    ) -> u64 {
        let id = self.segments.iter().map(|s| s.id + 1).max().unwrap_or(1);
        self.segments.push(SegmentEntry {
            id,
            source: source.into(),
            target_duration_secs,
            easing,
            loop_iteration: 0,
            source_duration_secs: None,
        });
        id
    }

    /// Structural checks that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ProjectError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.segments {
            if !seen.insert(entry.id) {
                return Err(ProjectError::ValidationError {
                    message: format!("duplicate segment id {}", entry.id),
                });
            }
            if entry.source.trim().is_empty() {
                return Err(ProjectError::ValidationError {
                    message: format!("segment {} has no source", entry.id),
                });
            }
        }
        Ok(())
    }
}

/// A project file together with the directory it lives in.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    pub file: ProjectFile,
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join(PROJECT_FILE_NAME);

        let json = std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
            path: project_path.clone(),
            source: e,
        })?;
        let file: ProjectFile =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;
        file.validate()?;

        Ok(Self { root, file })
    }

    /// Save the project file, creating the directory if needed.
    pub fn save(&self) -> Result<(), ProjectError> {
        std::fs::create_dir_all(&self.root).map_err(|e| ProjectError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        let project_path = self.root.join(PROJECT_FILE_NAME);
        let json =
            serde_json::to_string_pretty(&self.file).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })
    }

    /// Create a new, empty project on disk.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let loaded = Self {
            root: root.as_ref().to_path_buf(),
            file: ProjectFile::new(name),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Report every referenced source file that does not exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];
        for entry in &self.file.segments {
            if !self.root.join(&entry.source).exists() {
                errors.push(format!(
                    "Segment {} source missing: {}",
                    entry.id, entry.source
                ));
            }
        }
        if let Some(audio) = &self.file.audio {
            if !self.root.join(&audio.source).exists() {
                errors.push(format!("Audio source missing: {}", audio.source));
            }
        }
        errors
    }

    /// Read every referenced source and build a finalize request.
    pub fn to_request(&self, reason: UpdateReason) -> Result<FinalizeRequest, ProjectError> {
        let mut segments = Vec::with_capacity(self.file.segments.len());
        for entry in &self.file.segments {
            let source = self.read_source(&entry.source)?;
            segments.push(
                Segment::new(SegmentId(entry.id), source, entry.target_duration_secs)
                    .with_easing(entry.easing)
                    .with_loop_iteration(entry.loop_iteration)
                    .with_duration_hint(entry.source_duration_secs),
            );
        }

        let mut request = FinalizeRequest::new(segments, reason);
        if let Some(audio) = &self.file.audio {
            let source = self.read_source(&audio.source)?;
            request = request.with_audio(
                AudioTrack::new(source)
                    .with_fades(audio.fade_in_secs, audio.fade_out_secs)
                    .with_offset(audio.offset_secs),
            );
        }
        Ok(request)
    }

    fn read_source(&self, relative: &str) -> Result<MediaSource, ProjectError> {
        let path = self.root.join(relative);
        MediaSource::from_path(&path).map_err(|e| ProjectError::IoError { path, source: e })
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingPreset;

    #[test]
    fn test_push_segment_assigns_increasing_ids() {
        let mut file = ProjectFile::new("Test");
        let a = file.push_segment("a.json", 1.5, EasingSpec::default());
        let b = file.push_segment("b.json", 2.0, EasingSpec::default());
        assert_eq!((a, b), (1, 2));
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut file = ProjectFile::new("Dup");
        file.push_segment("a.json", 1.0, EasingSpec::default());
        file.segments.push(file.segments[0].clone());
        assert!(matches!(
            file.validate(),
            Err(ProjectError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_minimal_json_fills_defaults() {
        let json = r#"{
            "version": "1.0",
            "name": "Minimal",
            "created_at": "2026-01-01T00:00:00Z",
            "segments": [{"id": 3, "source": "clip.json", "target_duration_secs": 2.0}]
        }"#;
        let file: ProjectFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.segments[0].easing, EasingSpec::Preset(EasingPreset::Auto));
        assert_eq!(file.segments[0].loop_iteration, 0);
        assert_eq!(file.segments[0].source_duration_secs, None);
        assert!(file.audio.is_none());
    }

    #[test]
    fn test_create_load_and_build_request() {
        let dir = std::env::temp_dir().join("curvecut_test_project");
        let _ = std::fs::remove_dir_all(&dir);

        let mut created = LoadedProject::create(&dir, "Integration Test").unwrap();
        std::fs::write(dir.join("clip.bin"), [1u8, 2, 3]).unwrap();
        std::fs::write(dir.join("song.bin"), [4u8, 5]).unwrap();
        created.file.push_segment(
            "clip.bin",
            0.0,
            EasingSpec::Preset(EasingPreset::EaseInCubic),
        );
        created.file.segments[0].source_duration_secs = Some(2.5);
        created.file.audio = Some(AudioEntry {
            source: "song.bin".to_string(),
            fade_in_secs: 1.0,
            fade_out_secs: 2.0,
            offset_secs: 0.5,
        });
        created.save().unwrap();

        let loaded = LoadedProject::load(&dir).unwrap();
        assert_eq!(loaded.file.name, "Integration Test");
        assert!(loaded.validate_sources().is_empty());

        let request = loaded.to_request(UpdateReason::Full).unwrap();
        assert_eq!(request.segments.len(), 1);
        assert_eq!(request.segments[0].target_duration_secs(), 0.1);
        assert_eq!(request.segments[0].source.bytes(), &[1u8, 2, 3]);
        assert_eq!(request.segments[0].source_duration_hint_secs, Some(2.5));
        let audio = request.audio.unwrap();
        assert!((audio.fade_out_secs - 2.0).abs() < 1e-12);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let dir = std::env::temp_dir().join("curvecut_test_validate");
        let _ = std::fs::remove_dir_all(&dir);

        let mut loaded = LoadedProject::create(&dir, "Validate Test").unwrap();
        loaded
            .file
            .push_segment("missing.bin", 1.0, EasingSpec::default());

        let errors = loaded.validate_sources();
        assert!(errors.iter().any(|e| e.contains("Segment 1 source missing")));
        assert!(loaded.to_request(UpdateReason::Full).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
