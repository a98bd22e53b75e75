use std::path::PathBuf;

use super::flash::FlashMode;
use super::orientation::CaptureOrientation;

/// Session preset selecting the capture pipeline's quality target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPreset {
    /// Highest-quality stills; the preview stream runs at whatever rate the
    /// hardware can sustain alongside them.
    Photo,
    /// High-quality video-oriented streaming.
    High,
}

/// How the photo output trades capture latency for quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityPrioritization {
    Speed,
    Balanced,
    Quality,
}

/// Codec for still captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotoCodec {
    Jpeg,
    Png,
}

/// Standing configuration of the still-photo output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoOutputSettings {
    pub codec: PhotoCodec,
    pub high_resolution: bool,
    pub quality_prioritization: QualityPrioritization,
}

impl Default for PhotoOutputSettings {
    fn default() -> Self {
        Self {
            codec: PhotoCodec::Jpeg,
            high_resolution: true,
            quality_prioritization: QualityPrioritization::Quality,
        }
    }
}

/// Settings attached to a single photo request.
///
/// Captured at request time so a later flash-mode change cannot affect an
/// in-flight capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSettings {
    pub flash_mode: FlashMode,
    pub orientation: Option<CaptureOrientation>,
}

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub preset: SessionPreset,
    pub photo: PhotoOutputSettings,

    /// Directory where recorded clips are written. Cleanup of finished clips
    /// is the caller's responsibility.
    pub recording_directory: PathBuf,

    /// Container extension for recorded clip file names, without the dot.
    pub recording_extension: String,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.recording_extension.is_empty() {
            return Err("recording extension must not be empty".into());
        }
        if self.recording_extension.contains('.') {
            return Err(format!(
                "recording extension must not contain a dot: {}",
                self.recording_extension
            ));
        }
        if self.recording_directory.as_os_str().is_empty() {
            return Err("recording directory must not be empty".into());
        }
        Ok(())
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            preset: SessionPreset::Photo,
            photo: PhotoOutputSettings::default(),
            recording_directory: std::env::temp_dir(),
            recording_extension: "mjpeg".into(),
        }
    }
}
