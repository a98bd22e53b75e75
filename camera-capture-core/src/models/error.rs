use std::fmt;

use thiserror::Error;

/// Media class a capture device can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Errors that can occur during camera capture operations.
///
/// All of these are local to session setup/operation and never abort the
/// process; the controller boundary logs them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture device available for {0}")]
    DeviceMissing(MediaType),

    #[error("session refused the video input")]
    VideoInputMissing,

    #[error("session refused the photo output")]
    PhotoOutputMissing,

    #[error("session refused the video output")]
    VideoOutputMissing,

    #[error("session is not running")]
    SessionIsNotRunning,

    #[error("video is already recording")]
    VideoIsAlreadyRecording,

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("photo capture failed: {0}")]
    CaptureFailed(String),

    #[error("video recording failed: {0}")]
    RecordingFailed(String),
}
