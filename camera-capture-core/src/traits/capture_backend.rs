use std::path::{Path, PathBuf};

use crate::models::capture_result::RawPhoto;
use crate::models::config::{PhotoOutputSettings, PhotoSettings, SessionPreset};
use crate::models::device::CameraDeviceInfo;
use crate::models::error::CaptureError;
use crate::models::orientation::{CaptureOrientation, DeviceOrientation};

/// Once-callback for a finished photo request.
pub type PhotoCompletion = Box<dyn FnOnce(Result<RawPhoto, CaptureError>) + Send + 'static>;

/// Once-callback for a finished clip recording.
pub type RecordingCompletion = Box<dyn FnOnce(Result<PathBuf, CaptureError>) + Send + 'static>;

/// Interface to the platform capture hardware.
///
/// The session is the only caller and serializes all access, so
/// implementations may assume one configuration or trigger call at a time.
/// Completion callbacks fire on backend-owned threads and are not ordered
/// relative to each other.
pub trait CaptureBackend: Send + 'static {
    /// Devices currently visible to the discovery layer.
    fn video_devices(&self) -> Vec<CameraDeviceInfo>;

    /// Open a configuration transaction. Topology changes are batched until
    /// `commit_configuration`.
    fn begin_configuration(&mut self);

    /// Apply every change made since `begin_configuration`.
    fn commit_configuration(&mut self);

    fn set_preset(&mut self, preset: SessionPreset);

    /// Attach a video input for `device`. Returns false when the hardware
    /// refuses the input.
    fn add_video_input(&mut self, device: &CameraDeviceInfo) -> bool;

    fn remove_video_input(&mut self, device_id: &str);

    /// Enable continuous autofocus on the given device.
    fn apply_continuous_autofocus(&mut self, device_id: &str);

    /// Attach the still-photo output. Returns false when refused.
    fn add_photo_output(&mut self, settings: &PhotoOutputSettings) -> bool;

    /// Attach the movie-file output. Returns false when refused.
    fn add_video_output(&mut self) -> bool;

    /// Detach every input and output, releasing the hardware.
    fn remove_all_io(&mut self);

    /// Whether the hardware run loop is actively streaming frames.
    fn is_running(&self) -> bool;

    fn start_running(&mut self);

    fn stop_running(&mut self);

    /// Physical device attitude at this instant.
    fn device_orientation(&self) -> DeviceOrientation;

    /// Orientation hint applied to the photo output connection.
    fn set_connection_orientation(&mut self, orientation: CaptureOrientation);

    /// Issue an asynchronous photo capture. `completion` fires exactly once
    /// with the decoded frame or the failure.
    fn capture_photo(&mut self, settings: PhotoSettings, completion: PhotoCompletion);

    fn is_recording(&self) -> bool;

    /// Begin writing a clip to `path`; `completion` fires when the recording
    /// finishes or fails.
    fn start_recording(&mut self, path: &Path, completion: RecordingCompletion);

    /// Finish the in-flight recording, if any.
    fn stop_recording(&mut self);
}
