//! Mock capture backend for exercising the session and controller without
//! hardware.
//!
//! Shared state is exposed through [`MockBackend::handle`] so tests can
//! inspect calls, script refusals, and fire pending completions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::capture_result::RawPhoto;
use crate::models::config::{PhotoOutputSettings, PhotoSettings, SessionPreset};
use crate::models::device::CameraDeviceInfo;
use crate::models::error::CaptureError;
use crate::models::orientation::{CaptureOrientation, DeviceOrientation};
use crate::traits::capture_backend::{CaptureBackend, PhotoCompletion, RecordingCompletion};

/// Observable state of the mock hardware.
pub struct MockState {
    pub devices: Vec<CameraDeviceInfo>,
    pub inputs: Vec<String>,
    pub photo_output: bool,
    pub video_output: bool,
    pub focused: Vec<String>,
    pub preset: Option<SessionPreset>,
    pub running: bool,
    pub recording: bool,
    pub orientation: DeviceOrientation,
    pub connection_orientation: Option<CaptureOrientation>,

    pub begin_count: u32,
    pub commit_count: u32,
    pub capture_calls: u32,
    pub stop_recording_calls: u32,

    /// Device ids the session will refuse to attach.
    pub refuse_input_ids: Vec<String>,
    pub refuse_photo_output: bool,
    pub refuse_video_output: bool,

    /// When set, `capture_photo` completes immediately with a clone of this
    /// response instead of parking the request.
    pub photo_response: Option<Result<RawPhoto, CaptureError>>,

    pub pending_photos: Vec<(PhotoSettings, PhotoCompletion)>,
    pub recording_path: Option<PathBuf>,
    pub pending_recording: Option<RecordingCompletion>,
}

impl MockState {
    fn new(devices: Vec<CameraDeviceInfo>) -> Self {
        Self {
            devices,
            inputs: Vec::new(),
            photo_output: false,
            video_output: false,
            focused: Vec::new(),
            preset: None,
            running: false,
            recording: false,
            orientation: DeviceOrientation::Portrait,
            connection_orientation: None,
            begin_count: 0,
            commit_count: 0,
            capture_calls: 0,
            stop_recording_calls: 0,
            refuse_input_ids: Vec::new(),
            refuse_photo_output: false,
            refuse_video_output: false,
            photo_response: None,
            pending_photos: Vec::new(),
            recording_path: None,
            pending_recording: None,
        }
    }

    /// The most recently parked photo request.
    pub fn pending_photo(&self) -> Option<&(PhotoSettings, PhotoCompletion)> {
        self.pending_photos.last()
    }

    /// Fail every parked photo request, as a torn-down pipeline would.
    pub fn fail_all_pending_photos(&mut self, reason: &str) {
        for (_, completion) in self.pending_photos.drain(..) {
            completion(Err(CaptureError::CaptureFailed(reason.into())));
        }
    }
}

/// Mock backend. Cloned handles observe and script the same state.
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn with_devices(devices: Vec<CameraDeviceInfo>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(devices))),
        }
    }

    pub fn handle(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }
}

impl CaptureBackend for MockBackend {
    fn video_devices(&self) -> Vec<CameraDeviceInfo> {
        self.state.lock().devices.clone()
    }

    fn begin_configuration(&mut self) {
        self.state.lock().begin_count += 1;
    }

    fn commit_configuration(&mut self) {
        self.state.lock().commit_count += 1;
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        self.state.lock().preset = Some(preset);
    }

    fn add_video_input(&mut self, device: &CameraDeviceInfo) -> bool {
        let mut state = self.state.lock();
        if state.refuse_input_ids.iter().any(|id| id == &device.id) {
            return false;
        }
        state.inputs.push(device.id.clone());
        true
    }

    fn remove_video_input(&mut self, device_id: &str) {
        self.state.lock().inputs.retain(|id| id != device_id);
    }

    fn apply_continuous_autofocus(&mut self, device_id: &str) {
        self.state.lock().focused.push(device_id.to_string());
    }

    fn add_photo_output(&mut self, _settings: &PhotoOutputSettings) -> bool {
        let mut state = self.state.lock();
        if state.refuse_photo_output {
            return false;
        }
        state.photo_output = true;
        true
    }

    fn add_video_output(&mut self) -> bool {
        let mut state = self.state.lock();
        if state.refuse_video_output {
            return false;
        }
        state.video_output = true;
        true
    }

    fn remove_all_io(&mut self) {
        let mut state = self.state.lock();
        state.inputs.clear();
        state.photo_output = false;
        state.video_output = false;
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn start_running(&mut self) {
        self.state.lock().running = true;
    }

    fn stop_running(&mut self) {
        self.state.lock().running = false;
    }

    fn device_orientation(&self) -> DeviceOrientation {
        self.state.lock().orientation
    }

    fn set_connection_orientation(&mut self, orientation: CaptureOrientation) {
        self.state.lock().connection_orientation = Some(orientation);
    }

    fn capture_photo(&mut self, settings: PhotoSettings, completion: PhotoCompletion) {
        let response = {
            let mut state = self.state.lock();
            state.capture_calls += 1;
            match state.photo_response.clone() {
                Some(response) => Some(response),
                None => {
                    state.pending_photos.push((settings, completion));
                    return;
                }
            }
        };
        if let Some(response) = response {
            completion(response);
        }
    }

    fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    fn start_recording(&mut self, path: &Path, completion: RecordingCompletion) {
        let mut state = self.state.lock();
        state.recording = true;
        state.recording_path = Some(path.to_path_buf());
        state.pending_recording = Some(completion);
    }

    fn stop_recording(&mut self) {
        let (completion, path) = {
            let mut state = self.state.lock();
            state.stop_recording_calls += 1;
            state.recording = false;
            (state.pending_recording.take(), state.recording_path.clone())
        };
        if let (Some(completion), Some(path)) = (completion, path) {
            completion(Ok(path));
        }
    }
}
