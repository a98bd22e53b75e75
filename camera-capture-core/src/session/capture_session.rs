//! The capture-session state machine.
//!
//! Owns the active video input, the still-photo output, and the movie-file
//! output of one hardware backend. All topology changes happen inside a
//! [`ConfigurationScope`] bracket so the hardware is never left
//! mid-transaction, even on early-return error paths.

use uuid::Uuid;

use crate::device;
use crate::models::config::{PhotoSettings, SessionConfiguration};
use crate::models::device::{CameraDeviceInfo, CameraPosition};
use crate::models::error::CaptureError;
use crate::models::flash::FlashMode;
use crate::traits::capture_backend::{CaptureBackend, PhotoCompletion, RecordingCompletion};

/// RAII bracket around a backend configuration transaction.
///
/// Commits on drop, so every exit path (including `?` early returns) leaves
/// the hardware with a fully applied, consistent configuration.
pub struct ConfigurationScope<'a, B: CaptureBackend> {
    backend: &'a mut B,
}

impl<'a, B: CaptureBackend> ConfigurationScope<'a, B> {
    fn begin(backend: &'a mut B) -> Self {
        backend.begin_configuration();
        Self { backend }
    }

    pub fn set_preset(&mut self, preset: crate::models::config::SessionPreset) {
        self.backend.set_preset(preset);
    }

    pub fn add_video_input(&mut self, device: &CameraDeviceInfo) -> bool {
        self.backend.add_video_input(device)
    }

    pub fn remove_video_input(&mut self, device_id: &str) {
        self.backend.remove_video_input(device_id);
    }

    pub fn apply_continuous_autofocus(&mut self, device_id: &str) {
        self.backend.apply_continuous_autofocus(device_id);
    }

    pub fn add_photo_output(&mut self, settings: &crate::models::config::PhotoOutputSettings) -> bool {
        self.backend.add_photo_output(settings)
    }

    pub fn add_video_output(&mut self) -> bool {
        self.backend.add_video_output()
    }
}

impl<B: CaptureBackend> Drop for ConfigurationScope<'_, B> {
    fn drop(&mut self) {
        self.backend.commit_configuration();
    }
}

/// Coordinates one video input and the photo/movie outputs of a capture
/// backend.
///
/// Created once per capture screen and torn down with [`dispose`] when the
/// screen goes away. Not internally synchronized; the
/// [`CaptureController`](crate::controller::capture_controller::CaptureController)
/// serializes all access on its worker.
pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    config: SessionConfiguration,
    flash_mode: FlashMode,
    video_input: Option<CameraDeviceInfo>,
    photo_output_attached: bool,
    video_output_attached: bool,
}

impl<B: CaptureBackend> CaptureSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_configuration(backend, SessionConfiguration::default())
    }

    pub fn with_configuration(backend: B, config: SessionConfiguration) -> Self {
        Self {
            backend,
            config,
            flash_mode: FlashMode::Off,
            video_input: None,
            photo_output_attached: false,
            video_output_attached: false,
        }
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.flash_mode
    }

    /// Advance the flash mode. Pure state transition; the hardware only sees
    /// it in the settings of the next capture.
    pub fn cycle_flash_mode(&mut self) -> FlashMode {
        self.flash_mode = self.flash_mode.next();
        self.flash_mode
    }

    /// Position of the active video input, if one is attached.
    pub fn active_position(&self) -> Option<CameraPosition> {
        self.video_input.as_ref().map(|input| input.position)
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    pub fn start_running(&mut self) {
        self.backend.start_running();
    }

    pub fn stop_running(&mut self) {
        self.backend.stop_running();
    }

    /// Open a configuration transaction on the backend. Topology changes
    /// batched on the returned scope apply when it drops.
    pub fn begin_configuration(&mut self) -> ConfigurationScope<'_, B> {
        ConfigurationScope::begin(&mut self.backend)
    }

    /// Wire up the session: photo preset, a video input (back position first,
    /// then front), and the still-photo output.
    ///
    /// On failure the open configuration scope still commits, leaving the
    /// hardware consistent if degraded, and the specific error propagates.
    pub fn setup(&mut self) -> Result<(), CaptureError> {
        self.config
            .validate()
            .map_err(CaptureError::ConfigurationInvalid)?;

        let devices = self.backend.video_devices();
        let mut scope = ConfigurationScope::begin(&mut self.backend);
        scope.set_preset(self.config.preset);

        let device = device::resolve(CameraPosition::Back, &devices)
            .or_else(|_| device::resolve(CameraPosition::Front, &devices))?;

        if !scope.add_video_input(&device) {
            return Err(CaptureError::VideoInputMissing);
        }
        if device.supports_continuous_autofocus {
            scope.apply_continuous_autofocus(&device.id);
        }
        self.video_input = Some(device);

        if !scope.add_photo_output(&self.config.photo) {
            return Err(CaptureError::PhotoOutputMissing);
        }
        drop(scope);

        self.photo_output_attached = true;
        Ok(())
    }

    /// Switch the active input to a device at `position`.
    ///
    /// A request for the current position is a no-op with no transaction
    /// opened. Otherwise the old input is removed and the new one attached;
    /// when the hardware refuses the new input the original is restored, so
    /// the session never ends up with zero inputs.
    pub fn toggle_camera_position(&mut self, position: CameraPosition) -> Result<(), CaptureError> {
        let current = self
            .video_input
            .clone()
            .ok_or(CaptureError::VideoInputMissing)?;
        if current.position == position {
            return Ok(());
        }

        let devices = self.backend.video_devices();
        let new_device = device::resolve(position, &devices)?;

        let mut scope = ConfigurationScope::begin(&mut self.backend);
        scope.remove_video_input(&current.id);
        if scope.add_video_input(&new_device) {
            if new_device.supports_continuous_autofocus {
                scope.apply_continuous_autofocus(&new_device.id);
            }
            self.video_input = Some(new_device);
        } else {
            if !scope.add_video_input(&current) {
                log::warn!("failed to restore previous video input {}", current.id);
            }
            self.video_input = Some(current);
        }
        Ok(())
    }

    /// Issue an asynchronous photo capture carrying the current flash mode.
    ///
    /// The device's physical orientation is read at trigger time and applied
    /// to the output connection; face-up/face-down attitudes leave the
    /// connection unchanged.
    pub fn capture_image(&mut self, completion: PhotoCompletion) -> Result<(), CaptureError> {
        if !self.backend.is_running() {
            return Err(CaptureError::SessionIsNotRunning);
        }
        if !self.photo_output_attached {
            return Err(CaptureError::PhotoOutputMissing);
        }

        let orientation = self.backend.device_orientation().capture_orientation();
        if let Some(orientation) = orientation {
            self.backend.set_connection_orientation(orientation);
        }

        let settings = PhotoSettings {
            flash_mode: self.flash_mode,
            orientation,
        };
        self.backend.capture_photo(settings, completion);
        log::debug!("photo capture issued");
        Ok(())
    }

    /// Begin recording a clip to a freshly generated temporary file path.
    ///
    /// The movie-file output is attached lazily on first use. `completion`
    /// fires asynchronously with the finished file path.
    pub fn start_recording(&mut self, completion: RecordingCompletion) -> Result<(), CaptureError> {
        if !self.backend.is_running() {
            return Err(CaptureError::SessionIsNotRunning);
        }
        if self.backend.is_recording() {
            return Err(CaptureError::VideoIsAlreadyRecording);
        }

        if !self.video_output_attached {
            let mut scope = ConfigurationScope::begin(&mut self.backend);
            if !scope.add_video_output() {
                return Err(CaptureError::VideoOutputMissing);
            }
            drop(scope);
            self.video_output_attached = true;
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), self.config.recording_extension);
        let path = self.config.recording_directory.join(file_name);
        self.backend.start_recording(&path, completion);
        Ok(())
    }

    /// Finish the in-flight recording. No-op when nothing is recording.
    pub fn stop_recording(&mut self) {
        if self.backend.is_recording() {
            self.backend.stop_recording();
        }
    }

    /// Tear the session down: stop any recording, stop the run loop, and
    /// remove every input and output so the hardware is released
    /// deterministically.
    pub fn dispose(&mut self) {
        self.stop_recording();
        self.backend.stop_running();
        self.backend.remove_all_io();
        self.video_input = None;
        self.photo_output_attached = false;
        self.video_output_attached = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::mock::MockBackend;
    use crate::models::config::SessionPreset;
    use crate::models::device::DeviceKind;
    use crate::models::error::MediaType;
    use crate::models::orientation::{CaptureOrientation, DeviceOrientation};

    use super::*;

    fn device(id: &str, position: CameraPosition, kind: DeviceKind) -> CameraDeviceInfo {
        CameraDeviceInfo {
            id: id.into(),
            name: id.into(),
            position,
            kind,
            supports_continuous_autofocus: true,
        }
    }

    fn two_camera_backend() -> MockBackend {
        MockBackend::with_devices(vec![
            device("back-depth", CameraPosition::Back, DeviceKind::TrueDepth),
            device("front-dual", CameraPosition::Front, DeviceKind::DualCamera),
        ])
    }

    #[test]
    fn setup_attaches_back_input_and_photo_output() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);

        session.setup().expect("setup");

        let state = state.lock();
        assert_eq!(state.preset, Some(SessionPreset::Photo));
        assert_eq!(state.inputs, vec!["back-depth".to_string()]);
        assert!(state.photo_output);
        assert_eq!(state.focused, vec!["back-depth".to_string()]);
        assert_eq!(state.begin_count, 1);
        assert_eq!(state.commit_count, 1);
        drop(state);
        assert_eq!(session.active_position(), Some(CameraPosition::Back));
    }

    #[test]
    fn setup_falls_back_to_front_when_back_missing() {
        let backend = MockBackend::with_devices(vec![device(
            "front-dual",
            CameraPosition::Front,
            DeviceKind::DualCamera,
        )]);
        let mut session = CaptureSession::new(backend);

        session.setup().expect("setup");
        assert_eq!(session.active_position(), Some(CameraPosition::Front));
    }

    #[test]
    fn setup_without_devices_fails_but_commits() {
        let backend = MockBackend::with_devices(Vec::new());
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);

        let err = session.setup().unwrap_err();
        assert_eq!(err, CaptureError::DeviceMissing(MediaType::Video));
        assert_eq!(state.lock().commit_count, 1);
    }

    #[test]
    fn setup_with_refused_input_fails_but_commits() {
        let backend = two_camera_backend();
        let state = backend.handle();
        state.lock().refuse_input_ids.push("back-depth".into());
        let mut session = CaptureSession::new(backend);

        let err = session.setup().unwrap_err();
        assert_eq!(err, CaptureError::VideoInputMissing);
        let state = state.lock();
        assert!(state.inputs.is_empty());
        assert_eq!(state.commit_count, 1);
    }

    #[test]
    fn setup_with_refused_photo_output_keeps_input() {
        let backend = two_camera_backend();
        let state = backend.handle();
        state.lock().refuse_photo_output = true;
        let mut session = CaptureSession::new(backend);

        let err = session.setup().unwrap_err();
        assert_eq!(err, CaptureError::PhotoOutputMissing);
        let state = state.lock();
        assert_eq!(state.inputs, vec!["back-depth".to_string()]);
        assert_eq!(state.commit_count, 1);
    }

    #[test]
    fn toggle_to_current_position_opens_no_transaction() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        let transactions_after_setup = state.lock().begin_count;

        session
            .toggle_camera_position(CameraPosition::Back)
            .expect("toggle");

        assert_eq!(state.lock().begin_count, transactions_after_setup);
        assert_eq!(session.active_position(), Some(CameraPosition::Back));
    }

    #[test]
    fn toggle_switches_active_input() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");

        session
            .toggle_camera_position(CameraPosition::Front)
            .expect("toggle");

        assert_eq!(state.lock().inputs, vec!["front-dual".to_string()]);
        assert_eq!(session.active_position(), Some(CameraPosition::Front));
    }

    #[test]
    fn refused_toggle_restores_original_input() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        state.lock().refuse_input_ids.push("front-dual".into());

        session
            .toggle_camera_position(CameraPosition::Front)
            .expect("toggle");

        // Never zero inputs: the original is back in place.
        assert_eq!(state.lock().inputs, vec!["back-depth".to_string()]);
        assert_eq!(session.active_position(), Some(CameraPosition::Back));
    }

    #[test]
    fn toggle_to_missing_position_fails_without_touching_input() {
        let backend = MockBackend::with_devices(vec![device(
            "back-depth",
            CameraPosition::Back,
            DeviceKind::TrueDepth,
        )]);
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        let transactions_after_setup = state.lock().begin_count;

        let err = session
            .toggle_camera_position(CameraPosition::Front)
            .unwrap_err();

        assert_eq!(err, CaptureError::DeviceMissing(MediaType::Video));
        assert_eq!(state.lock().begin_count, transactions_after_setup);
        assert_eq!(state.lock().inputs, vec!["back-depth".to_string()]);
    }

    #[test]
    fn capture_while_stopped_fails_without_hardware_call() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");

        let err = session
            .capture_image(Box::new(|_| {}))
            .unwrap_err();

        assert_eq!(err, CaptureError::SessionIsNotRunning);
        assert_eq!(state.lock().capture_calls, 0);
    }

    #[test]
    fn capture_applies_orientation_and_flash_settings() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();
        state.lock().orientation = DeviceOrientation::LandscapeLeft;
        session.cycle_flash_mode(); // Off -> On

        session.capture_image(Box::new(|_| {})).expect("capture");

        let state = state.lock();
        assert_eq!(state.capture_calls, 1);
        // Landscape left swaps to landscape right on the connection.
        assert_eq!(
            state.connection_orientation,
            Some(CaptureOrientation::LandscapeRight)
        );
        let (settings, _) = state.pending_photo().expect("pending request");
        assert_eq!(settings.flash_mode, FlashMode::On);
        assert_eq!(settings.orientation, Some(CaptureOrientation::LandscapeRight));
    }

    #[test]
    fn face_up_capture_leaves_connection_unset() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();
        state.lock().orientation = DeviceOrientation::FaceUp;

        session.capture_image(Box::new(|_| {})).expect("capture");

        let state = state.lock();
        assert_eq!(state.connection_orientation, None);
        let (settings, _) = state.pending_photo().expect("pending request");
        assert_eq!(settings.orientation, None);
    }

    #[test]
    fn concurrent_captures_each_get_a_pending_request() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let fired = Arc::clone(&fired);
            session
                .capture_image(Box::new(move |_| {
                    fired.fetch_add(1, Ordering::SeqCst);
                }))
                .expect("capture");
        }

        assert_eq!(state.lock().capture_calls, 2);
        state.lock().fail_all_pending_photos("torn down");
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn recording_guards_and_path_generation() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");

        let err = session.start_recording(Box::new(|_| {})).unwrap_err();
        assert_eq!(err, CaptureError::SessionIsNotRunning);

        session.start_running();
        session.start_recording(Box::new(|_| {})).expect("start");

        let path = state.lock().recording_path.clone().expect("path");
        assert_eq!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("mjpeg")
        );
        assert!(path.starts_with(std::env::temp_dir()));

        let err = session.start_recording(Box::new(|_| {})).unwrap_err();
        assert_eq!(err, CaptureError::VideoIsAlreadyRecording);
    }

    #[test]
    fn distinct_recordings_use_distinct_paths() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();

        session.start_recording(Box::new(|_| {})).expect("start");
        let first = state.lock().recording_path.clone().expect("path");
        session.stop_recording();

        session.start_recording(Box::new(|_| {})).expect("start");
        let second = state.lock().recording_path.clone().expect("path");

        assert_ne!(first, second);
    }

    #[test]
    fn stop_recording_when_idle_is_a_no_op() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();

        session.stop_recording();

        assert_eq!(state.lock().stop_recording_calls, 0);
    }

    #[test]
    fn refused_video_output_fails_recording() {
        let backend = two_camera_backend();
        let state = backend.handle();
        state.lock().refuse_video_output = true;
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();

        let err = session.start_recording(Box::new(|_| {})).unwrap_err();
        assert_eq!(err, CaptureError::VideoOutputMissing);
        assert!(state.lock().recording_path.is_none());
    }

    #[test]
    fn dispose_releases_all_hardware() {
        let backend = two_camera_backend();
        let state = backend.handle();
        let mut session = CaptureSession::new(backend);
        session.setup().expect("setup");
        session.start_running();
        session.start_recording(Box::new(|_| {})).expect("start");

        session.dispose();

        let state = state.lock();
        assert!(!state.running);
        assert!(!state.recording);
        assert!(state.inputs.is_empty());
        assert!(!state.photo_output);
        assert!(!state.video_output);
        drop(state);
        assert_eq!(session.active_position(), None);
    }
}
