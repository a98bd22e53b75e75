//! Serialized front door to the capture session.
//!
//! Every session mutation and capture trigger runs on one dedicated worker
//! thread, giving a total order over hardware reconfiguration with no
//! concurrent access to the backend. Completion callbacks from the hardware
//! are bridged through geometry post-processing and handed to the delegate
//! via the main dispatcher.

use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;

use image::DynamicImage;
use parking_lot::Mutex;

use crate::models::capture_result::{CapturedImage, RawPhoto, RecordingResult};
use crate::models::config::SessionConfiguration;
use crate::models::device::CameraPosition;
use crate::models::error::CaptureError;
use crate::models::flash::FlashMode;
use crate::models::geometry::{PreviewViewport, Size};
use crate::models::orientation::ImageOrientation;
use crate::processing;
use crate::session::capture_session::CaptureSession;
use crate::traits::authorization::{AuthorizationProvider, AuthorizationStatus};
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_delegate::CaptureControllerDelegate;

/// Closure that marshals a callback onto the caller's interactive context.
///
/// UI embeddings hand in their event-loop executor; the default invokes the
/// callback inline on whichever thread completed the work.
pub type MainDispatcher = Arc<dyn Fn(Box<dyn FnOnce() + Send + 'static>) + Send + Sync + 'static>;

type SessionJob<B> = Box<dyn FnOnce(&mut CaptureSession<B>) + Send + 'static>;

/// Counters for debugging a capture screen's session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub photo_requests: u64,
    pub photos_delivered: u64,
    pub photos_dropped: u64,
    pub recording_requests: u64,
    pub recordings_finished: u64,
}

/// Owns the capture session and the serial worker that drives it.
///
/// Commands enqueue onto the worker and failures are logged rather than
/// surfaced; the caller observes them only as "no result produced". The
/// worker holds a weak session reference, so a disposed controller never
/// leaks pending work.
pub struct CaptureController<B: CaptureBackend> {
    session: Arc<Mutex<CaptureSession<B>>>,
    jobs: Option<mpsc::Sender<SessionJob<B>>>,
    worker: Option<thread::JoinHandle<()>>,
    delegate: Option<Arc<dyn CaptureControllerDelegate>>,
    authorization: Arc<dyn AuthorizationProvider>,
    dispatcher: MainDispatcher,
    preview: Arc<Mutex<Option<PreviewViewport>>>,
    diagnostics: Arc<Mutex<CaptureDiagnostics>>,
}

impl<B: CaptureBackend> CaptureController<B> {
    pub fn new(backend: B, authorization: Arc<dyn AuthorizationProvider>) -> Self {
        Self::with_configuration(backend, SessionConfiguration::default(), authorization)
    }

    pub fn with_configuration(
        backend: B,
        config: SessionConfiguration,
        authorization: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        let session = Arc::new(Mutex::new(CaptureSession::with_configuration(
            backend, config,
        )));
        let (jobs, queue) = mpsc::channel::<SessionJob<B>>();

        let weak: Weak<Mutex<CaptureSession<B>>> = Arc::downgrade(&session);
        let worker = thread::Builder::new()
            .name("capture-session".into())
            .spawn(move || {
                while let Ok(job) = queue.recv() {
                    let Some(session) = weak.upgrade() else {
                        break;
                    };
                    job(&mut session.lock());
                }
            })
            .expect("failed to spawn capture worker");

        Self {
            session,
            jobs: Some(jobs),
            worker: Some(worker),
            delegate: None,
            authorization,
            dispatcher: Arc::new(|callback| callback()),
            preview: Arc::new(Mutex::new(None)),
            diagnostics: Arc::new(Mutex::new(CaptureDiagnostics::default())),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureControllerDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn set_main_dispatcher(&mut self, dispatcher: MainDispatcher) {
        self.dispatcher = dispatcher;
    }

    /// Attach the preview's viewport mapping, enabling crop-to-viewport on
    /// delivered stills.
    pub fn set_preview_viewport(&self, viewport: PreviewViewport) {
        *self.preview.lock() = Some(viewport);
    }

    pub fn detach_preview(&self) {
        *self.preview.lock() = None;
    }

    /// Current flash mode, for icon display. Synchronized read; the worker
    /// holds the session lock only briefly per command.
    pub fn flash_mode(&self) -> FlashMode {
        self.session.lock().flash_mode()
    }

    /// Advance the flash mode and return the new value.
    pub fn toggle_flash_mode(&self) -> FlashMode {
        self.session.lock().cycle_flash_mode()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        *self.diagnostics.lock()
    }

    /// Configure the session, gated on camera permission.
    ///
    /// An undetermined status triggers an asynchronous permission request and
    /// setup proceeds only when granted; a denied status performs no setup,
    /// leaving later commands to fail at the session's running check.
    pub fn setup(&self) {
        match self.authorization.status() {
            AuthorizationStatus::Authorized => {
                self.execute("capture session setup", |session| session.setup());
            }
            AuthorizationStatus::NotDetermined => {
                let Some(jobs) = self.jobs.clone() else {
                    return;
                };
                self.authorization.request_access(Box::new(move |granted| {
                    if !granted {
                        log::warn!("camera access request declined");
                        return;
                    }
                    let _ = jobs.send(Box::new(|session| {
                        if let Err(err) = session.setup() {
                            log::error!("capture session setup failed: {err}");
                        }
                    }));
                }));
            }
            AuthorizationStatus::Denied => {
                log::warn!("camera access denied, capture session not set up");
            }
        }
    }

    /// Switch between the front and back camera.
    pub fn toggle_camera_position(&self) {
        self.execute("camera position toggle", |session| {
            let position = session
                .active_position()
                .map(CameraPosition::opposite)
                .unwrap_or(CameraPosition::Back);
            session.toggle_camera_position(position)
        });
    }

    /// Trigger an asynchronous photo capture; the result arrives at the
    /// delegate after orientation mapping, downsampling, and viewport crop.
    pub fn capture_image(&self) {
        self.diagnostics.lock().photo_requests += 1;

        let delegate = self.delegate.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let preview = Arc::clone(&self.preview);
        let diagnostics = Arc::clone(&self.diagnostics);
        self.execute("photo capture", move |session| {
            session.capture_image(Box::new(move |result| {
                deliver_photo(result, delegate, dispatcher, preview, diagnostics);
            }))
        });
    }

    /// Begin recording a clip; the finished file arrives at the delegate.
    pub fn start_recording(&self) {
        self.diagnostics.lock().recording_requests += 1;

        let delegate = self.delegate.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let diagnostics = Arc::clone(&self.diagnostics);
        self.execute("start recording", move |session| {
            session.start_recording(Box::new(move |result| match result {
                Ok(path) => {
                    diagnostics.lock().recordings_finished += 1;
                    if let Some(delegate) = delegate {
                        let result = RecordingResult::new(path);
                        dispatcher(Box::new(move || delegate.on_video_recorded(result)));
                    }
                }
                Err(err) => log::error!("video recording failed: {err}"),
            }))
        });
    }

    pub fn stop_recording(&self) {
        self.execute("stop recording", |session| {
            session.stop_recording();
            Ok(())
        });
    }

    /// Downsample an arbitrary image off the interactive context, delivering
    /// the result through the main dispatcher. Falls back to the original
    /// image when the bound is degenerate.
    pub fn downsample<F>(&self, image: DynamicImage, target: Size, scale: f32, completion: F)
    where
        F: FnOnce(DynamicImage) + Send + 'static,
    {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        let _ = jobs.send(Box::new(move |_session| {
            let image = match processing::downsample(&image, target, scale) {
                Some(scaled) => scaled,
                None => image,
            };
            dispatcher(Box::new(move || completion(image)));
        }));
    }

    /// The capture screen became visible: start streaming.
    pub fn handle_visible(&self) {
        self.execute("run loop start", |session| {
            session.start_running();
            Ok(())
        });
    }

    /// The capture screen was hidden: finish any recording, then stop
    /// streaming.
    pub fn handle_hidden(&self) {
        self.execute("stop recording", |session| {
            session.stop_recording();
            Ok(())
        });
        self.execute("run loop stop", |session| {
            session.stop_running();
            Ok(())
        });
    }

    /// Tear down deterministically: detach the preview, release the hardware,
    /// and join the worker. Further commands are dropped. Idempotent.
    pub fn dispose(&mut self) {
        self.detach_preview();
        if let Some(jobs) = self.jobs.take() {
            let _ = jobs.send(Box::new(|session| session.dispose()));
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn execute<F>(&self, description: &'static str, job: F)
    where
        F: FnOnce(&mut CaptureSession<B>) -> Result<(), CaptureError> + Send + 'static,
    {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        let _ = jobs.send(Box::new(move |session| {
            if let Err(err) = job(session) {
                log::error!("{description} failed: {err}");
            }
        }));
    }
}

impl<B: CaptureBackend> Drop for CaptureController<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Post-process and deliver one finished photo request.
fn deliver_photo(
    result: Result<RawPhoto, CaptureError>,
    delegate: Option<Arc<dyn CaptureControllerDelegate>>,
    dispatcher: MainDispatcher,
    preview: Arc<Mutex<Option<PreviewViewport>>>,
    diagnostics: Arc<Mutex<CaptureDiagnostics>>,
) {
    let photo = match result {
        Ok(photo) => photo,
        Err(err) => {
            log::error!("photo capture failed: {err}");
            diagnostics.lock().photos_dropped += 1;
            return;
        }
    };

    let Some(orientation) = ImageOrientation::from_raw(photo.orientation_raw) else {
        log::error!(
            "unrecognized image orientation tag {}, dropping capture",
            photo.orientation_raw
        );
        diagnostics.lock().photos_dropped += 1;
        return;
    };

    let image = match processing::downsample(&photo.image, processing::CAPTURE_WORKING_BOUND, 1.0) {
        Some(bounded) => bounded,
        None => photo.image,
    };

    let viewport = *preview.lock();
    let image = match viewport {
        Some(viewport) => processing::crop_to_preview_viewport(&image, orientation, &viewport),
        None => image,
    };

    diagnostics.lock().photos_delivered += 1;
    if let Some(delegate) = delegate {
        let captured = CapturedImage { image, orientation };
        dispatcher(Box::new(move || delegate.on_image_captured(captured)));
    }
}
