//! V4L2 capture backend.
//!
//! Owns one streaming device at a time. `start_running` spawns a dedicated
//! frame-loop thread over an mmap stream; photo requests and clip recording
//! are serviced from that loop. Prefers the camera's MJPG format (frames can
//! be recorded verbatim) and falls back to YUYV with BT.601 conversion.
//!
//! Recorded clips are a raw MJPEG elementary stream: one JPEG per frame,
//! appended to the target file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbImage};
use parking_lot::Mutex;
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::framesize::FrameSizeEnum;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use camera_capture_core::models::capture_result::RawPhoto;
use camera_capture_core::models::config::{PhotoOutputSettings, PhotoSettings, SessionPreset};
use camera_capture_core::models::device::CameraDeviceInfo;
use camera_capture_core::models::error::CaptureError;
use camera_capture_core::models::flash::FlashMode;
use camera_capture_core::models::orientation::{CaptureOrientation, DeviceOrientation};
use camera_capture_core::traits::capture_backend::{
    CaptureBackend, PhotoCompletion, RecordingCompletion,
};

use crate::device_enumerator::{DeviceEnumerator, V4L2_CID_FOCUS_AUTO};

const JPEG_RECORD_QUALITY: u8 = 85;

/// A photo request parked until the next frame arrives.
struct PhotoRequest {
    orientation_tag: u32,
    completion: PhotoCompletion,
}

/// An in-flight clip recording.
struct RecordingJob {
    path: PathBuf,
    writer: BufWriter<File>,
    completion: Option<RecordingCompletion>,
    frames: u64,
}

#[derive(Default)]
struct Mailbox {
    pending_photos: Vec<PhotoRequest>,
    recording: Option<RecordingJob>,
    finish_recording: bool,
}

/// State shared between the backend and its frame-loop thread.
struct LoopShared {
    running: AtomicBool,
    mailbox: Mutex<Mailbox>,
}

impl LoopShared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            mailbox: Mutex::new(Mailbox::default()),
        }
    }

    /// Drain the mailbox when the loop exits or cannot start.
    ///
    /// Pending photos fail; an in-flight recording is finalized as-is when
    /// `orderly`, otherwise failed with `reason`.
    fn drain(&self, orderly: bool, reason: &str) {
        let (photos, job) = {
            let mut mailbox = self.mailbox.lock();
            mailbox.finish_recording = false;
            (
                std::mem::take(&mut mailbox.pending_photos),
                mailbox.recording.take(),
            )
        };

        for request in photos {
            (request.completion)(Err(CaptureError::CaptureFailed(reason.into())));
        }
        if let Some(job) = job {
            let outcome = if orderly { Ok(()) } else { Err(reason.to_string()) };
            finalize_job(job, outcome);
        }
    }
}

/// `CaptureBackend` over `/dev/video*`.
pub struct V4lBackend {
    active_input: Option<CameraDeviceInfo>,
    photo_output: Option<PhotoOutputSettings>,
    video_output: bool,
    preset: SessionPreset,
    configuring: bool,
    topology_dirty: bool,
    connection_orientation: CaptureOrientation,
    shared: Arc<LoopShared>,
    frame_loop: Option<thread::JoinHandle<()>>,
}

impl V4lBackend {
    pub fn new() -> Self {
        Self {
            active_input: None,
            photo_output: None,
            video_output: false,
            preset: SessionPreset::Photo,
            configuring: false,
            topology_dirty: false,
            connection_orientation: CaptureOrientation::LandscapeRight,
            shared: Arc::new(LoopShared::new()),
            frame_loop: None,
        }
    }

    fn start_loop(&mut self) {
        let Some(input) = self.active_input.clone() else {
            log::warn!("run loop requested without a video input");
            return;
        };
        if self.shared.running.load(Ordering::SeqCst) {
            return;
        }

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let preset = self.preset;

        let handle = thread::Builder::new()
            .name("camera-frame-loop".into())
            .spawn(move || {
                run_frame_loop(&shared, &input.id, preset);
                shared.running.store(false, Ordering::SeqCst);
            })
            .expect("failed to spawn frame-loop thread");

        self.frame_loop = Some(handle);
    }

    fn stop_loop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.frame_loop.take() {
            let _ = handle.join();
        }
    }
}

impl Default for V4lBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for V4lBackend {
    fn video_devices(&self) -> Vec<CameraDeviceInfo> {
        DeviceEnumerator::list_video_devices()
    }

    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn commit_configuration(&mut self) {
        self.configuring = false;
        if self.topology_dirty {
            self.topology_dirty = false;
            if self.shared.running.load(Ordering::SeqCst) {
                // Topology changed under a live stream: restart on the new
                // input/preset.
                self.stop_loop();
                self.start_loop();
            }
        }
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        if self.preset != preset {
            self.preset = preset;
            self.topology_dirty = true;
        }
    }

    fn add_video_input(&mut self, device: &CameraDeviceInfo) -> bool {
        // Exactly one video input at a time.
        if self.active_input.is_some() {
            return false;
        }
        self.active_input = Some(device.clone());
        self.topology_dirty = true;
        true
    }

    fn remove_video_input(&mut self, device_id: &str) {
        if self
            .active_input
            .as_ref()
            .is_some_and(|input| input.id == device_id)
        {
            self.active_input = None;
            self.topology_dirty = true;
        }
    }

    fn apply_continuous_autofocus(&mut self, device_id: &str) {
        let result = Device::with_path(device_id).and_then(|device| {
            device.set_control(Control {
                id: V4L2_CID_FOCUS_AUTO,
                value: Value::Boolean(true),
            })
        });
        if let Err(err) = result {
            log::warn!("continuous autofocus not applied on {device_id}: {err}");
        }
    }

    fn add_photo_output(&mut self, settings: &PhotoOutputSettings) -> bool {
        // Stills are decoded in software from the live stream; the output
        // never refuses as long as an input can stream.
        self.photo_output = Some(settings.clone());
        true
    }

    fn add_video_output(&mut self) -> bool {
        self.video_output = true;
        true
    }

    fn remove_all_io(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            self.stop_loop();
        }
        self.active_input = None;
        self.photo_output = None;
        self.video_output = false;
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn start_running(&mut self) {
        self.start_loop();
    }

    fn stop_running(&mut self) {
        self.stop_loop();
    }

    fn device_orientation(&self) -> DeviceOrientation {
        // Fixed-mount sensors deliver upright landscape frames; reported as
        // landscape-left so the mirrored mapping lands on landscape-right.
        DeviceOrientation::LandscapeLeft
    }

    fn set_connection_orientation(&mut self, orientation: CaptureOrientation) {
        self.connection_orientation = orientation;
    }

    fn capture_photo(&mut self, settings: PhotoSettings, completion: PhotoCompletion) {
        if !self.shared.running.load(Ordering::SeqCst) {
            completion(Err(CaptureError::CaptureFailed("run loop inactive".into())));
            return;
        }
        if self.photo_output.is_none() {
            completion(Err(CaptureError::CaptureFailed(
                "no photo output attached".into(),
            )));
            return;
        }
        if settings.flash_mode != FlashMode::Off {
            log::debug!("flash {:?} requested but no flash hardware is driven", settings.flash_mode);
        }

        self.shared.mailbox.lock().pending_photos.push(PhotoRequest {
            orientation_tag: exif_tag(self.connection_orientation),
            completion,
        });
    }

    fn is_recording(&self) -> bool {
        self.shared.mailbox.lock().recording.is_some()
    }

    fn start_recording(&mut self, path: &Path, completion: RecordingCompletion) {
        if !self.video_output {
            completion(Err(CaptureError::RecordingFailed(
                "no video output attached".into(),
            )));
            return;
        }
        let file = match File::create(path) {
            Ok(file) => file,
            Err(err) => {
                completion(Err(CaptureError::RecordingFailed(format!(
                    "create {}: {err}",
                    path.display()
                ))));
                return;
            }
        };

        self.shared.mailbox.lock().recording = Some(RecordingJob {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            completion: Some(completion),
            frames: 0,
        });
    }

    fn stop_recording(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            // The loop finalizes on the next frame boundary.
            self.shared.mailbox.lock().finish_recording = true;
        } else if let Some(job) = self.shared.mailbox.lock().recording.take() {
            finalize_job(job, Ok(()));
        }
    }
}

impl Drop for V4lBackend {
    fn drop(&mut self) {
        self.stop_loop();
        self.shared.drain(true, "backend dropped");
    }
}

/// Negotiated stream parameters.
struct StreamPlan {
    mjpeg: bool,
    width: u32,
    height: u32,
}

fn run_frame_loop(shared: &LoopShared, device_path: &str, preset: SessionPreset) {
    let (device, plan) = match open_stream_device(device_path, preset) {
        Ok(pair) => pair,
        Err(err) => {
            log::error!("frame loop failed to open {device_path}: {err}");
            shared.drain(false, &err);
            return;
        }
    };

    let mut stream = match Stream::with_buffers(&device, Type::VideoCapture, 4) {
        Ok(stream) => stream,
        Err(err) => {
            log::error!("frame loop failed to stream {device_path}: {err}");
            shared.drain(false, &format!("stream setup failed: {err}"));
            return;
        }
    };

    log::debug!(
        "frame loop on {device_path}: {}x{} {}",
        plan.width,
        plan.height,
        if plan.mjpeg { "MJPG" } else { "YUYV" }
    );

    while shared.running.load(Ordering::SeqCst) {
        let (data, _meta) = match stream.next() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("frame capture error on {device_path}: {err}");
                shared.drain(false, &format!("frame capture error: {err}"));
                return;
            }
        };
        service_frame(shared, data, &plan);
    }

    shared.drain(true, "run loop stopped");
}

/// Serve parked photo requests and the recording from one frame.
fn service_frame(shared: &LoopShared, data: &[u8], plan: &StreamPlan) {
    let mut finished: Option<(RecordingJob, Result<(), String>)> = None;
    let requests: Vec<PhotoRequest>;
    {
        let mut mailbox = shared.mailbox.lock();
        requests = std::mem::take(&mut mailbox.pending_photos);
        let finish_requested = std::mem::take(&mut mailbox.finish_recording);

        let mut write_error = None;
        if let Some(job) = mailbox.recording.as_mut() {
            if let Err(err) = append_recorded_frame(job, data, plan) {
                write_error = Some(err);
            }
        }

        if let Some(err) = write_error {
            finished = mailbox.recording.take().map(|job| (job, Err(err)));
        } else if finish_requested {
            finished = mailbox.recording.take().map(|job| (job, Ok(())));
        }
    }

    if let Some((job, outcome)) = finished {
        finalize_job(job, outcome);
    }

    for request in requests {
        let result = decode_frame(data, plan).map(|image| RawPhoto {
            image,
            orientation_raw: request.orientation_tag,
        });
        (request.completion)(result);
    }
}

fn decode_frame(data: &[u8], plan: &StreamPlan) -> Result<DynamicImage, CaptureError> {
    if plan.mjpeg {
        image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
            .map_err(|err| CaptureError::CaptureFailed(format!("jpeg decode failed: {err}")))
    } else {
        yuyv_to_rgb_image(data, plan.width, plan.height)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| CaptureError::CaptureFailed("short YUYV frame".into()))
    }
}

fn append_recorded_frame(
    job: &mut RecordingJob,
    data: &[u8],
    plan: &StreamPlan,
) -> Result<(), String> {
    if plan.mjpeg {
        job.writer
            .write_all(data)
            .map_err(|err| format!("write failed: {err}"))?;
    } else {
        let frame = yuyv_to_rgb_image(data, plan.width, plan.height)
            .ok_or_else(|| "short YUYV frame".to_string())?;
        let mut encoder = JpegEncoder::new_with_quality(&mut job.writer, JPEG_RECORD_QUALITY);
        encoder
            .encode(frame.as_raw(), plan.width, plan.height, ExtendedColorType::Rgb8)
            .map_err(|err| format!("jpeg encode failed: {err}"))?;
    }
    job.frames += 1;
    Ok(())
}

fn finalize_job(mut job: RecordingJob, outcome: Result<(), String>) {
    let flushed = job.writer.flush();
    let Some(completion) = job.completion.take() else {
        return;
    };

    match (outcome, flushed) {
        (Ok(()), Ok(())) => {
            log::debug!("recorded {} frames to {}", job.frames, job.path.display());
            completion(Ok(job.path));
        }
        (Err(reason), _) => completion(Err(CaptureError::RecordingFailed(reason))),
        (Ok(()), Err(err)) => {
            completion(Err(CaptureError::RecordingFailed(format!(
                "flush failed: {err}"
            ))));
        }
    }
}

fn open_stream_device(path: &str, preset: SessionPreset) -> Result<(Device, StreamPlan), String> {
    let device = Device::with_path(path).map_err(|err| format!("open failed: {err}"))?;

    let mjpg = FourCC::new(b"MJPG");
    let yuyv = FourCC::new(b"YUYV");
    let formats = device
        .enum_formats()
        .map_err(|err| format!("format enumeration failed: {err}"))?;
    let fourcc = if formats.iter().any(|format| format.fourcc == mjpg) {
        mjpg
    } else if formats.iter().any(|format| format.fourcc == yuyv) {
        yuyv
    } else {
        return Err("device offers neither MJPG nor YUYV".into());
    };

    let candidates: Vec<(u32, u32)> = device
        .enum_framesizes(fourcc)
        .map(|sizes| {
            sizes
                .iter()
                .map(|frame_size| match &frame_size.size {
                    FrameSizeEnum::Discrete(discrete) => (discrete.width, discrete.height),
                    FrameSizeEnum::Stepwise(stepwise) => (stepwise.max_width, stepwise.max_height),
                })
                .collect()
        })
        .unwrap_or_default();
    let (width, height) = choose_frame_size(&candidates, preset).unwrap_or((1280, 720));

    let mut format = device
        .format()
        .map_err(|err| format!("format query failed: {err}"))?;
    format.width = width;
    format.height = height;
    format.fourcc = fourcc;
    let actual = device
        .set_format(&format)
        .map_err(|err| format!("format apply failed: {err}"))?;
    if actual.fourcc != fourcc {
        return Err(format!("driver substituted pixel format {}", actual.fourcc));
    }

    Ok((
        device,
        StreamPlan {
            mjpeg: fourcc == mjpg,
            width: actual.width,
            height: actual.height,
        },
    ))
}

/// Pick a frame size for the preset: photo wants the largest sensor area,
/// high caps at 1080p when the camera offers it.
fn choose_frame_size(candidates: &[(u32, u32)], preset: SessionPreset) -> Option<(u32, u32)> {
    let area = |&(width, height): &(u32, u32)| u64::from(width) * u64::from(height);
    match preset {
        SessionPreset::Photo => candidates.iter().max_by_key(|size| area(size)).copied(),
        SessionPreset::High => candidates
            .iter()
            .filter(|&&(width, height)| width <= 1920 && height <= 1080)
            .max_by_key(|size| area(size))
            .or_else(|| candidates.iter().max_by_key(|size| area(size)))
            .copied(),
    }
}

/// EXIF tag produced by a landscape-native sensor for each connection
/// orientation.
fn exif_tag(orientation: CaptureOrientation) -> u32 {
    match orientation {
        CaptureOrientation::LandscapeRight => 1,
        CaptureOrientation::LandscapeLeft => 3,
        CaptureOrientation::Portrait => 6,
        CaptureOrientation::PortraitUpsideDown => 8,
    }
}

/// Convert a packed YUYV 4:2:2 frame to RGB using the ITU-R BT.601 matrix.
///
/// Returns `None` when the buffer is shorter than the frame geometry
/// requires.
fn yuyv_to_rgb_image(data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
    let expected = (width as usize) * (height as usize) * 2;
    if data.len() < expected || width == 0 || height == 0 {
        return None;
    }

    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        for y in [y0, y1] {
            let (r, g, b) = yuv_to_rgb(y, u, v);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;

    let r = y + 1.402 * v;
    let g = y - 0.344_14 * u - 0.714_14 * v;
    let b = y + 1.772 * u;

    let clamp = |value: f32| value.clamp(0.0, 255.0) as u8;
    (clamp(r), clamp(g), clamp(b))
}
