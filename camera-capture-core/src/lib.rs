//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Provides the capture-session state machine, the serial capture controller,
//! device resolution, and image geometry post-processing. Platform-specific
//! backends (Linux V4L2, others) implement the `CaptureBackend` trait and
//! plug into the generic session.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureControllerDelegate, AuthorizationProvider
//! ├── models/       ← CaptureError, FlashMode, orientations, geometry, configuration, results
//! ├── device/       ← position-preferring device resolver
//! ├── session/      ← CaptureSession + ConfigurationScope (begin/commit bracket)
//! ├── controller/   ← CaptureController (serial worker, permission gating, delivery)
//! └── processing/   ← downsample, crop-to-viewport, orientation normalization
//! ```
//!
//! Data flow: a UI command enqueues on the controller's serial worker, the
//! session mutates state or triggers the backend, the backend's completion
//! callback runs geometry post-processing, and the result reaches the
//! delegate through the main dispatcher.

pub mod controller;
pub mod device;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub mod mock;

// Re-export key types at crate root for convenience.
pub use controller::capture_controller::{CaptureController, CaptureDiagnostics, MainDispatcher};
pub use models::capture_result::{CapturedImage, RawPhoto, RecordingMetadata, RecordingResult};
pub use models::config::{
    PhotoCodec, PhotoOutputSettings, PhotoSettings, QualityPrioritization, SessionConfiguration,
    SessionPreset,
};
pub use models::device::{CameraDeviceInfo, CameraPosition, DeviceKind};
pub use models::error::{CaptureError, MediaType};
pub use models::flash::FlashMode;
pub use models::geometry::{Point, PreviewViewport, Rect, Size};
pub use models::orientation::{CaptureOrientation, DeviceOrientation, ImageOrientation};
pub use session::capture_session::{CaptureSession, ConfigurationScope};
pub use traits::authorization::{AuthorizationProvider, AuthorizationStatus};
pub use traits::capture_backend::{CaptureBackend, PhotoCompletion, RecordingCompletion};
pub use traits::capture_delegate::CaptureControllerDelegate;
